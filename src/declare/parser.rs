use crate::declare::scan::scan_field_comments;
use crate::error::{ConfError, Result};
use crate::schema::{
	CommentMap, FieldDecl, FieldType, SchemaBuilder, SchemaInstance, SchemaType, Value,
	is_identifier,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, LazyLock};

static LIST_TYPE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^list\s*\[\s*(.+?)\s*\]$").expect("valid regex"));

/// Top-level layout of a declaration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeclaration {
	/// Schema used for documents; defaults to the last one declared.
	#[serde(default)]
	root: Option<String>,

	/// Scalar shorthand field per schema.
	#[serde(default)]
	scalar: BTreeMap<String, String>,

	/// Schemas whose instances refuse reads until loaded.
	#[serde(default)]
	guarded: Vec<String>,

	/// Schema name -> field name -> field declaration.
	#[serde(default)]
	schema: toml::Table,
}

/// A field written as a table. Bare values are shorthand for `default`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
	#[serde(rename = "type")]
	ty: Option<String>,
	default: Option<toml::Value>,
	doc: Option<String>,
}

/// A parsed declaration file: named schema types and the root among them.
#[derive(Debug, Clone)]
pub struct Declaration {
	schemas: Vec<Arc<SchemaType>>,
	root: usize,
}

impl Declaration {
	/// The schema type documents are loaded into.
	pub fn root(&self) -> &Arc<SchemaType> {
		&self.schemas[self.root]
	}

	pub fn get(&self, name: &str) -> Option<&Arc<SchemaType>> {
		self.schemas.iter().find(|s| s.name() == name)
	}

	/// All schema types, in declaration order.
	pub fn schemas(&self) -> &[Arc<SchemaType>] {
		&self.schemas
	}

	/// A fresh instance of the root schema.
	pub fn instantiate(&self) -> SchemaInstance {
		self.root().instantiate()
	}
}

/// Parse a declaration file from the given path.
pub fn parse_declaration_file(path: &Path) -> Result<Declaration> {
	let content = std::fs::read_to_string(path).map_err(|source| ConfError::Io { source })?;
	parse_declaration_str(&content)
}

/// Parse a declaration from a string.
pub fn parse_declaration_str(content: &str) -> Result<Declaration> {
	let raw: RawDeclaration =
		toml::from_str(content).map_err(|source| ConfError::DeclarationParse { source })?;

	let mut resolver = Resolver {
		raw: &raw,
		docs: scan_field_comments(content),
		built: HashMap::new(),
		in_progress: Vec::new(),
	};

	let mut schemas = Vec::with_capacity(raw.schema.len());
	for name in raw.schema.keys() {
		schemas.push(resolver.resolve(name)?);
	}

	for name in raw.scalar.keys().chain(raw.guarded.iter()) {
		if !raw.schema.contains_key(name) {
			return Err(ConfError::declaration(name, "", "options refer to an undeclared schema"));
		}
	}

	let root = match raw.root {
		Some(ref name) => schemas
			.iter()
			.position(|s| s.name() == name.as_str())
			.ok_or_else(|| ConfError::declaration(name, "", "root schema is not declared"))?,
		None => schemas
			.len()
			.checked_sub(1)
			.ok_or_else(|| ConfError::declaration("", "", "declaration contains no schemas"))?,
	};

	tracing::debug!(
		schemas = schemas.len(),
		root = %schemas[root].name(),
		"parsed declaration"
	);

	Ok(Declaration { schemas, root })
}

/// Builds schema types on demand so declarations may reference each other in
/// any order.
struct Resolver<'a> {
	raw: &'a RawDeclaration,
	docs: CommentMap,
	built: HashMap<String, Arc<SchemaType>>,
	in_progress: Vec<String>,
}

impl Resolver<'_> {
	fn resolve(&mut self, name: &str) -> Result<Arc<SchemaType>> {
		if let Some(schema) = self.built.get(name) {
			return Ok(Arc::clone(schema));
		}
		if self.in_progress.iter().any(|n| n == name) {
			return Err(ConfError::declaration(
				name,
				"",
				format!("schema references itself through {}", self.in_progress.join(" -> ")),
			));
		}

		let raw = self.raw;
		let fields = match raw.schema.get(name) {
			Some(toml::Value::Table(fields)) => fields,
			Some(_) => return Err(ConfError::declaration(name, "", "schema must be a table")),
			None => return Err(ConfError::declaration(name, "", "unknown schema")),
		};

		self.in_progress.push(name.to_string());
		let mut builder = SchemaBuilder::new(name);
		for (field_name, value) in fields {
			builder = builder.field(self.field_decl(name, field_name, value)?);
		}
		if let Some(field) = raw.scalar.get(name) {
			builder = builder.scalar(field);
		}
		if raw.guarded.iter().any(|g| g == name) {
			builder = builder.guarded();
		}
		let schema = builder.build()?;
		self.in_progress.pop();

		self.built.insert(name.to_string(), Arc::clone(&schema));
		Ok(schema)
	}

	fn field_decl(&mut self, schema: &str, name: &str, value: &toml::Value) -> Result<FieldDecl> {
		let raw_field = match value {
			toml::Value::Table(_) => value
				.clone()
				.try_into::<RawField>()
				.map_err(|e| ConfError::declaration(schema, name, e.to_string()))?,
			bare => RawField {
				default: Some(bare.clone()),
				..RawField::default()
			},
		};

		let mut decl = FieldDecl::untyped(name);
		if let Some(ref ty) = raw_field.ty {
			decl.ty = Some(self.parse_type(schema, name, ty)?);
		}
		if let Some(default) = raw_field.default {
			decl.default = Some(from_toml(schema, name, default)?);
		}
		decl.doc = raw_field
			.doc
			.or_else(|| self.docs.get(schema, name).map(str::to_string));

		Ok(decl)
	}

	fn parse_type(&mut self, schema: &str, field: &str, text: &str) -> Result<FieldType> {
		let text = text.trim();
		if let Some(caps) = LIST_TYPE.captures(text) {
			let element = self.parse_type(schema, field, &caps[1])?;
			return Ok(FieldType::list_of(element));
		}

		Ok(match text {
			"str" | "string" => FieldType::Str,
			"int" | "integer" => FieldType::Int,
			"float" => FieldType::Float,
			"bool" | "boolean" => FieldType::Bool,
			"list" => FieldType::List(None),
			"map" | "dict" => FieldType::Map,
			other if is_identifier(other) && self.raw.schema.contains_key(other) => {
				FieldType::Nested(self.resolve(other)?)
			}
			other => {
				return Err(ConfError::declaration(
					schema,
					field,
					format!("unknown type '{other}'"),
				));
			}
		})
	}
}

fn from_toml(schema: &str, field: &str, value: toml::Value) -> Result<Value> {
	Ok(match value {
		toml::Value::String(s) => Value::Str(s),
		toml::Value::Integer(i) => Value::Int(i),
		toml::Value::Float(f) => Value::Float(f),
		toml::Value::Boolean(b) => Value::Bool(b),
		toml::Value::Array(items) => Value::List(
			items
				.into_iter()
				.map(|item| from_toml(schema, field, item))
				.collect::<Result<_>>()?,
		),
		toml::Value::Table(table) => Value::Map(
			table
				.into_iter()
				.map(|(k, v)| Ok((k, from_toml(schema, field, v)?)))
				.collect::<Result<_>>()?,
		),
		toml::Value::Datetime(_) => {
			return Err(ConfError::declaration(
				schema,
				field,
				"datetime defaults are not supported",
			));
		}
	})
}
