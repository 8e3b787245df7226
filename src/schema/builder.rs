use crate::error::{ConfError, Result};
use crate::schema::instance::SchemaInstance;
use crate::schema::types::{FieldType, Value};
use crate::yaml::loader;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static IDENTIFIER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Check that a schema or field name is a plain identifier.
pub fn is_identifier(name: &str) -> bool {
	IDENTIFIER.is_match(name)
}

/// One field as written in a declaration, before it is validated.
///
/// Either the type or the default may be missing, but not both.
#[derive(Debug, Clone)]
pub struct FieldDecl {
	pub name: String,
	pub ty: Option<FieldType>,
	pub default: Option<Value>,
	pub doc: Option<String>,
}

impl FieldDecl {
	/// A field with a declared type and no default (required).
	pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
		FieldDecl {
			name: name.into(),
			ty: Some(ty),
			default: None,
			doc: None,
		}
	}

	/// A field without a type annotation. Its type is inferred from the default.
	pub fn untyped(name: impl Into<String>) -> Self {
		FieldDecl {
			name: name.into(),
			ty: None,
			default: None,
			doc: None,
		}
	}

	pub fn default(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	pub fn doc(mut self, doc: impl Into<String>) -> Self {
		self.doc = Some(doc.into());
		self
	}
}

/// Metadata for one field of a built schema type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
	pub name: String,
	pub ty: FieldType,
	/// `None` means the field is required.
	pub default: Option<Value>,
	pub doc: Option<String>,
}

impl FieldDescriptor {
	pub fn is_required(&self) -> bool {
		self.default.is_none() && self.ty.as_nested().is_none()
	}
}

/// An immutable, named, ordered collection of field descriptors.
#[derive(Debug)]
pub struct SchemaType {
	name: String,
	fields: Vec<FieldDescriptor>,
	scalar_field: Option<usize>,
	guarded: bool,
}

impl SchemaType {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Fields in declaration order.
	pub fn fields(&self) -> &[FieldDescriptor] {
		&self.fields
	}

	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn index_of(&self, name: &str) -> Option<usize> {
		self.fields.iter().position(|f| f.name == name)
	}

	/// The field that receives a bare scalar written in place of this section.
	pub fn scalar_field(&self) -> Option<&FieldDescriptor> {
		self.scalar_field.map(|index| &self.fields[index])
	}

	/// Slot index of [`scalar_field`](Self::scalar_field).
	pub fn scalar_index(&self) -> Option<usize> {
		self.scalar_field
	}

	/// Whether field reads are refused until the instance is loaded.
	pub fn is_guarded(&self) -> bool {
		self.guarded
	}

	/// Construct an instance populated from (deep-copied) defaults.
	pub fn instantiate(self: &Arc<Self>) -> SchemaInstance {
		SchemaInstance::from_defaults(Arc::clone(self))
	}

	/// Construct an instance, supplying some field values up front.
	///
	/// Supplied values are type-checked like loaded values.
	pub fn instance_with<K, V>(
		self: &Arc<Self>,
		values: impl IntoIterator<Item = (K, V)>,
	) -> Result<SchemaInstance>
	where
		K: AsRef<str>,
		V: Into<Value>,
	{
		let mut instance = self.instantiate();
		for (name, value) in values {
			instance.set(name.as_ref(), value)?;
		}
		Ok(instance)
	}
}

/// Builds a [`SchemaType`] from field declarations.
///
/// # Example
///
/// ```
/// use confclasses::schema::{FieldDecl, FieldType, SchemaBuilder};
///
/// let schema = SchemaBuilder::new("Server")
/// 	.field(FieldDecl::new("host", FieldType::Str).default("localhost"))
/// 	.field(FieldDecl::untyped("port").default(8080).doc("Listen port"))
/// 	.build()
/// 	.unwrap();
///
/// let server = schema.instantiate();
/// assert_eq!(server.int("port").unwrap(), 8080);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
	name: String,
	fields: Vec<FieldDecl>,
	scalar_field: Option<String>,
	guarded: bool,
}

impl SchemaBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		SchemaBuilder {
			name: name.into(),
			fields: Vec::new(),
			scalar_field: None,
			guarded: false,
		}
	}

	pub fn field(mut self, decl: FieldDecl) -> Self {
		self.fields.push(decl);
		self
	}

	/// Accept a bare scalar in place of this section, stored in `field`.
	///
	/// Every other field must have a default, and the section may not contain
	/// nested sections.
	pub fn scalar(mut self, field: impl Into<String>) -> Self {
		self.scalar_field = Some(field.into());
		self
	}

	/// Refuse field reads on instances that were never loaded.
	pub fn guarded(mut self) -> Self {
		self.guarded = true;
		self
	}

	/// Validate the declarations and freeze them into a schema type.
	pub fn build(self) -> Result<Arc<SchemaType>> {
		let schema_name = self.name;
		if !is_identifier(&schema_name) {
			return Err(ConfError::declaration(
				&schema_name,
				"",
				"schema name must be an identifier",
			));
		}

		let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(self.fields.len());
		for decl in self.fields {
			if !is_identifier(&decl.name) {
				return Err(ConfError::declaration(
					&schema_name,
					&decl.name,
					"field name must be an identifier",
				));
			}
			if fields.iter().any(|f| f.name == decl.name) {
				return Err(ConfError::declaration(
					&schema_name,
					&decl.name,
					"field declared more than once",
				));
			}

			let ty = match (decl.ty, &decl.default) {
				(Some(ty), _) => ty,
				(None, Some(default)) => FieldType::infer(default).ok_or_else(|| {
					ConfError::declaration(
						&schema_name,
						&decl.name,
						"cannot infer a type from a null default",
					)
				})?,
				(None, None) => {
					return Err(ConfError::declaration(
						&schema_name,
						&decl.name,
						"field has no type and no default",
					));
				}
			};

			let default = decl
				.default
				.map(|value| check_default(&schema_name, &decl.name, &ty, value))
				.transpose()?;

			fields.push(FieldDescriptor {
				name: decl.name,
				ty,
				default,
				doc: decl.doc.filter(|doc| !doc.trim().is_empty()),
			});
		}

		let scalar_field = match self.scalar_field {
			Some(name) => Some(check_scalar_field(&schema_name, &fields, &name)?),
			None => None,
		};

		tracing::debug!(
			schema = %schema_name,
			fields = fields.len(),
			"built schema type"
		);

		Ok(Arc::new(SchemaType {
			name: schema_name,
			fields,
			scalar_field,
			guarded: self.guarded,
		}))
	}
}

/// Check a default against its declared type.
///
/// Nested sections accept a mapping (overlaid onto the nested defaults) or a
/// scalar for sections with a scalar field.
fn check_default(schema: &str, field: &str, ty: &FieldType, value: Value) -> Result<Value> {
	let found = value.kind();
	let mut crumbs = vec![field.to_string()];
	match loader::coerce_value(ty, value, &mut crumbs) {
		Ok(value) => Ok(value),
		Err(ConfError::TypeMismatch { path, .. }) if path == field => Err(ConfError::declaration(
			schema,
			field,
			format!("default of type {found} is not compatible with {ty}"),
		)),
		Err(e) => Err(ConfError::declaration(schema, field, e.to_string())),
	}
}

fn check_scalar_field(schema: &str, fields: &[FieldDescriptor], name: &str) -> Result<usize> {
	let index = fields
		.iter()
		.position(|f| f.name == name)
		.ok_or_else(|| ConfError::declaration(schema, name, "scalar field not found"))?;

	for (i, field) in fields.iter().enumerate() {
		if field.ty.as_nested().is_some() {
			return Err(ConfError::declaration(
				schema,
				&field.name,
				"a section with a scalar field cannot contain nested sections",
			));
		}
		if i != index && field.default.is_none() {
			return Err(ConfError::declaration(
				schema,
				&field.name,
				"every field besides the scalar field needs a default",
			));
		}
	}

	Ok(index)
}
