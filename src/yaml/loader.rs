use crate::error::{ConfError, Result};
use crate::schema::{FieldType, SchemaInstance, SchemaType, Value};
use std::io::Read;
use std::sync::Arc;

/// Load a YAML document into an instance.
///
/// Only keys present in the document are applied; everything else keeps its
/// current value. Lists and maps are replaced, never merged. The overlay runs
/// against a staged copy and is committed only once the whole document has
/// been validated, so on error the instance is left exactly as it was.
///
/// Returns the same instance it was given.
pub fn load_config<'a>(
	instance: &'a mut SchemaInstance,
	yaml_text: &str,
) -> Result<&'a mut SchemaInstance> {
	let document = parse_document(yaml_text)?;

	let mut staged = instance.clone();
	let mut crumbs = Vec::new();
	overlay(&mut staged, document, &mut crumbs)?;
	ensure_complete(&staged, &mut crumbs)?;

	instance.commit(staged);
	tracing::info!(schema = %instance.schema().name(), "loaded config");
	Ok(instance)
}

/// Load a YAML document from a reader.
pub fn load_config_from_reader<'a, R: Read>(
	instance: &'a mut SchemaInstance,
	mut reader: R,
) -> Result<&'a mut SchemaInstance> {
	let mut yaml_text = String::new();
	reader
		.read_to_string(&mut yaml_text)
		.map_err(|source| ConfError::Io { source })?;
	load_config(instance, &yaml_text)
}

/// Parse a document into its top-level entries. Empty documents have none.
pub(crate) fn parse_document(yaml_text: &str) -> Result<Vec<(String, Value)>> {
	if is_blank_document(yaml_text) {
		return Ok(Vec::new());
	}

	let raw: serde_yaml::Value =
		serde_yaml::from_str(yaml_text).map_err(|source| ConfError::YamlParse { source })?;

	match from_yaml(raw, &mut Vec::new())? {
		Value::Null => Ok(Vec::new()),
		Value::Map(entries) => Ok(entries),
		other => Err(ConfError::NotAMapping {
			found: other.kind(),
		}),
	}
}

/// Whether a document holds nothing but whitespace and comments.
fn is_blank_document(yaml_text: &str) -> bool {
	yaml_text.lines().all(|line| {
		let line = line.trim();
		line.is_empty() || line.starts_with('#')
	})
}

/// Convert a parsed YAML tree into plain values.
fn from_yaml(raw: serde_yaml::Value, crumbs: &mut Vec<String>) -> Result<Value> {
	use serde_yaml::Value as Yaml;

	Ok(match raw {
		Yaml::Null => Value::Null,
		Yaml::Bool(b) => Value::Bool(b),
		Yaml::Number(n) => match n.as_i64() {
			Some(i) => Value::Int(i),
			None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
		},
		Yaml::String(s) => Value::Str(s),
		Yaml::Sequence(items) => {
			let mut values = Vec::with_capacity(items.len());
			for (i, item) in items.into_iter().enumerate() {
				crumbs.push(i.to_string());
				values.push(from_yaml(item, crumbs)?);
				crumbs.pop();
			}
			Value::List(values)
		}
		Yaml::Mapping(mapping) => {
			let mut entries = Vec::with_capacity(mapping.len());
			for (key, value) in mapping {
				let key = match key {
					Yaml::String(key) => key,
					other => {
						return Err(ConfError::TypeMismatch {
							path: display_path(crumbs),
							expected: "string keys".to_string(),
							found: format!("key {other:?}"),
						});
					}
				};
				crumbs.push(key.clone());
				let value = from_yaml(value, crumbs)?;
				crumbs.pop();
				entries.push((key, value));
			}
			Value::Map(entries)
		}
		Yaml::Tagged(tagged) => {
			return Err(ConfError::TypeMismatch {
				path: display_path(crumbs),
				expected: "untagged value".to_string(),
				found: format!("tagged value {}", tagged.tag),
			});
		}
	})
}

/// Apply mapping entries onto an instance, recursing into nested sections.
pub(crate) fn overlay(
	instance: &mut SchemaInstance,
	entries: Vec<(String, Value)>,
	crumbs: &mut Vec<String>,
) -> Result<()> {
	let schema = Arc::clone(instance.schema());
	tracing::debug!(
		schema = %schema.name(),
		path = %display_path(crumbs),
		keys = entries.len(),
		"overlaying section"
	);

	for (key, incoming) in entries {
		let index = schema.index_of(&key);
		crumbs.push(key);
		let Some(index) = index else {
			return Err(ConfError::UnknownKey {
				path: display_path(crumbs),
			});
		};
		let field = &schema.fields()[index];

		if let FieldType::Nested(nested) = &field.ty {
			match incoming {
				// A missing section counts as an empty one.
				Value::Null => {}
				Value::Map(inner) if matches!(instance.slot(index), Some(Value::Nested(_))) => {
					if let Some(Value::Nested(existing)) = instance.slot_mut(index) {
						overlay(existing, inner, crumbs)?;
					}
				}
				incoming => {
					let value = coerce_nested(nested, incoming, crumbs)?;
					instance.set_slot(index, value);
				}
			}
		} else {
			let value = coerce_value(&field.ty, incoming, crumbs)?;
			tracing::trace!(path = %display_path(crumbs), "assigned");
			instance.set_slot(index, value);
		}

		crumbs.pop();
	}

	Ok(())
}

/// Check an incoming value against a declared type, producing the value to store.
pub(crate) fn coerce_value(
	ty: &FieldType,
	incoming: Value,
	crumbs: &mut Vec<String>,
) -> Result<Value> {
	match ty {
		FieldType::Nested(schema) => coerce_nested(schema, incoming, crumbs),
		FieldType::List(Some(element)) => match incoming {
			Value::List(items) => {
				let mut values = Vec::with_capacity(items.len());
				for (i, item) in items.into_iter().enumerate() {
					crumbs.push(i.to_string());
					values.push(coerce_value(element, item, crumbs)?);
					crumbs.pop();
				}
				Ok(Value::List(values))
			}
			other => Err(mismatch(crumbs, ty, &other)),
		},
		_ => {
			let found = incoming.kind();
			ty.coerce(incoming).ok_or_else(|| ConfError::TypeMismatch {
				path: display_path(crumbs),
				expected: ty.to_string(),
				found,
			})
		}
	}
}

/// Build a fresh nested instance from a mapping, a scalar shorthand, or an
/// existing instance of the same type.
fn coerce_nested(
	schema: &Arc<SchemaType>,
	incoming: Value,
	crumbs: &mut Vec<String>,
) -> Result<Value> {
	match incoming {
		Value::Map(entries) => {
			let mut fresh = schema.instantiate();
			overlay(&mut fresh, entries, crumbs)?;
			Ok(Value::Nested(fresh))
		}
		Value::Nested(instance) if Arc::ptr_eq(instance.schema(), schema) => {
			Ok(Value::Nested(instance))
		}
		other @ (Value::Str(_) | Value::Int(_) | Value::Float(_) | Value::Bool(_)) => {
			let (Some(index), Some(scalar)) = (schema.scalar_index(), schema.scalar_field()) else {
				return Err(ConfError::TypeMismatch {
					path: display_path(crumbs),
					expected: format!("mapping for {}", schema.name()),
					found: other.kind(),
				});
			};
			crumbs.push(scalar.name.clone());
			let value = coerce_value(&scalar.ty, other, crumbs)?;
			crumbs.pop();

			let mut fresh = schema.instantiate();
			fresh.set_slot(index, value);
			Ok(Value::Nested(fresh))
		}
		other => Err(ConfError::TypeMismatch {
			path: display_path(crumbs),
			expected: format!("mapping for {}", schema.name()),
			found: other.kind(),
		}),
	}
}

/// Fail on required fields that are still unset, at any nesting level.
fn ensure_complete(instance: &SchemaInstance, crumbs: &mut Vec<String>) -> Result<()> {
	for (field, value) in instance.entries() {
		crumbs.push(field.name.clone());
		match value {
			None => {
				return Err(ConfError::MissingValue {
					path: display_path(crumbs),
				});
			}
			Some(value) => ensure_value_complete(value, crumbs)?,
		}
		crumbs.pop();
	}
	Ok(())
}

fn ensure_value_complete(value: &Value, crumbs: &mut Vec<String>) -> Result<()> {
	match value {
		Value::Nested(nested) => ensure_complete(nested, crumbs),
		Value::List(items) => {
			for (i, item) in items.iter().enumerate() {
				crumbs.push(i.to_string());
				ensure_value_complete(item, crumbs)?;
				crumbs.pop();
			}
			Ok(())
		}
		_ => Ok(()),
	}
}

fn mismatch(crumbs: &[String], ty: &FieldType, value: &Value) -> ConfError {
	ConfError::TypeMismatch {
		path: display_path(crumbs),
		expected: ty.to_string(),
		found: value.kind(),
	}
}

/// Dotted key path, e.g. `nested.items.0.name`.
fn display_path(crumbs: &[String]) -> String {
	if crumbs.is_empty() {
		"<root>".to_string()
	} else {
		crumbs.join(".")
	}
}
