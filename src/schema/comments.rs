use crate::schema::builder::SchemaType;
use crate::schema::types::FieldType;
use std::collections::HashMap;

/// Documentation strings keyed by (schema type name, field name).
///
/// Derived data: rebuilt whenever a commented dump is produced and never
/// stored on instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentMap {
	docs: HashMap<String, HashMap<String, String>>,
}

impl CommentMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Collect the docs of a schema type and every type nested inside it.
	pub fn from_schema(schema: &SchemaType) -> Self {
		let mut map = CommentMap::new();
		map.collect(schema);
		map
	}

	fn collect(&mut self, schema: &SchemaType) {
		if self.docs.contains_key(schema.name()) {
			return;
		}
		self.docs.insert(schema.name().to_string(), HashMap::new());

		for field in schema.fields() {
			if let Some(ref doc) = field.doc {
				self.insert(schema.name(), &field.name, doc);
			}
			if let Some(nested) = nested_type(&field.ty) {
				self.collect(nested);
			}
		}
	}

	pub fn insert(&mut self, schema: &str, field: &str, doc: &str) {
		self.docs
			.entry(schema.to_string())
			.or_default()
			.insert(field.to_string(), doc.to_string());
	}

	pub fn get(&self, schema: &str, field: &str) -> Option<&str> {
		self.docs
			.get(schema)
			.and_then(|fields| fields.get(field))
			.map(String::as_str)
	}

	/// Number of documented fields.
	pub fn len(&self) -> usize {
		self.docs.values().map(HashMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// The schema type reached through a field, looking through `list[...]`.
fn nested_type(ty: &FieldType) -> Option<&SchemaType> {
	match ty {
		FieldType::Nested(schema) => Some(schema.as_ref()),
		FieldType::List(Some(element)) => nested_type(element),
		_ => None,
	}
}
