use crate::schema::{SchemaInstance, SchemaType};
use std::fmt;
use std::sync::Arc;

/// Declared type of a schema field.
#[derive(Debug, Clone)]
pub enum FieldType {
	Str,
	Int,
	Float,
	Bool,
	/// A sequence. `Some(element)` checks every item against `element`.
	List(Option<Box<FieldType>>),
	/// A string-keyed mapping with arbitrary values.
	Map,
	/// Another schema type (nested configuration section).
	Nested(Arc<SchemaType>),
}

impl FieldType {
	/// Shorthand for `list[element]`.
	pub fn list_of(element: FieldType) -> Self {
		FieldType::List(Some(Box::new(element)))
	}

	/// The nested schema type, if this is a nested field.
	pub fn as_nested(&self) -> Option<&Arc<SchemaType>> {
		match self {
			FieldType::Nested(schema) => Some(schema),
			_ => None,
		}
	}

	/// Human-readable label used in generated comments.
	pub fn label(&self) -> String {
		match self {
			FieldType::Str => "String".to_string(),
			FieldType::Int => "Integer".to_string(),
			FieldType::Float => "Float".to_string(),
			FieldType::Bool => "Bool".to_string(),
			FieldType::List(None) => "List".to_string(),
			FieldType::List(Some(element)) => format!("List[{}]", element.label()),
			FieldType::Map => "Map".to_string(),
			FieldType::Nested(schema) => schema.name().to_string(),
		}
	}

	/// Compatibility check for primitive and container values.
	///
	/// Returns the value as it should be stored, or `None` if the value is not
	/// accepted. Integers are widened for float fields; everything else must
	/// match exactly.
	pub fn coerce(&self, value: Value) -> Option<Value> {
		match (self, value) {
			(FieldType::Str, v @ Value::Str(_)) => Some(v),
			(FieldType::Int, v @ Value::Int(_)) => Some(v),
			(FieldType::Float, Value::Int(i)) => Some(Value::Float(i as f64)),
			(FieldType::Float, v @ Value::Float(_)) => Some(v),
			(FieldType::Bool, v @ Value::Bool(_)) => Some(v),
			(FieldType::List(None), v @ Value::List(_)) => Some(v),
			(FieldType::List(Some(element)), Value::List(items)) => items
				.into_iter()
				.map(|item| element.coerce(item))
				.collect::<Option<Vec<_>>>()
				.map(Value::List),
			(FieldType::Map, v @ Value::Map(_)) => Some(v),
			(FieldType::Nested(schema), Value::Nested(instance))
				if Arc::ptr_eq(instance.schema(), schema) =>
			{
				Some(Value::Nested(instance))
			}
			_ => None,
		}
	}

	/// Infer a field type from a default value, for declarations without a type.
	pub fn infer(value: &Value) -> Option<Self> {
		match value {
			Value::Null => None,
			Value::Bool(_) => Some(FieldType::Bool),
			Value::Int(_) => Some(FieldType::Int),
			Value::Float(_) => Some(FieldType::Float),
			Value::Str(_) => Some(FieldType::Str),
			Value::List(_) => Some(FieldType::List(None)),
			Value::Map(_) => Some(FieldType::Map),
			Value::Nested(instance) => Some(FieldType::Nested(Arc::clone(instance.schema()))),
		}
	}
}

impl PartialEq for FieldType {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(FieldType::Str, FieldType::Str)
			| (FieldType::Int, FieldType::Int)
			| (FieldType::Float, FieldType::Float)
			| (FieldType::Bool, FieldType::Bool)
			| (FieldType::Map, FieldType::Map) => true,
			(FieldType::List(a), FieldType::List(b)) => a == b,
			(FieldType::Nested(a), FieldType::Nested(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldType::Str => write!(f, "str"),
			FieldType::Int => write!(f, "int"),
			FieldType::Float => write!(f, "float"),
			FieldType::Bool => write!(f, "bool"),
			FieldType::List(None) => write!(f, "list"),
			FieldType::List(Some(element)) => write!(f, "list[{element}]"),
			FieldType::Map => write!(f, "map"),
			FieldType::Nested(schema) => write!(f, "{}", schema.name()),
		}
	}
}

/// A configuration value.
///
/// Cloning a value is a deep copy; nested instances are owned, never shared.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	List(Vec<Value>),
	/// String-keyed mapping in document order.
	Map(Vec<(String, Value)>),
	Nested(SchemaInstance),
}

impl Value {
	/// Build a mapping value from key/value pairs.
	pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		Value::Map(
			entries
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}

	/// Name of the value's kind, as used in error messages.
	pub fn kind(&self) -> String {
		match self {
			Value::Null => "null".to_string(),
			Value::Bool(_) => "boolean".to_string(),
			Value::Int(_) => "integer".to_string(),
			Value::Float(_) => "float".to_string(),
			Value::Str(_) => "string".to_string(),
			Value::List(_) => "sequence".to_string(),
			Value::Map(_) => "mapping".to_string(),
			Value::Nested(instance) => instance.schema().name().to_string(),
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&[(String, Value)]> {
		match self {
			Value::Map(entries) => Some(entries),
			_ => None,
		}
	}

	pub fn as_nested(&self) -> Option<&SchemaInstance> {
		match self {
			Value::Nested(instance) => Some(instance),
			_ => None,
		}
	}

	pub fn as_nested_mut(&mut self) -> Option<&mut SchemaInstance> {
		match self {
			Value::Nested(instance) => Some(instance),
			_ => None,
		}
	}

	/// Look up a key in a mapping value.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.as_map()?
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(i64::from(value))
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<SchemaInstance> for Value {
	fn from(value: SchemaInstance) -> Self {
		Value::Nested(value)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(value: Vec<T>) -> Self {
		Value::List(value.into_iter().map(Into::into).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_float_accepts_integer() {
		assert_eq!(FieldType::Float.coerce(Value::Int(3)), Some(Value::Float(3.0)));
		assert_eq!(FieldType::Float.coerce(Value::Float(1.5)), Some(Value::Float(1.5)));
	}

	#[test]
	fn test_int_rejects_float_and_bool() {
		assert_eq!(FieldType::Int.coerce(Value::Float(1.0)), None);
		assert_eq!(FieldType::Int.coerce(Value::Bool(true)), None);
	}

	#[test]
	fn test_str_rejects_other_scalars() {
		assert_eq!(FieldType::Str.coerce(Value::Int(1)), None);
		assert_eq!(FieldType::Str.coerce(Value::Null), None);
		assert_eq!(FieldType::Str.coerce("x".into()), Some(Value::from("x")));
	}

	#[test]
	fn test_typed_list_checks_every_item() {
		let ty = FieldType::list_of(FieldType::Str);
		assert!(ty.coerce(Value::from(vec!["a", "b"])).is_some());
		assert!(ty.coerce(Value::List(vec!["a".into(), Value::Int(1)])).is_none());

		let floats = FieldType::list_of(FieldType::Float);
		assert_eq!(
			floats.coerce(Value::from(vec![1, 2])),
			Some(Value::List(vec![Value::Float(1.0), Value::Float(2.0)]))
		);
	}

	#[test]
	fn test_untyped_list_and_map() {
		assert!(FieldType::List(None).coerce(Value::List(vec![])).is_some());
		assert!(FieldType::Map.coerce(Value::map([("a", 1)])).is_some());
		assert!(FieldType::Map.coerce(Value::List(vec![])).is_none());
	}

	#[test]
	fn test_labels_and_names() {
		let ty = FieldType::list_of(FieldType::Int);
		assert_eq!(ty.label(), "List[Integer]");
		assert_eq!(ty.to_string(), "list[int]");
		assert_eq!(FieldType::Bool.label(), "Bool");
		assert_eq!(FieldType::Str.label(), "String");
	}

	#[test]
	fn test_infer_from_default() {
		assert_eq!(FieldType::infer(&Value::Int(1)), Some(FieldType::Int));
		assert_eq!(FieldType::infer(&Value::from(vec!["a"])), Some(FieldType::List(None)));
		assert_eq!(FieldType::infer(&Value::Null), None);
	}

	#[test]
	fn test_map_lookup() {
		let value = Value::map([("key1", "value1")]);
		assert_eq!(value.get("key1"), Some(&Value::from("value1")));
		assert_eq!(value.get("missing"), None);
	}

	#[test]
	fn test_nested_types_compare_by_identity() {
		use crate::schema::{FieldDecl, SchemaBuilder};

		let build = || {
			SchemaBuilder::new("Section")
				.field(FieldDecl::untyped("x").default(1))
				.build()
				.unwrap()
		};
		let first = build();
		let second = build();

		assert_eq!(
			FieldType::Nested(Arc::clone(&first)),
			FieldType::Nested(Arc::clone(&first))
		);
		assert_ne!(FieldType::Nested(Arc::clone(&first)), FieldType::Nested(Arc::clone(&second)));

		let nested = FieldType::Nested(Arc::clone(&first));
		assert!(nested.coerce(Value::Nested(first.instantiate())).is_some());
		assert_eq!(nested.coerce(Value::Nested(second.instantiate())), None);
	}
}
