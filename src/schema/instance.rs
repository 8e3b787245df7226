use crate::error::{ConfError, Result};
use crate::schema::builder::{FieldDescriptor, SchemaType};
use crate::schema::types::{FieldType, Value};
use crate::yaml::loader;
use std::sync::Arc;

/// One configuration tree: current values for every field of a schema type.
///
/// Created from defaults, then mutated in place by
/// [`load_config`](crate::yaml::load_config).
#[derive(Debug, Clone)]
pub struct SchemaInstance {
	schema: Arc<SchemaType>,
	/// One slot per field, in declaration order. `None` is an unset required field.
	slots: Vec<Option<Value>>,
	loaded: bool,
}

impl SchemaInstance {
	pub(crate) fn from_defaults(schema: Arc<SchemaType>) -> Self {
		let slots = schema
			.fields()
			.iter()
			.map(|field| match (&field.default, &field.ty) {
				(Some(default), _) => Some(default.clone()),
				(None, FieldType::Nested(nested)) => Some(Value::Nested(nested.instantiate())),
				(None, _) => None,
			})
			.collect();

		SchemaInstance {
			schema,
			slots,
			loaded: false,
		}
	}

	pub fn schema(&self) -> &Arc<SchemaType> {
		&self.schema
	}

	/// Whether a load has been committed into this instance.
	pub fn is_loaded(&self) -> bool {
		self.loaded
	}

	/// Fields paired with their current values, in declaration order.
	pub fn entries(&self) -> impl Iterator<Item = (&FieldDescriptor, Option<&Value>)> {
		self.schema
			.fields()
			.iter()
			.zip(self.slots.iter().map(Option::as_ref))
	}

	/// Read a field.
	pub fn get(&self, name: &str) -> Result<&Value> {
		let index = self.readable_index(name)?;
		self.slots[index]
			.as_ref()
			.ok_or_else(|| ConfError::MissingValue {
				path: name.to_string(),
			})
	}

	/// Mutable access to a field's current value.
	pub fn get_mut(&mut self, name: &str) -> Result<&mut Value> {
		let index = self.readable_index(name)?;
		self.slots[index]
			.as_mut()
			.ok_or_else(|| ConfError::MissingValue {
				path: name.to_string(),
			})
	}

	/// Assign a field, type-checked against its declaration.
	pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
		let index = self.index(name)?;
		let ty = &self.schema.fields()[index].ty;
		let value = loader::coerce_value(ty, value.into(), &mut vec![name.to_string()])?;
		self.slots[index] = Some(value);
		Ok(())
	}

	pub fn str(&self, name: &str) -> Result<&str> {
		let value = self.get(name)?;
		value.as_str().ok_or_else(|| mismatch(name, "str", value))
	}

	pub fn int(&self, name: &str) -> Result<i64> {
		let value = self.get(name)?;
		value.as_int().ok_or_else(|| mismatch(name, "int", value))
	}

	pub fn float(&self, name: &str) -> Result<f64> {
		let value = self.get(name)?;
		value.as_float().ok_or_else(|| mismatch(name, "float", value))
	}

	pub fn bool(&self, name: &str) -> Result<bool> {
		let value = self.get(name)?;
		value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
	}

	pub fn list(&self, name: &str) -> Result<&[Value]> {
		let value = self.get(name)?;
		value.as_list().ok_or_else(|| mismatch(name, "list", value))
	}

	pub fn map(&self, name: &str) -> Result<&[(String, Value)]> {
		let value = self.get(name)?;
		value.as_map().ok_or_else(|| mismatch(name, "map", value))
	}

	/// A nested section.
	pub fn nested(&self, name: &str) -> Result<&SchemaInstance> {
		let value = self.get(name)?;
		value
			.as_nested()
			.ok_or_else(|| mismatch(name, "nested section", value))
	}

	pub fn nested_mut(&mut self, name: &str) -> Result<&mut SchemaInstance> {
		let value = self.get_mut(name)?;
		match value {
			Value::Nested(instance) => Ok(instance),
			other => Err(mismatch(name, "nested section", other)),
		}
	}

	/// A copy with some fields changed. The copy counts as loaded.
	pub fn replace<K, V>(&self, changes: impl IntoIterator<Item = (K, V)>) -> Result<Self>
	where
		K: AsRef<str>,
		V: Into<Value>,
	{
		let mut copy = self.clone();
		for (name, value) in changes {
			copy.set(name.as_ref(), value)?;
		}
		copy.mark_loaded();
		Ok(copy)
	}

	pub(crate) fn slot(&self, index: usize) -> Option<&Value> {
		self.slots[index].as_ref()
	}

	pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Value> {
		self.slots[index].as_mut()
	}

	pub(crate) fn set_slot(&mut self, index: usize, value: Value) {
		self.slots[index] = Some(value);
	}

	/// Take over the values of a fully validated staged copy.
	pub(crate) fn commit(&mut self, staged: SchemaInstance) {
		self.slots = staged.slots;
		self.mark_loaded();
	}

	/// Mark this instance and every nested instance as loaded.
	pub(crate) fn mark_loaded(&mut self) {
		self.loaded = true;
		for slot in self.slots.iter_mut().flatten() {
			mark_value_loaded(slot);
		}
	}

	fn index(&self, name: &str) -> Result<usize> {
		self.schema
			.index_of(name)
			.ok_or_else(|| ConfError::UnknownField {
				schema: self.schema.name().to_string(),
				field: name.to_string(),
			})
	}

	fn readable_index(&self, name: &str) -> Result<usize> {
		let index = self.index(name)?;
		if self.schema.is_guarded() && !self.loaded {
			return Err(ConfError::NotLoaded {
				schema: self.schema.name().to_string(),
				field: name.to_string(),
			});
		}
		Ok(index)
	}
}

fn mark_value_loaded(value: &mut Value) {
	match value {
		Value::Nested(instance) => instance.mark_loaded(),
		Value::List(items) => items.iter_mut().for_each(mark_value_loaded),
		_ => {}
	}
}

fn mismatch(name: &str, expected: &str, value: &Value) -> ConfError {
	ConfError::TypeMismatch {
		path: name.to_string(),
		expected: expected.to_string(),
		found: value.kind(),
	}
}

/// Instances compare by schema name and field values; the loaded flag is ignored.
impl PartialEq for SchemaInstance {
	fn eq(&self, other: &Self) -> bool {
		self.schema.name() == other.schema.name() && self.slots == other.slots
	}
}
