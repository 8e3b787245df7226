use crate::error::Result;
use crate::schema::{SchemaInstance, SchemaType};
use crate::yaml::{dump_config, load_config};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// Shared handle to one long-lived configuration instance.
///
/// Create it with defaults at startup, hand clones to every consumer, then
/// load once the configuration source is available. All clones see the same
/// instance, and a reload holds the write lock for the whole load, so readers
/// never observe a half-applied document.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
	inner: Arc<RwLock<SchemaInstance>>,
}

impl ConfigHandle {
	/// A handle to a fresh instance populated from defaults.
	pub fn new(schema: &Arc<SchemaType>) -> Self {
		Self::from_instance(schema.instantiate())
	}

	pub fn from_instance(instance: SchemaInstance) -> Self {
		ConfigHandle {
			inner: Arc::new(RwLock::new(instance)),
		}
	}

	/// Load a YAML document into the shared instance.
	pub fn load(&self, yaml_text: &str) -> Result<()> {
		let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
		load_config(&mut guard, yaml_text)?;
		Ok(())
	}

	/// Read access to the shared instance.
	pub fn read(&self) -> RwLockReadGuard<'_, SchemaInstance> {
		self.inner.read().unwrap_or_else(PoisonError::into_inner)
	}

	/// Dump the shared instance with comments.
	pub fn dump(&self) -> String {
		dump_config(&self.read())
	}

	/// Whether two handles share the same instance.
	pub fn same_instance(&self, other: &ConfigHandle) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}
