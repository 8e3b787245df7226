//! Confclasses - typed configuration schemas loaded from YAML.
//!
//! This library provides:
//! - Schema types built from ordered field declarations with defaults and docs
//! - Sparse, all-or-nothing loading of YAML documents into schema instances
//! - YAML dumping with field docs re-attached as comments
//! - TOML declaration files, with docs recovered from comment lines
//! - A shared handle for one process-wide configuration instance
//!
//! # Example
//!
//! ```
//! use confclasses::schema::{FieldDecl, FieldType, SchemaBuilder};
//! use confclasses::yaml::{dump_config, load_config};
//!
//! let nested = SchemaBuilder::new("NestedConfig")
//! 	.field(FieldDecl::untyped("field1").default("foo"))
//! 	.field(FieldDecl::untyped("field2").default("bar").doc("Second field"))
//! 	.build()
//! 	.unwrap();
//! let schema = SchemaBuilder::new("AppConfig")
//! 	.field(FieldDecl::new("nested", FieldType::Nested(nested)))
//! 	.field(FieldDecl::untyped("field3").default(42))
//! 	.build()
//! 	.unwrap();
//!
//! let mut config = schema.instantiate();
//! load_config(&mut config, "nested:\n  field2: baz\n").unwrap();
//!
//! let nested = config.nested("nested").unwrap();
//! assert_eq!(nested.str("field1").unwrap(), "foo");
//! assert_eq!(nested.str("field2").unwrap(), "baz");
//! assert!(dump_config(&config).contains("# Second field"));
//! ```

pub mod declare;
pub mod error;
pub mod handle;
pub mod schema;
pub mod yaml;

pub use error::{ConfError, Result};
pub use handle::ConfigHandle;
pub use schema::{FieldDecl, FieldType, SchemaBuilder, SchemaInstance, SchemaType, Value};
pub use yaml::{dump_config, load_config};
