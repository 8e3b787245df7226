//! Schema declaration: field descriptors, schema types and instances.
//!
//! This module handles:
//! - Building immutable schema types from field declarations
//! - Constructing instances populated from deep-copied defaults
//! - Deriving comment maps from field documentation

pub mod builder;
pub mod comments;
pub mod instance;
pub mod types;

pub use builder::{FieldDecl, FieldDescriptor, SchemaBuilder, SchemaType, is_identifier};
pub use comments::CommentMap;
pub use instance::SchemaInstance;
pub use types::{FieldType, Value};
