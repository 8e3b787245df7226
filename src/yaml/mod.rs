//! YAML loading and comment-aware dumping.
//!
//! This module handles:
//! - Sparse, all-or-nothing overlay of YAML documents onto instances
//! - Rendering instances back to YAML with field docs as comments

pub mod dumper;
pub mod loader;

pub use dumper::{dump_config, dump_config_plain, save_config};
pub use loader::{load_config, load_config_from_reader};
