//! Schema declaration files.
//!
//! This module handles:
//! - TOML declaration parsing into named schema types
//! - Recovering field docs from comment lines in the declaration source

pub mod parser;
pub mod scan;

pub use parser::{Declaration, parse_declaration_file, parse_declaration_str};
pub use scan::scan_field_comments;
