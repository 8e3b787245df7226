/// Library-level structured errors for confclasses.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
	#[error("Invalid declaration of {schema}.{field}: {reason}")]
	SchemaDeclaration {
		schema: String,
		field: String,
		reason: String,
	},

	#[error("Failed to parse YAML document")]
	YamlParse {
		#[source]
		source: serde_yaml::Error,
	},

	#[error("YAML config must be a mapping, got {found}")]
	NotAMapping { found: String },

	#[error("Unknown config key: {path}")]
	UnknownKey { path: String },

	#[error("Invalid type at {path}: expected {expected}, got {found}")]
	TypeMismatch {
		path: String,
		expected: String,
		found: String,
	},

	#[error("Missing required config field: {path}")]
	MissingValue { path: String },

	#[error("{schema} has no field named {field}")]
	UnknownField { schema: String, field: String },

	#[error("Accessing config {schema}.{field} before it was loaded")]
	NotLoaded { schema: String, field: String },

	#[error("Failed to parse schema declaration")]
	DeclarationParse {
		#[source]
		source: toml::de::Error,
	},

	#[error("I/O error while reading or writing config")]
	Io {
		#[source]
		source: std::io::Error,
	},
}

impl ConfError {
	/// Shorthand for a declaration error on one field of a schema.
	pub(crate) fn declaration(
		schema: impl Into<String>,
		field: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		ConfError::SchemaDeclaration {
			schema: schema.into(),
			field: field.into(),
			reason: reason.into(),
		}
	}
}

/// Result type alias using ConfError.
pub type Result<T> = std::result::Result<T, ConfError>;
