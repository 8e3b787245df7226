use crate::schema::CommentMap;
use regex::Regex;
use std::sync::LazyLock;

static SCHEMA_HEADER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\[\s*schema\.([A-Za-z_][A-Za-z0-9_]*)\s*\]\s*(#.*)?$").expect("valid regex")
});

static TABLE_HEADER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\[\[?[^\]]*\]\]?\s*(#.*)?$").expect("valid regex"));

static FIELD_LINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=").expect("valid regex"));

/// Recover field docs from a declaration's source text.
///
/// A run of comment lines directly below a field line, with no blank line in
/// between, documents that field:
///
/// ```toml
/// [schema.Server]
/// port = 8080
/// # Port the server listens on.
/// ```
///
/// Anything that is not a field line or a comment ends the run. Lines that
/// continue a multi-line value (arrays, inline tables, `"""` strings) belong
/// to the field above them.
pub fn scan_field_comments(source: &str) -> CommentMap {
	let mut map = CommentMap::new();
	let mut schema: Option<String> = None;
	let mut field: Option<String> = None;
	let mut pending: Vec<String> = Vec::new();
	let mut value = OpenValue::default();

	for line in source.lines() {
		let line = line.trim();

		if value.is_open() {
			value.track(line);
			continue;
		}

		if let Some(comment) = line.strip_prefix('#') {
			if field.is_some() {
				pending.push(comment.strip_prefix(' ').unwrap_or(comment).trim_end().to_string());
			}
			continue;
		}

		flush(&mut map, schema.as_deref(), field.take(), &mut pending);

		if let Some(caps) = SCHEMA_HEADER.captures(line) {
			schema = Some(caps[1].to_string());
		} else if TABLE_HEADER.is_match(line) {
			schema = None;
		} else if let Some(caps) = FIELD_LINE.captures(line) {
			if schema.is_some() {
				field = Some(caps[1].to_string());
			}
			value.track(&line[caps[0].len()..]);
		}
	}

	flush(&mut map, schema.as_deref(), field, &mut pending);
	map
}

/// Brackets and multi-line strings left open by a key's value.
#[derive(Debug, Default)]
struct OpenValue {
	depth: usize,
	string: Option<&'static str>,
}

impl OpenValue {
	fn is_open(&self) -> bool {
		self.depth > 0 || self.string.is_some()
	}

	fn track(&mut self, text: &str) {
		let mut rest = text;
		loop {
			if let Some(delim) = self.string {
				match rest.find(delim) {
					Some(end) => {
						rest = &rest[end + delim.len()..];
						self.string = None;
					}
					None => return,
				}
			}

			let Some(c) = rest.chars().next() else {
				return;
			};
			match c {
				'#' => return,
				'"' | '\'' => {
					let triple = if c == '"' { "\"\"\"" } else { "'''" };
					if let Some(after) = rest.strip_prefix(triple) {
						self.string = Some(triple);
						rest = after;
					} else {
						rest = skip_string(&rest[1..], c);
					}
					continue;
				}
				'[' | '{' => self.depth += 1,
				']' | '}' => self.depth = self.depth.saturating_sub(1),
				_ => {}
			}
			rest = &rest[c.len_utf8()..];
		}
	}
}

/// The text after a single-line string that opened with `quote`.
fn skip_string(rest: &str, quote: char) -> &str {
	let mut escaped = false;
	for (i, c) in rest.char_indices() {
		if escaped {
			escaped = false;
		} else if c == '\\' && quote == '"' {
			escaped = true;
		} else if c == quote {
			return &rest[i + c.len_utf8()..];
		}
	}
	""
}

fn flush(map: &mut CommentMap, schema: Option<&str>, field: Option<String>, pending: &mut Vec<String>) {
	if let (Some(schema), Some(field)) = (schema, field) {
		let doc = pending.join("\n");
		if !doc.trim().is_empty() {
			map.insert(schema, &field, doc.trim());
		}
	}
	pending.clear();
}
