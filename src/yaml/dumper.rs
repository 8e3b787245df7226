use crate::error::{ConfError, Result};
use crate::schema::{CommentMap, FieldDescriptor, SchemaInstance, Value};
use std::fmt::Write as _;
use std::io::Write;

/// Render an instance as YAML, with field docs attached as comments.
pub fn dump_config(instance: &SchemaInstance) -> String {
	render(instance, true)
}

/// Render an instance as YAML without comments.
pub fn dump_config_plain(instance: &SchemaInstance) -> String {
	render(instance, false)
}

/// Write an instance as YAML to a stream.
pub fn save_config<W: Write>(instance: &SchemaInstance, mut writer: W, comments: bool) -> Result<()> {
	writer
		.write_all(render(instance, comments).as_bytes())
		.map_err(|source| ConfError::Io { source })
}

fn render(instance: &SchemaInstance, comments: bool) -> String {
	let comments = comments.then(|| CommentMap::from_schema(instance.schema()));
	let document = instance_node(instance, comments.as_ref());

	let mut out = String::new();
	match document {
		Node::Map(entries) if !entries.is_empty() => write_entries(&entries, 0, &mut out),
		other => write_inline(&other, 0, &mut out),
	}
	out
}

/// Comment-preserving document model.
#[derive(Debug)]
enum Node {
	Scalar(String),
	Seq(Vec<Node>),
	Map(Vec<Entry>),
}

/// `value` is `None` for a required field that has no value yet; it is
/// written as a commented-out placeholder.
#[derive(Debug)]
struct Entry {
	key: String,
	comment: Vec<CommentLine>,
	value: Option<Node>,
}

#[derive(Debug)]
enum CommentLine {
	Blank,
	Text(String),
}

fn instance_node(instance: &SchemaInstance, comments: Option<&CommentMap>) -> Node {
	let schema_name = instance.schema().name();
	let entries = instance
		.entries()
		.map(|(field, value)| {
			let mut comment: Vec<CommentLine> = comments
				.map(|map| field_comment(field, map.get(schema_name, &field.name)))
				.unwrap_or_default();
			if value.is_none() {
				comment.push(CommentLine::Text(format!(
					"{}:  # required, {}",
					field.name,
					field.ty.label()
				)));
			}
			Entry {
				key: field.name.clone(),
				comment,
				value: value.map(|v| value_node(v, comments)),
			}
		})
		.collect();
	Node::Map(entries)
}

/// Comment block placed before a field's key.
///
/// Plain fields get a header with their name and type label; nested sections
/// only get a separating blank line. Doc lines follow either way.
fn field_comment(field: &FieldDescriptor, doc: Option<&str>) -> Vec<CommentLine> {
	let mut lines = vec![CommentLine::Blank];
	if field.ty.as_nested().is_none() {
		lines.push(CommentLine::Text(format!("### {} ###", field.name)));
		lines.push(CommentLine::Text(format!("type: {}", field.ty.label())));
	}
	if let Some(doc) = doc {
		lines.extend(
			doc.trim()
				.lines()
				.map(|line| CommentLine::Text(line.trim().to_string())),
		);
	}
	lines
}

fn value_node(value: &Value, comments: Option<&CommentMap>) -> Node {
	match value {
		Value::Null => Node::Scalar("null".to_string()),
		Value::Bool(b) => Node::Scalar(b.to_string()),
		Value::Int(i) => Node::Scalar(i.to_string()),
		Value::Float(f) => Node::Scalar(render_float(*f)),
		Value::Str(s) => Node::Scalar(render_str(s)),
		// Items repeat, so their docs are not repeated per item.
		Value::List(items) => Node::Seq(items.iter().map(|item| value_node(item, None)).collect()),
		Value::Map(entries) => Node::Map(
			entries
				.iter()
				.map(|(key, value)| Entry {
					key: render_str(key),
					comment: Vec::new(),
					value: Some(value_node(value, None)),
				})
				.collect(),
		),
		Value::Nested(instance) => instance_node(instance, comments),
	}
}

fn write_entries(entries: &[Entry], indent: usize, out: &mut String) {
	for entry in entries {
		write_comment(&entry.comment, indent, out);
		let Some(value) = &entry.value else {
			continue;
		};
		push_indent(indent, out);
		out.push_str(&entry.key);
		out.push(':');
		match value {
			Node::Map(inner) if !inner.is_empty() => {
				out.push('\n');
				write_entries(inner, indent + 2, out);
			}
			Node::Seq(items) if !items.is_empty() => {
				out.push('\n');
				write_items(items, indent, out);
			}
			other => {
				out.push(' ');
				write_inline(other, indent, out);
			}
		}
	}
}

/// Sequence items sit at the same indentation as their parent key.
fn write_items(items: &[Node], indent: usize, out: &mut String) {
	for item in items {
		push_indent(indent, out);
		out.push_str("- ");
		write_inline(item, indent + 2, out);
	}
}

/// Write a node that starts on the current line (after a key or `- `).
fn write_inline(node: &Node, indent: usize, out: &mut String) {
	match node {
		Node::Scalar(s) => {
			out.push_str(s);
			out.push('\n');
		}
		Node::Map(entries) if entries.is_empty() => out.push_str("{}\n"),
		Node::Seq(items) if items.is_empty() => out.push_str("[]\n"),
		Node::Map(entries) => {
			let mut block = String::new();
			write_entries(entries, indent, &mut block);
			out.push_str(&block[indent..]);
		}
		Node::Seq(items) => {
			let mut block = String::new();
			write_items(items, indent, &mut block);
			out.push_str(&block[indent..]);
		}
	}
}

fn write_comment(lines: &[CommentLine], indent: usize, out: &mut String) {
	for line in lines {
		match line {
			CommentLine::Blank => out.push('\n'),
			CommentLine::Text(text) if text.is_empty() => {
				push_indent(indent, out);
				out.push_str("#\n");
			}
			CommentLine::Text(text) => {
				push_indent(indent, out);
				let _ = writeln!(out, "# {text}");
			}
		}
	}
}

fn push_indent(indent: usize, out: &mut String) {
	out.extend(std::iter::repeat_n(' ', indent));
}

/// Render a string scalar so it reads back as the same string.
fn render_str(s: &str) -> String {
	if s.chars().any(char::is_control) {
		return double_quoted(s);
	}
	match serde_yaml::to_string(&serde_yaml::Value::String(s.to_string())) {
		Ok(rendered) if !rendered.trim_end().contains('\n') => rendered.trim_end().to_string(),
		_ => double_quoted(s),
	}
}

fn double_quoted(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('"');
	for c in s.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\t' => out.push_str("\\t"),
			'\r' => out.push_str("\\r"),
			c if c.is_control() => {
				let _ = write!(out, "\\u{:04x}", c as u32);
			}
			c => out.push(c),
		}
	}
	out.push('"');
	out
}

fn render_float(f: f64) -> String {
	if f.is_nan() {
		".nan".to_string()
	} else if f.is_infinite() {
		if f > 0.0 { ".inf" } else { "-.inf" }.to_string()
	} else {
		// Debug formatting always keeps a fraction or exponent, so the value
		// reads back as a float.
		format!("{f:?}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldDecl, FieldType, SchemaBuilder, SchemaType};
	use crate::yaml::load_config;
	use std::sync::Arc;

	fn repeating() -> Arc<SchemaType> {
		SchemaBuilder::new("RepeatingConfig")
			.field(FieldDecl::new("test", FieldType::Str))
			.field(FieldDecl::untyped("default1").default(123))
			.build()
			.unwrap()
	}

	fn test_schema() -> Arc<SchemaType> {
		let repeating = repeating();
		let nested = SchemaBuilder::new("NestedConfig")
			.field(FieldDecl::untyped("field1").default("foo"))
			.field(
				FieldDecl::untyped("field2")
					.default("bar")
					.doc(" test document for field 2 "),
			)
			.field(
				FieldDecl::new("hashed_field3", FieldType::Nested(Arc::clone(&repeating)))
					.default(Value::map([("test", "nested")])),
			)
			.build()
			.unwrap();

		SchemaBuilder::new("TestConfig")
			.field(FieldDecl::new("nested", FieldType::Nested(nested)))
			.field(
				FieldDecl::untyped("field3")
					.default(42)
					.doc(" test document for field 3 "),
			)
			.field(FieldDecl::untyped("hashed_field1").default(vec!["test", "items"]))
			.field(FieldDecl::untyped("hashed_field2").default(Value::map([("key1", "value1")])))
			.field(
				FieldDecl::new("hashed_field4", FieldType::Nested(repeating))
					.default(Value::map([("test", "base")])),
			)
			.build()
			.unwrap()
	}

	#[test]
	fn test_dump_plain_layout() {
		let conf = test_schema().instantiate();
		assert_eq!(
			dump_config_plain(&conf),
			"nested:
  field1: foo
  field2: bar
  hashed_field3:
    test: nested
    default1: 123
field3: 42
hashed_field1:
- test
- items
hashed_field2:
  key1: value1
hashed_field4:
  test: base
  default1: 123
"
		);
	}

	#[test]
	fn test_dump_small_with_comments() {
		let schema = SchemaBuilder::new("SmallExample")
			.field(FieldDecl::untyped("foo").default("test"))
			.build()
			.unwrap();

		assert_eq!(
			dump_config(&schema.instantiate()),
			"\n# ### foo ###\n# type: String\nfoo: test\n"
		);
	}

	#[test]
	fn test_doc_comment_precedes_key() {
		let dumped = dump_config(&test_schema().instantiate());
		assert!(dumped.contains("# type: Integer\n# test document for field 3\nfield3: 42\n"));
		assert!(dumped.contains(
			"  # ### field2 ###\n  # type: String\n  # test document for field 2\n  field2: bar\n"
		));
		assert!(dumped.contains("\nhashed_field4:\n"));
	}

	#[test]
	fn test_round_trip_with_comments() {
		let schema = test_schema();
		let mut original = schema.instantiate();
		load_config(&mut original, "field3: 7\nnested:\n  field2: \"multi\\nline\"\n").unwrap();

		for dumped in [dump_config(&original), dump_config_plain(&original)] {
			let mut fresh = schema.instantiate();
			load_config(&mut fresh, &dumped).unwrap();
			assert_eq!(fresh, original);
		}
	}

	#[test]
	fn test_ambiguous_strings_are_quoted() {
		let schema = SchemaBuilder::new("Tricky")
			.field(FieldDecl::untyped("number_like").default("123"))
			.field(FieldDecl::untyped("bool_like").default("true"))
			.field(FieldDecl::untyped("null_like").default("null"))
			.field(FieldDecl::untyped("empty").default(""))
			.field(FieldDecl::untyped("colon").default("a: b"))
			.build()
			.unwrap();

		let conf = schema.instantiate();
		let mut fresh = schema.instantiate();
		load_config(&mut fresh, &dump_config_plain(&conf)).unwrap();
		assert_eq!(fresh, conf);
	}

	#[test]
	fn test_floats_and_empty_containers() {
		let schema = SchemaBuilder::new("Misc")
			.field(FieldDecl::untyped("whole").default(1.0))
			.field(FieldDecl::untyped("tiny").default(1e-7))
			.field(FieldDecl::untyped("none").default(Vec::<Value>::new()))
			.field(FieldDecl::untyped("nothing").default(Value::Map(Vec::new())))
			.build()
			.unwrap();

		let conf = schema.instantiate();
		let dumped = dump_config_plain(&conf);
		assert!(dumped.contains("whole: 1.0\n"));
		assert!(dumped.contains("none: []\n"));
		assert!(dumped.contains("nothing: {}\n"));

		let mut fresh = schema.instantiate();
		load_config(&mut fresh, &dumped).unwrap();
		assert_eq!(fresh, conf);
	}

	#[test]
	fn test_list_of_sections_layout() {
		let item = SchemaBuilder::new("Item")
			.field(FieldDecl::untyped("name").default("x").doc("item name"))
			.field(FieldDecl::untyped("tags").default(vec!["a", "b"]))
			.build()
			.unwrap();
		let schema = SchemaBuilder::new("Inventory")
			.field(
				FieldDecl::new("items", FieldType::list_of(FieldType::Nested(Arc::clone(&item))))
					.default(vec![item.instantiate()]),
			)
			.build()
			.unwrap();

		let conf = schema.instantiate();
		assert_eq!(
			dump_config_plain(&conf),
			"items:\n- name: x\n  tags:\n  - a\n  - b\n"
		);

		let mut fresh = schema.instantiate();
		load_config(&mut fresh, &dump_config(&conf)).unwrap();
		assert_eq!(fresh, conf);
	}

	#[test]
	fn test_comments_never_become_data() {
		let conf = test_schema().instantiate();
		let dumped = dump_config(&conf);
		let parsed: serde_yaml::Value = serde_yaml::from_str(&dumped).unwrap();
		let top = parsed.as_mapping().unwrap();
		assert_eq!(top.len(), 5);
		assert!(!dumped.lines().any(|l| l.contains("document") && !l.trim_start().starts_with('#')));
	}

	#[test]
	fn test_save_config_writes_stream() {
		let conf = test_schema().instantiate();
		let mut buffer = Vec::new();
		save_config(&conf, &mut buffer, false).unwrap();
		assert_eq!(String::from_utf8(buffer).unwrap(), dump_config_plain(&conf));
	}

	#[test]
	fn test_unset_required_field_is_a_placeholder() {
		let schema = SchemaBuilder::new("Service")
			.field(FieldDecl::new("token", FieldType::Str))
			.field(FieldDecl::untyped("port").default(8080))
			.build()
			.unwrap();
		let conf = schema.instantiate();

		assert_eq!(
			dump_config_plain(&conf),
			"# token:  # required, String\nport: 8080\n"
		);
		assert!(dump_config(&conf).contains("# type: String\n# token:  # required, String\n\n"));

		for dumped in [dump_config(&conf), dump_config_plain(&conf)] {
			let mut fresh = schema.instantiate();
			match load_config(&mut fresh, &dumped).unwrap_err() {
				ConfError::MissingValue { path } => assert_eq!(path, "token"),
				other => panic!("Expected MissingValue, got {other:?}"),
			}
		}
	}
}
