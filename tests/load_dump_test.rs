use confclasses::schema::{FieldDecl, FieldType, SchemaBuilder, SchemaType, Value};
use confclasses::yaml::{dump_config, dump_config_plain, load_config};
use confclasses::{ConfError, ConfigHandle};
use std::sync::Arc;

fn repeating() -> Arc<SchemaType> {
	SchemaBuilder::new("RepeatingConfig")
		.field(FieldDecl::new("test", FieldType::Str))
		.field(FieldDecl::untyped("default1").default(123))
		.build()
		.unwrap()
}

fn nested_config() -> Arc<SchemaType> {
	SchemaBuilder::new("NestedConfig")
		.field(FieldDecl::untyped("field1").default("foo"))
		.field(
			FieldDecl::untyped("field2")
				.default("bar")
				.doc("test document for field 2"),
		)
		.field(
			FieldDecl::new("hashed_field3", FieldType::Nested(repeating()))
				.default(Value::map([("test", "nested")])),
		)
		.build()
		.unwrap()
}

fn test_config() -> Arc<SchemaType> {
	let repeating = repeating();
	SchemaBuilder::new("TestConfig")
		.field(FieldDecl::new("nested", FieldType::Nested(nested_config())))
		.field(
			FieldDecl::untyped("field3")
				.default(42)
				.doc("test document for field 3"),
		)
		.field(FieldDecl::untyped("hashed_field1").default(vec!["test", "items"]))
		.field(FieldDecl::untyped("hashed_field2").default(Value::map([("key1", "value1")])))
		.field(
			FieldDecl::new("hashed_field4", FieldType::Nested(Arc::clone(&repeating)))
				.default(repeating.instance_with([("test", "base")]).unwrap()),
		)
		.build()
		.unwrap()
}

// ============================================================================
// Defaults and isolation
// ============================================================================

#[test]
fn test_defaults_after_empty_load() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "").unwrap();

	assert_eq!(conf.int("field3").unwrap(), 42);
	assert_eq!(conf.nested("nested").unwrap().str("field1").unwrap(), "foo");
	assert_eq!(conf.nested("hashed_field4").unwrap().str("test").unwrap(), "base");
	assert_eq!(
		conf.nested("nested")
			.unwrap()
			.nested("hashed_field3")
			.unwrap()
			.str("test")
			.unwrap(),
		"nested"
	);
}

#[test]
fn test_hashed_fields_do_not_pollute() {
	let schema = test_config();
	let mut conf1 = schema.instantiate();
	let mut conf2 = schema.instantiate();
	load_config(&mut conf1, "").unwrap();
	load_config(&mut conf2, "").unwrap();

	conf1
		.get_mut("hashed_field1")
		.unwrap()
		.as_list_mut()
		.unwrap()
		.push("new".into());
	conf1
		.nested_mut("hashed_field4")
		.unwrap()
		.set("test", "changed")
		.unwrap();

	assert_eq!(conf2.list("hashed_field1").unwrap().len(), 2);
	assert_eq!(conf2.nested("hashed_field4").unwrap().str("test").unwrap(), "base");
}

// ============================================================================
// Overlay semantics
// ============================================================================

#[test]
fn test_load_overlays_present_keys() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "field3: 59\nnested:\n  field1: \"test\"\n").unwrap();

	assert_eq!(conf.int("field3").unwrap(), 59);
	let nested = conf.nested("nested").unwrap();
	assert_eq!(nested.str("field1").unwrap(), "test");
	assert_eq!(nested.str("field2").unwrap(), "bar");
}

#[test]
fn test_second_load_keeps_earlier_values() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "field3: 1\n").unwrap();
	load_config(&mut conf, "nested:\n  field2: baz\n").unwrap();

	assert_eq!(conf.int("field3").unwrap(), 1);
	assert_eq!(conf.nested("nested").unwrap().str("field2").unwrap(), "baz");
}

#[test]
fn test_list_replaces_instead_of_appending() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "hashed_field1: [\"x\"]").unwrap();
	assert_eq!(conf.list("hashed_field1").unwrap(), &[Value::from("x")]);
}

#[test]
fn test_unknown_key_leaves_instance_unchanged() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "field3: 5").unwrap();
	let before = conf.clone();

	let err = load_config(&mut conf, "field3: 6\nbogus: 1\n").unwrap_err();
	match err {
		ConfError::UnknownKey { path } => assert_eq!(path, "bogus"),
		other => panic!("Expected UnknownKey, got {other:?}"),
	}
	assert_eq!(conf, before);
	assert_eq!(conf.int("field3").unwrap(), 5);
}

// ============================================================================
// Dumping
// ============================================================================

#[test]
fn test_save_matches_expected_layout() {
	let mut conf = test_config().instantiate();
	load_config(&mut conf, "").unwrap();
	assert_eq!(
		dump_config_plain(&conf),
		r#"nested:
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
"#
	);
}

#[test]
fn test_dump_then_load_round_trips() {
	let schema = test_config();
	let mut original = schema.instantiate();
	load_config(
		&mut original,
		"field3: -3\nhashed_field1: [\"yes\", \"1.5\", \"\"]\nhashed_field2:\n  \"a b\": [1, 2.5, true, null]\n",
	)
	.unwrap();

	let mut fresh = schema.instantiate();
	load_config(&mut fresh, &dump_config(&original)).unwrap();
	assert_eq!(fresh, original);
}

#[test]
fn test_doc_comments_sit_next_to_their_key() {
	let conf = test_config().instantiate();
	let dumped = dump_config(&conf);

	let lines: Vec<&str> = dumped.lines().collect();
	let key = lines.iter().position(|l| *l == "field3: 42").unwrap();
	assert_eq!(lines[key - 1], "# test document for field 3");

	let nested_key = lines.iter().position(|l| *l == "  field2: bar").unwrap();
	assert_eq!(lines[nested_key - 1], "  # test document for field 2");

	let parsed: serde_yaml::Value = serde_yaml::from_str(&dumped).unwrap();
	assert_eq!(parsed["field3"], serde_yaml::Value::from(42));
	assert!(!format!("{parsed:?}").contains("test document"));
}

// ============================================================================
// Shared handle
// ============================================================================

#[test]
fn test_handle_identity_is_stable_across_load() {
	let handle = ConfigHandle::new(&test_config());
	let consumer = handle.clone();

	handle.load("field3: 100").unwrap();

	assert!(consumer.same_instance(&handle));
	assert_eq!(consumer.read().int("field3").unwrap(), 100);
}
