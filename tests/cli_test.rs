//! End-to-end tests for the command dispatch, driven through parsed CLI args

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

use treevalues::application::services::get_one;
use treevalues::application::Options;
use treevalues::cli::commands::execute_command;
use treevalues::cli::Cli;
use treevalues::domain::{ChoiceOption, NodeSpec};
use treevalues::exitcode;
use treevalues::infrastructure::document_io::{load_document, save_document};
use treevalues::util::testing::{build, init_test_setup};

fn form() -> NodeSpec {
    NodeSpec::new("form").children([
        NodeSpec::new("input").named("user"),
        NodeSpec::new("select")
            .named("color")
            .option(ChoiceOption::new("Red").selected())
            .option(ChoiceOption::new("Blue")),
        NodeSpec::new("fieldset")
            .named("address")
            .child(NodeSpec::new("input").named("city").value("Paris")),
    ])
}

fn write_document(dir: &Path, name: &str, spec: NodeSpec) -> PathBuf {
    let path = dir.join(name);
    let (doc, _) = build(spec);
    save_document(&doc, &path, true).expect("save document");
    path
}

fn write_values(dir: &Path, name: &str, values: serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, values.to_string()).expect("write values");
    path
}

fn run(args: &[&str]) -> Result<(), i32> {
    let cli = Cli::parse_from(std::iter::once("treevalues").chain(args.iter().copied()));
    execute_command(&cli).map_err(|e| e.exit_code())
}

fn read(path: &Path, key: &str) -> serde_json::Value {
    let doc = load_document(path).expect("load document");
    let root = doc.root().expect("root");
    get_one(&doc, &[root], key, &Options::default())
}

#[test]
fn given_values_file_when_set_with_write_then_document_is_updated() {
    init_test_setup();
    // Arrange
    let dir = TempDir::new().unwrap();
    let doc = write_document(dir.path(), "form.json", form());
    let values = write_values(
        dir.path(),
        "values.json",
        json!({"user": "ada", "color": "Blue", "address": {"city": "London"}}),
    );

    // Act
    let result = run(&[
        "set",
        doc.to_str().unwrap(),
        values.to_str().unwrap(),
        "--write",
    ]);

    // Assert
    assert_eq!(result, Ok(()));
    assert_eq!(read(&doc, "user"), json!("ada"));
    assert_eq!(read(&doc, "color"), json!("Blue"));
    assert_eq!(read(&doc, "city"), json!("London"));
}

#[test]
fn given_key_flag_when_set_then_scalar_values_file_is_accepted() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let doc = write_document(dir.path(), "form.json", form());
    let values = write_values(dir.path(), "value.json", json!("Rome"));

    // Act
    let result = run(&[
        "set",
        doc.to_str().unwrap(),
        values.to_str().unwrap(),
        "--key",
        "city",
        "-w",
    ]);

    // Assert
    assert_eq!(result, Ok(()));
    assert_eq!(read(&doc, "city"), json!("Rome"));
}

#[test]
fn given_set_without_write_when_running_then_file_is_unchanged() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let doc = write_document(dir.path(), "form.json", form());
    let before = fs::read_to_string(&doc).unwrap();
    let values = write_values(dir.path(), "values.json", json!({"user": "ada"}));

    // Act
    let result = run(&["set", doc.to_str().unwrap(), values.to_str().unwrap()]);

    // Assert
    assert_eq!(result, Ok(()));
    assert_eq!(fs::read_to_string(&doc).unwrap(), before);
}

#[test]
fn given_two_documents_when_copy_with_write_then_target_receives_values() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let source = write_document(dir.path(), "source.json", form());
    let target_spec = NodeSpec::new("div").children([
        NodeSpec::new("input").named("city"),
        NodeSpec::new("span").named("color"),
    ]);
    let target = write_document(dir.path(), "target.json", target_spec);

    // Act
    let result = run(&[
        "copy",
        source.to_str().unwrap(),
        target.to_str().unwrap(),
        "--write",
    ]);

    // Assert
    assert_eq!(result, Ok(()));
    assert_eq!(read(&target, "city"), json!("Paris"));
    assert_eq!(read(&target, "color"), json!("Red"));
}

#[rstest]
#[case::missing_document(vec!["get", "{dir}/absent.json"], exitcode::NOINPUT)]
#[case::unknown_root(vec!["get", "{doc}", "--root", "nope"], exitcode::USAGE)]
#[case::scalar_without_key(vec!["set", "{doc}", "{scalar}"], exitcode::USAGE)]
#[case::malformed_values(vec!["set", "{doc}", "{broken}"], exitcode::DATAERR)]
#[case::missing_config(vec!["get", "{doc}", "--config", "{dir}/absent.toml"], exitcode::CONFIG)]
fn given_bad_input_when_running_then_maps_to_exit_code(
    #[case] args: Vec<&str>,
    #[case] expected: i32,
) {
    // Arrange
    let dir = TempDir::new().unwrap();
    let doc = write_document(dir.path(), "form.json", form());
    let scalar = write_values(dir.path(), "scalar.json", json!("x"));
    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{not json").unwrap();
    let args: Vec<String> = args
        .iter()
        .map(|arg| {
            arg.replace("{dir}", &dir.path().display().to_string())
                .replace("{doc}", &doc.display().to_string())
                .replace("{scalar}", &scalar.display().to_string())
                .replace("{broken}", &broken.display().to_string())
        })
        .collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    // Act
    let result = run(&args);

    // Assert
    assert_eq!(result, Err(expected));
}

#[test]
fn given_root_flag_when_get_then_only_that_subtree_is_read() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let doc = write_document(dir.path(), "form.json", form());

    // Act
    let result = run(&["get", doc.to_str().unwrap(), "--root", "address", "--only-nest"]);

    // Assert
    assert_eq!(result, Ok(()));
}

#[test]
fn given_no_command_when_running_then_usage_error() {
    // Act
    let result = run(&[]);

    // Assert
    assert_eq!(result, Err(exitcode::USAGE));
}
