// tests/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;
use taskwarden::config::load_and_validate;
use taskwarden::errors::TaskwardenError;

fn task_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[test]
fn test_constraint_cycle_returns_structured_error() {
    let file = task_file(
        r#"
[task]
name = "cyclic"

[[process]]
name = "A"
cmdline = "echo A"

[[process]]
name = "B"
cmdline = "echo B"

[[constraint]]
order = ["A", "B", "A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskwardenError::CyclicConstraint(msg)) => {
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected CyclicConstraint error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_process_in_constraint() {
    let file = task_file(
        r#"
[task]
name = "unknown"

[[process]]
name = "A"
cmdline = "echo A"

[[constraint]]
order = ["A", "NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskwardenError::UnknownProcess { process, context }) => {
            assert_eq!(process, "NonExistent");
            assert!(context.contains("constraint"));
        }
        Err(e) => panic!("Expected UnknownProcess error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_duplicate_process_name() {
    let file = task_file(
        r#"
[task]
name = "dupes"

[[process]]
name = "A"
cmdline = "echo one"

[[process]]
name = "A"
cmdline = "echo two"
"#,
    );

    let result = load_and_validate(file.path());
    assert!(
        matches!(result, Err(TaskwardenError::DuplicateProcess(ref name)) if name == "A"),
        "got {result:?}"
    );
}

#[test]
fn test_zero_process_max_failures_is_rejected() {
    let file = task_file(
        r#"
[task]
name = "zero"

[[process]]
name = "A"
cmdline = "echo A"
max_failures = 0
"#,
    );

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskwardenError::Config(_))), "got {result:?}");
}

#[test]
fn test_malformed_toml() {
    let file = task_file("[task\nname = ");

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskwardenError::Toml(_))), "got {result:?}");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Missing.toml"));
    assert!(matches!(result, Err(TaskwardenError::Io(_))), "got {result:?}");
}

#[test]
fn test_valid_file_loads() {
    let file = task_file(
        r#"
[task]
name = "failing_task"
max_failures = 2

[[process]]
name = "a"
cmdline = "echo a"

[[process]]
name = "b"
cmdline = "exit 1"

[[process]]
name = "c"
cmdline = "echo c"

[[constraint]]
order = ["a", "b", "c"]
"#,
    );

    let loaded = load_and_validate(file.path()).unwrap();
    assert_eq!(loaded.task.name(), "failing_task");
    assert_eq!(loaded.task.processes().len(), 3);
    assert_eq!(loaded.task.constraints().len(), 2);
}
