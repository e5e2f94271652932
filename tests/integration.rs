use std::path::Path;
use std::process::Command;

use expect_test::expect_file;
use walkdir::WalkDir;

fn has_skip_marker(args: &str) -> bool {
    args.lines()
        .next()
        .is_some_and(|line| line.contains("skip integration test"))
}

/// The arguments are the whitespace-separated words of the lines not starting with `#`.
fn parse_args(args: &str) -> Vec<String> {
    args.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(str::split_ascii_whitespace)
        .map(ToOwned::to_owned)
        .collect()
}

fn check_output(args_file: impl AsRef<Path>, expected_output_file: impl AsRef<Path>) {
    let args_path = args_file.as_ref();
    let args = std::fs::read_to_string(args_path).unwrap();
    if has_skip_marker(&args) {
        println!("Skipping {args_path:?}.");
        return;
    }
    let binary_path = env!("CARGO_BIN_EXE_dstruct");
    let mut command = Command::new(binary_path);
    command
        .env("RUST_BACKTRACE", "1")
        .args(parse_args(&args))
        .arg("--no-timing");
    let output = command.output().unwrap();
    if !output.status.success() {
        panic!(
            "The command {:?} failed with the following output: {}",
            command,
            String::from_utf8(output.stderr).unwrap()
        )
    }
    let output = String::from_utf8(output.stdout).unwrap();
    let expected_output = expect_file![expected_output_file.as_ref()];
    expected_output.assert_eq(&output);
}

fn check_dir(dir: &str) {
    let mut count = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.unwrap();
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        // every ".args" file has a corresponding ".expect" file
        if path.extension() == Some("args".as_ref()) {
            println!("Testing {} ...", path.display());
            let expect_path = path.with_extension("expect");
            check_output(path, &expect_path);
            count += 1;
        }
    }
    assert!(count > 0, "No tests were run in {dir}!");
}

fn check_test_dir(dir: &str) {
    let test_expect_dir = format!("{}/tests/expect/{dir}", env!("CARGO_MANIFEST_DIR"));
    check_dir(&test_expect_dir);
}

#[test]
fn expect_tests_layout() {
    check_test_dir("layout");
}

#[test]
fn expect_tests_rules() {
    check_test_dir("rules");
}

#[test]
fn expect_tests_eval() {
    check_test_dir("eval");
}

#[test]
fn invalid_arguments_fail() {
    let output = Command::new(env!("CARGO_BIN_EXE_dstruct"))
        .args(["eval", "ln", "--at"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
