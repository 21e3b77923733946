use std::io::Write;

use clap::Parser;
use mungo_cli::{run, Args, CliError};

fn input_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn args(file: &tempfile::NamedTempFile, rest: &[&str]) -> Args {
    let path = file.path().to_str().unwrap();
    let mut argv = vec!["mungo", "--input", path];
    argv.extend_from_slice(rest);
    Args::parse_from(argv)
}

#[tokio::test]
async fn prints_transformed_records() {
    let file = input_file(r#"[{"x": 0, "y": 0}, {"x": 1, "y": 1}, {"x": 2, "y": 4}]"#);
    let output = run(args(
        &file,
        &["--stage", "filter p => p.y > 0", "--stage", "map p => p.x + p.y"],
    ))
    .await
    .unwrap();
    assert_eq!(output, "[2,6]");
}

#[tokio::test]
async fn prints_the_count() {
    let file = input_file("[1, 2, 3, 4, 5]");
    let output = run(args(&file, &["-s", "filter n => n % 2 == 1", "--count"]))
        .await
        .unwrap();
    assert_eq!(output, "3");
}

#[tokio::test]
async fn runaway_loops_hit_the_iteration_limit() {
    let file = input_file("[1]");
    let err = run(args(
        &file,
        &[
            "--stage",
            "map n => { while (true) {} }",
            "--max-loop-iterations",
            "10",
        ],
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, CliError::Dataset(_)));
}

#[tokio::test]
async fn block_bodies_use_the_full_language() {
    let file = input_file(r#"[{"name": "ada", "tags": ["x"]}, {"name": "bob", "tags": []}]"#);
    let output = run(args(
        &file,
        &[
            "--stage",
            "filter r => { return r.tags.includes('x'); }",
            "--stage",
            "map r => r.name.toUpperCase()",
        ],
    ))
    .await
    .unwrap();
    assert_eq!(output, r#"["ADA"]"#);
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let args = Args::parse_from(["mungo", "--input", "/nonexistent/mungo/rows.json"]);
    assert!(matches!(run(args).await, Err(CliError::Io(_))));
}
