//! Integration tests for the Squidread CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build a small EPUB and write it into `dir`
fn create_test_epub(dir: &TempDir, name: &str, title: &str) -> PathBuf {
    use epub_builder::{EpubBuilder, EpubContent, ZipLibrary};

    let mut builder = EpubBuilder::new(ZipLibrary::new().unwrap()).unwrap();
    builder.metadata("title", title).unwrap();
    builder
        .add_content(
            EpubContent::new(
                "chapter_1.xhtml",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><h1>One</h1><p>Call me Ishmael.</p></body></html>"#
                    .as_bytes(),
            )
            .title("One"),
        )
        .unwrap();

    let mut out = Vec::new();
    builder.generate(&mut out).unwrap();

    let path = dir.path().join(name);
    fs::write(&path, out).expect("Failed to write test file");
    path
}

fn squidread(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("squidread").unwrap();
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// Run `squidread id` and return the printed id
fn id_of(path: &Path) -> String {
    let output = Command::cargo_bin("squidread")
        .unwrap()
        .arg("id")
        .arg(path)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

fn list_json(data_dir: &Path) -> Vec<serde_json::Value> {
    let output = squidread(data_dir).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("squidread").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("locate"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("--data-dir"));
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("squidread").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("squidread"));
}

#[test]
fn test_import_requires_files() {
    let mut cmd = Command::cargo_bin("squidread").unwrap();
    cmd.arg("import")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_id_is_content_derived() {
    let temp_dir = TempDir::new().unwrap();
    let first = create_test_epub(&temp_dir, "a.epub", "Same");
    let copy = temp_dir.path().join("b.epub");
    fs::copy(&first, &copy).unwrap();

    let id = id_of(&first);
    assert_eq!(id.len(), 12);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(id_of(&copy), id);
}

#[test]
fn test_id_nonexistent_file() {
    let mut cmd = Command::cargo_bin("squidread").unwrap();
    cmd.args(["id", "/nonexistent/file.epub"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_list_empty_library() {
    let data = TempDir::new().unwrap();
    squidread(data.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Library is empty"));
    assert!(list_json(data.path()).is_empty());
}

#[test]
fn test_import_then_reimport() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let book = create_test_epub(&files, "moby.epub", "Moby Dick");
    let id = id_of(&book);

    squidread(data.path())
        .arg("import")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Added {}", id)))
        .stdout(predicate::str::contains("1 added"));

    squidread(data.path())
        .arg("import")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("Already in library"))
        .stdout(predicate::str::contains("1 already present"));

    let books = list_json(data.path());
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["id"], id.as_str());
    assert_eq!(books[0]["name"], "moby.epub");
    assert_eq!(books[0]["title"], "Moby Dick");
    assert!(data.path().join("books").join(format!("{}.json", id)).exists());
}

#[test]
fn test_import_skips_non_epub() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let good = create_test_epub(&files, "good.epub", "Good");
    let notes = files.path().join("notes.txt");
    fs::write(&notes, "not a book").unwrap();

    squidread(data.path())
        .arg("import")
        .arg(&good)
        .arg(&notes)
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 added"))
        .stdout(predicate::str::contains("1 failed"))
        .stderr(predicate::str::contains("could not be imported"));

    assert_eq!(list_json(data.path()).len(), 1);
}

#[test]
fn test_open_and_locate() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let book = create_test_epub(&files, "moby.epub", "Moby Dick");
    let id = id_of(&book);

    squidread(data.path()).arg("import").arg(&book).assert().success();

    squidread(data.path())
        .args(["open", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("start of book"));

    squidread(data.path())
        .args(["locate", &id, "epubcfi(/6/4!/4/2)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved location"));

    // No id: reopens the last opened book
    squidread(data.path())
        .arg("open")
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("Resume at: epubcfi(/6/4!/4/2)"));

    squidread(data.path())
        .args(["locate", &id, ""])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared location"));
    assert!(list_json(data.path())[0]["last_location"].is_null());
}

#[test]
fn test_open_empty_library() {
    let data = TempDir::new().unwrap();
    squidread(data.path())
        .arg("open")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Library is empty"));
}

#[test]
fn test_open_skips_deleted_last_book() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let first = create_test_epub(&files, "first.epub", "First");
    let second = create_test_epub(&files, "second.epub", "Second");
    let first_id = id_of(&first);
    let second_id = id_of(&second);

    squidread(data.path())
        .arg("import")
        .arg(&first)
        .arg(&second)
        .assert()
        .success();

    // Deleted by another process, leaving the pointer stale
    fs::remove_file(data.path().join("books").join(format!("{}.json", second_id))).unwrap();

    squidread(data.path())
        .arg("open")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Opened {}", first_id)));

    let pointer = fs::read_to_string(data.path().join("last_opened_book")).unwrap();
    assert_eq!(pointer.trim(), first_id);
}

#[test]
fn test_export_round_trips_bytes() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let book = create_test_epub(&files, "moby.epub", "Moby Dick");
    let id = id_of(&book);
    squidread(data.path()).arg("import").arg(&book).assert().success();

    let output = files.path().join("out").join("copy.epub");
    squidread(data.path())
        .args(["export", &id, "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));

    assert_eq!(fs::read(&output).unwrap(), fs::read(&book).unwrap());
}

#[test]
fn test_delete_removes_exactly_one() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let first = create_test_epub(&files, "first.epub", "First");
    let second = create_test_epub(&files, "second.epub", "Second");
    let first_id = id_of(&first);
    let second_id = id_of(&second);

    squidread(data.path())
        .arg("import")
        .arg(&first)
        .arg(&second)
        .assert()
        .success();

    squidread(data.path())
        .args(["delete", &first_id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted {}", first_id)));

    let books = list_json(data.path());
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["id"], second_id.as_str());

    squidread(data.path())
        .args(["delete", &first_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_id_rejected() {
    let data = TempDir::new().unwrap();
    squidread(data.path())
        .args(["delete", "../etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a book id"));
}

#[test]
fn test_data_dir_from_env() {
    let files = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let book = create_test_epub(&files, "moby.epub", "Moby Dick");

    Command::cargo_bin("squidread")
        .unwrap()
        .env("SQUIDREAD_DATA_DIR", data.path())
        .arg("import")
        .arg(&book)
        .assert()
        .success();

    assert_eq!(list_json(data.path()).len(), 1);
}
