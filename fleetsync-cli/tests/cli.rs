use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn fleetsync_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fleetsync").expect("binary");
    cmd.current_dir(cwd)
        .env_remove("FLEETSYNC_RELEASE_TAG")
        .env_remove("FLEETSYNC_BOT_TOKEN")
        .env("RUST_LOG", "warn");
    cmd
}

/// Serve the same catalog body to every request until the test ends.
fn serve_catalog(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/pipelines.json", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let mut reader = BufReader::new(stream);
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line.trim_end().is_empty() {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = reader.into_inner().write_all(response.as_bytes());
        }
    });
    url
}

const CATALOG: &str = r#"{"remote_workflows": [
    {"name": "rnaseq", "description": "RNA sequencing"},
    {"name": "chipseq"},
    {"name": "rnafusion"}
]}"#;

#[test]
fn sync_without_release_tag_fails_naming_the_variable() {
    let cwd = TempDir::new().unwrap();
    let template = cwd.path().join("template");
    fs::create_dir_all(&template).unwrap();
    fs::write(template.join("README.md.tera"), "# {{ pipeline.name }}\n").unwrap();

    fleetsync_cmd(cwd.path())
        .args(["sync", "--catalog-url", "http://127.0.0.1:9/pipelines.json"])
        .args(["--org", "example", "--template-dir"])
        .arg(&template)
        .env("FLEETSYNC_BOT_TOKEN", "secret-token")
        .assert()
        .failure()
        .stderr(contains("FLEETSYNC_RELEASE_TAG"))
        .stderr(contains("secret-token").not());
}

#[test]
fn sync_without_catalog_url_reports_missing_setting() {
    let cwd = TempDir::new().unwrap();
    fleetsync_cmd(cwd.path())
        .args(["sync", "--org", "example"])
        .assert()
        .failure()
        .stderr(contains("catalog_url"));
}

#[test]
fn list_applies_blacklist_from_settings_file() {
    let cwd = TempDir::new().unwrap();
    let url = serve_catalog(CATALOG);
    fs::write(cwd.path().join("blacklist.json"), r#"{"pipelines": ["chipseq"]}"#).unwrap();
    fs::write(
        cwd.path().join("fleetsync.yaml"),
        format!("catalog_url: {url}\nblacklist: blacklist.json\n"),
    )
    .unwrap();

    fleetsync_cmd(cwd.path())
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(contains("rnaseq"))
        .stdout(contains("rnafusion"))
        .stdout(contains("chipseq").not());
}

#[test]
fn list_with_unreachable_catalog_selects_nothing() {
    let cwd = TempDir::new().unwrap();
    fleetsync_cmd(cwd.path())
        .args(["list", "--catalog-url", "http://127.0.0.1:9/pipelines.json"])
        .assert()
        .success()
        .stdout(contains("No pipelines selected."));
}

#[test]
fn unknown_settings_key_is_rejected() {
    let cwd = TempDir::new().unwrap();
    fs::write(cwd.path().join("fleetsync.yaml"), "catalog_ur1: typo\n").unwrap();
    fleetsync_cmd(cwd.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("fleetsync.yaml"));
}
