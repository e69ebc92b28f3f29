use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET_VARS: [&str; 5] = [
    "CONFLUENCE_BASE_URL",
    "CONFLUENCE_SPACE_KEY",
    "CONFLUENCE_USERNAME",
    "CONFLUENCE_ACCESS_TOKEN",
    "CONFLUENCE_PERSONAL_ACCESS_TOKEN",
];

/// The binary with every Confluence variable removed from its environment.
fn clean_command() -> Command {
    let mut cmd = Command::cargo_bin("confluence-export").expect("Binary exists");
    for key in SECRET_VARS {
        cmd.env_remove(key);
    }
    cmd
}

fn config_file(yaml: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_export_subcommand() {
    clean_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("export"));
}

#[test]
fn export_rejects_unknown_format() {
    let config = config_file("confluence:\n  space_key: DOCS\n");
    clean_command()
        .args(["export", "--format", "docx", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported output format"));
}

#[test]
fn export_fails_without_config_file() {
    clean_command()
        .args(["export", "--config", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

/// Answers the unauthenticated connectivity check on `/`.
async fn reachable_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn export_fails_without_credentials() {
    let server = reachable_server().await;
    let config = config_file(&format!(
        "confluence:\n  base_url: \"{}\"\n  space_key: DOCS\n",
        server.uri()
    ));
    clean_command()
        .arg("export")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing credentials"));
}

#[test]
fn unreachable_base_url_is_reported_before_missing_credentials() {
    let config = config_file("confluence:\n  base_url: http://127.0.0.1:1\n");
    clean_command()
        .arg("export")
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid base URL http://127.0.0.1:1"))
        .stderr(predicate::str::contains("missing credentials").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_first_batch_is_reported_as_partial_not_empty() {
    let server = reachable_server().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let out = tempdir().unwrap();
    let config = config_file(&format!(
        "confluence:\n  base_url: \"{}\"\n  space_key: DOCS\n",
        server.uri()
    ));

    clean_command()
        .arg("export")
        .arg("--config")
        .arg(config.path())
        .arg("--output-dir")
        .arg(out.path())
        .env("CONFLUENCE_PERSONAL_ACCESS_TOKEN", "expired")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No pages exported from space DOCS: listing failed at offset 0",
        ))
        .stdout(predicate::str::contains("No pages found").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn export_cli_happy_flow_writes_archive() {
    let server = reachable_server().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content"))
        .and(query_param("start", "0"))
        .and(header("authorization", "Bearer pat-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "size": 1,
            "results": [{
                "id": "101",
                "type": "page",
                "status": "current",
                "title": "Runbook",
                "body": { "storage": { "value": "<p>Restart the service.</p>" } }
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "size": 0, "results": [] })))
        .mount(&server)
        .await;

    let out = tempdir().unwrap();
    let config = config_file(&format!(
        "confluence:\n  base_url: \"{}\"\n  space_key: DOCS\nexport:\n  format: txt\n  process_attachments: false\n",
        server.uri()
    ));

    let mut cmd = clean_command();
    cmd.arg("export")
        .arg("--config")
        .arg(config.path())
        .arg("--format")
        .arg("md")
        .arg("--output-dir")
        .arg(out.path())
        .env("CONFLUENCE_PERSONAL_ACCESS_TOKEN", "pat-123");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 pages from space DOCS"));

    let archives: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("confluence_export_") && name.ends_with(".zip"))
        .collect();
    assert_eq!(archives.len(), 1, "expected one archive, found {archives:?}");

    let exported: Vec<_> = walk_files(out.path())
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    assert_eq!(exported.len(), 1);
    let markdown = std::fs::read_to_string(&exported[0]).unwrap();
    assert!(markdown.starts_with("# Runbook\n"));
    assert!(markdown.contains("Restart the service."));
}

fn walk_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use confluence_export::cli::{run, Cli, Commands};

    // A missing config file still emits the event before failing.
    let cli = Cli {
        command: Commands::Export {
            config: std::path::PathBuf::from("dummy.yaml"),
            format: None,
            output_dir: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
