//! Integration tests for the Haven inbox CLI
//!
//! These run parsed command lines against a real SQLite file in a scratch
//! directory and check what the user would see on stdout.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clap::Parser;
use haven_inbox::{InboxConfig, SqliteStore, UserId};
use haven_inbox_cli::{commands, run, Cli};
use serde_json::json;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory removed on drop
struct Scratch(PathBuf);

impl Scratch {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!(
            "haven-inbox-cli-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Scratch(dir)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn write_feed(path: &Path) {
    let feed = json!({
        "messages": [
            {"id": "1", "sender": {"id": "emp-a", "firstName": "Amina", "lastName": "Hassan"},
             "recipient": "me", "content": "Can you start Monday?",
             "createdAt": "2024-01-01T10:00:00Z", "isRead": false},
            {"id": "2", "sender": "me", "recipient": "emp-a", "content": "Yes!",
             "createdAt": "2024-01-01T11:00:00Z", "isRead": true},
            {"id": "3", "sender": "emp-b", "recipient": "me", "senderDisplayName": "Bright Futures",
             "content": "Interview invite", "createdAt": "2024-01-01T12:00:00Z", "isRead": false},
            {"id": "4", "sender": "emp-a", "recipient": "emp-b",
             "createdAt": "2024-01-01T13:00:00Z"},
            {"id": "5", "sender": "emp-b", "recipient": "me"},
            "not a message"
        ]
    });
    std::fs::write(path, feed.to_string()).unwrap();
}

async fn run_args(args: &[&str], config: InboxConfig) -> anyhow::Result<String> {
    let mut argv = vec!["haven-inbox"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    run(cli, config, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_group_prints_conversations_json() {
    let scratch = Scratch::new();
    let feed = scratch.path("feed.json");
    write_feed(&feed);

    let out = run_args(
        &["group", "--user", "me", "--input", feed.to_str().unwrap()],
        InboxConfig::default(),
    )
    .await
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    let conversations = value.as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0]["counterpartId"], "emp-b");
    assert_eq!(conversations[0]["counterpartName"], "Bright Futures");
    assert_eq!(conversations[1]["counterpartName"], "Amina Hassan");
    assert_eq!(conversations[1]["unreadCount"], 1);
    assert_eq!(conversations[1]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_group_requires_a_user() {
    let scratch = Scratch::new();
    let feed = scratch.path("feed.json");
    write_feed(&feed);

    let err = run_args(&["group", "--input", feed.to_str().unwrap()], InboxConfig::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No current user"));

    let err = run_args(
        &["group", "--user", "  ", "--input", feed.to_str().unwrap()],
        InboxConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Invalid --user"));
}

#[tokio::test]
async fn test_import_then_inbox_and_mark_read() {
    let scratch = Scratch::new();
    let feed = scratch.path("feed.json");
    write_feed(&feed);
    let db = scratch.path("inbox.db");
    let db = db.to_str().unwrap();

    let config = InboxConfig {
        user: Some(UserId::parse("me").unwrap()),
        ..InboxConfig::default()
    };

    let out = run_args(&["import", "--db", db, "--input", feed.to_str().unwrap()], config.clone())
        .await
        .unwrap();
    assert_eq!(
        out.trim(),
        "Imported 4 message(s); 0 already present, 1 malformed, 1 undecodable"
    );

    let out = run_args(&["inbox", "--db", db], config.clone()).await.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "2 conversation(s), 2 unread");
    assert!(lines[1].starts_with("Bright Futures"));
    assert!(lines[2].starts_with("Amina Hassan"));

    let out = run_args(&["mark-read", "--db", db, "--with", "emp-b"], config.clone())
        .await
        .unwrap();
    assert_eq!(out.trim(), "Marked 1 message(s) read (0 failed)");

    let out = run_args(&["inbox", "--db", db], config).await.unwrap();
    assert!(out.starts_with("2 conversation(s), 1 unread"));
}

#[tokio::test]
async fn test_add_user_and_send() {
    let scratch = Scratch::new();
    let db = scratch.path("inbox.db");
    let db = db.to_str().unwrap();
    let config = InboxConfig::default();

    let out = run_args(
        &["add-user", "--db", db, "--id", "talent-1", "--first-name", "Amina", "--last-name", "Hassan"],
        config.clone(),
    )
    .await
    .unwrap();
    assert_eq!(out.trim(), "Saved Amina Hassan (talent-1)");

    let out = run_args(
        &["send", "--db", db, "--user", "emp-a", "--to", "talent-1", "--content", "Welcome aboard"],
        config.clone(),
    )
    .await
    .unwrap();
    assert!(out.starts_with("Sent "));
    assert!(out.trim().ends_with("to talent-1"));

    let out = run_args(&["inbox", "--db", db, "--user", "emp-a"], config.clone())
        .await
        .unwrap();
    assert!(out.contains("Amina Hassan"));
    assert!(out.contains("Welcome aboard"));

    let err = run_args(
        &["send", "--db", db, "--user", "emp-a", "--to", "emp-a", "--content", "hi"],
        config,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("yourself"));
}

#[tokio::test]
async fn test_watch_prints_until_shutdown() {
    let scratch = Scratch::new();
    let feed = scratch.path("feed.json");
    write_feed(&feed);
    let db = scratch.path("inbox.db");

    let store = SqliteStore::open(&db).unwrap();
    let batch = haven_inbox::parse_message_batch(&std::fs::read_to_string(&feed).unwrap()).unwrap();
    store.import(&batch.messages).unwrap();

    let mut out = Vec::new();
    commands::watch(
        store,
        UserId::parse("me").unwrap(),
        Duration::from_secs(30),
        &mut out,
        tokio::time::sleep(Duration::from_millis(300)),
    )
    .await
    .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("2 conversation(s), 2 unread"));
    // Nothing changed after the first poll, so the summary printed once
    assert_eq!(text.matches("conversation(s)").count(), 1);
}

#[tokio::test]
async fn test_watch_on_empty_store_prints_placeholder() {
    let mut out = Vec::new();
    commands::watch(
        SqliteStore::open_in_memory().unwrap(),
        UserId::parse("me").unwrap(),
        Duration::from_secs(30),
        &mut out,
        tokio::time::sleep(Duration::from_millis(300)),
    )
    .await
    .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "No conversations yet\n");
}

#[tokio::test]
async fn test_watch_rejects_zero_period() {
    let scratch = Scratch::new();
    let db = scratch.path("inbox.db");
    let err = run_args(
        &["watch", "--db", db.to_str().unwrap(), "--user", "me", "--poll-secs", "0"],
        InboxConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("greater than 0"));
}
