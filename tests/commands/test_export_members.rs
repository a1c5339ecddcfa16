//! Tests for the export_members command

use std::fs;

use chrono::{Local, TimeZone};
use tempfile::tempdir;
use tg_member_export::commands::export_members;
use tg_member_export::{Error, OutputSink, ScriptedPrompt};

use crate::{config_with, member, FakeClient};

fn sink_in(root: &std::path::Path) -> OutputSink {
    let started_at = Local.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap();
    OutputSink::create(root, started_at).expect("run directory")
}

fn csv_files(sink: &OutputSink) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(sink.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_end_to_end_exports_only_listed_group_sorted_by_id() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["Team A"]);

    let mut client = FakeClient::authorized()
        .with_dialog("Team A", true)
        .with_dialog("Team B", true)
        .with_dialog("DM", false)
        .with_members(
            "Team A",
            vec![
                member(5, Some("eve"), "Eve", Some("Adams")),
                member(2, None, "Bob", None),
            ],
        )
        .with_members("Team B", vec![member(7, None, "Zed", None)]);
    let mut prompt = ScriptedPrompt::new("unused");

    let summary = export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    assert_eq!(csv_files(&sink), vec!["Team A.csv".to_string()]);
    assert_eq!(summary.exported, vec![sink.dir().join("Team A.csv")]);
    assert_eq!(summary.skipped_not_group, 1);
    assert_eq!(summary.skipped_not_listed, 1);

    let content = fs::read_to_string(sink.dir().join("Team A.csv")).unwrap();
    assert_eq!(
        content,
        "id,username,first_name,last_name\n2,,Bob,\n5,eve,Eve,Adams\n"
    );

    // Participants are only fetched for the exported group
    assert!(client
        .calls
        .iter()
        .all(|c| !c.starts_with("list_participants:") || c == "list_participants:Team A"));
    assert_eq!(prompt.code_calls, 0);
}

#[tokio::test]
async fn test_group_name_is_sanitized_into_file_name() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["My/Team:1"]);

    let mut client = FakeClient::authorized()
        .with_dialog("My/Team:1", true)
        .with_members("My/Team:1", vec![member(1, Some("a"), "A", None)]);
    let mut prompt = ScriptedPrompt::new("unused");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    assert_eq!(csv_files(&sink), vec!["MyTeam1.csv".to_string()]);
}

#[tokio::test]
async fn test_rows_are_in_non_decreasing_id_order() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["big"]);

    let ids = [42, 7, 99, 7, 1, 300, 15];
    let members = ids
        .iter()
        .map(|id| member(*id, None, &format!("user{}", id), None))
        .collect();
    let mut client = FakeClient::authorized()
        .with_dialog("big", true)
        .with_members("big", members);
    let mut prompt = ScriptedPrompt::new("unused");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    let content = fs::read_to_string(sink.dir().join("big.csv")).unwrap();
    let exported: Vec<i64> = content
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap().parse().unwrap())
        .collect();

    assert_eq!(exported.len(), ids.len());
    assert!(exported.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_login_with_code() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &[]);

    let mut client = FakeClient::needs_login("11111");
    let mut prompt = ScriptedPrompt::new("11111");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    assert_eq!(
        client.calls,
        vec![
            "connect".to_string(),
            "is_authorized".to_string(),
            "send_code_request:+15550001111".to_string(),
            "sign_in:11111".to_string(),
            "list_dialogs".to_string(),
        ]
    );
    assert_eq!(prompt.code_calls, 1);
    assert_eq!(prompt.password_calls, 0);
}

#[tokio::test]
async fn test_login_with_second_factor_password() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &[]);

    let mut client = FakeClient::needs_login("11111").with_password("s3cret");
    let mut prompt = ScriptedPrompt::new("11111").with_password("s3cret");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    assert!(client.authorized);
    assert!(client.calls.contains(&"sign_in_password".to_string()));
    assert_eq!(prompt.password_calls, 1);
}

#[tokio::test]
async fn test_wrong_code_is_fatal() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["Team A"]);

    let mut client = FakeClient::needs_login("11111").with_dialog("Team A", true);
    let mut prompt = ScriptedPrompt::new("99999");

    let err = export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert!(!client.calls.contains(&"list_dialogs".to_string()));
    assert!(csv_files(&sink).is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_fatal() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &[]);

    let mut client = FakeClient::needs_login("11111").with_password("s3cret");
    let mut prompt = ScriptedPrompt::new("11111").with_password("guess");

    let err = export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_direct_connection_without_proxy() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[("PROXY_HOST", "proxy.example.org")], &[]);

    let mut client = FakeClient::authorized();
    let mut prompt = ScriptedPrompt::new("unused");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();
    assert!(client.proxy_used.is_none());
}

#[tokio::test]
async fn test_proxy_used_when_fully_configured() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(
        &[
            ("PROXY_HOST", "proxy.example.org"),
            ("PROXY_PORT", "8443"),
            ("PROXY_SECRET", "ee1234"),
        ],
        &[],
    );

    let mut client = FakeClient::authorized();
    let mut prompt = ScriptedPrompt::new("unused");

    export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    let proxy = client.proxy_used.expect("proxy should be used");
    assert_eq!(proxy.host, "proxy.example.org");
    assert_eq!(proxy.port, 8443);
    assert_eq!(proxy.secret, "ee1234");
}

#[tokio::test]
async fn test_transport_error_stops_run() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["Team A"]);

    let mut client = FakeClient::authorized().with_dialog("Team A", true);
    client.connect_error = Some("network unreachable".into());
    let mut prompt = ScriptedPrompt::new("unused");

    let err = export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(client.calls, vec!["connect".to_string()]);
}

#[tokio::test]
async fn test_no_listed_group_exports_nothing() {
    let root = tempdir().unwrap();
    let sink = sink_in(root.path());
    let config = config_with(&[], &["Team A"]);

    let mut client = FakeClient::authorized()
        .with_dialog("Team B", true)
        .with_dialog("DM", false);
    let mut prompt = ScriptedPrompt::new("unused");

    let summary = export_members::run(&mut client, &mut prompt, &config, &sink)
        .await
        .unwrap();

    assert!(summary.nothing_exported());
    assert!(csv_files(&sink).is_empty());
}
