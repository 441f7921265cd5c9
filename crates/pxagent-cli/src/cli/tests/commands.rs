//! Tests for status, add, get and stop.

use super::parse;
use crate::cli::commands::{run_add, run_get, run_stop};
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use pxagent_core::commands::{AgentCommand, CommandLog};
use pxagent_core::control::{ProcessMarkers, PID_FILE, STOP_FILE};

#[test]
fn cli_parse_status() {
    match parse(&["pxagent", "status"]) {
        CliCommand::Status => {}
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_add() {
    match parse(&["pxagent", "add", "PXD000001"]) {
        CliCommand::Add { dataset_id } => assert_eq!(dataset_id, "PXD000001"),
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_get() {
    match parse(&["pxagent", "get", "https://example.org/x.tar.gz"]) {
        CliCommand::Get { url } => assert_eq!(url, "https://example.org/x.tar.gz"),
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_stop() {
    match parse(&["pxagent", "stop"]) {
        CliCommand::Stop => {}
        _ => panic!("expected Stop"),
    }
}

#[test]
fn cli_add_requires_id() {
    assert!(Cli::try_parse_from(["pxagent", "add"]).is_err());
}

#[test]
fn add_and_get_append_to_the_command_log() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().join("agent");
    run_add(&home, "PXD000001").unwrap();
    run_get(&home, "https://example.org/x.tar.gz").unwrap();

    let mut log = CommandLog::open(&home).unwrap();
    let commands: Vec<AgentCommand> = log
        .read_new_lines()
        .unwrap()
        .iter()
        .map(|l| l.parse().unwrap())
        .collect();
    assert_eq!(
        commands,
        vec![
            AgentCommand::AddDataset("PXD000001".into()),
            AgentCommand::Get("https://example.org/x.tar.gz".into()),
        ]
    );
}

#[test]
fn stop_only_signals_a_running_agent() {
    let home = tempfile::tempdir().unwrap();
    run_stop(home.path()).unwrap();
    assert!(!home.path().join(STOP_FILE).exists());

    let mut markers = ProcessMarkers::new(home.path());
    markers.acquire().unwrap();
    assert!(home.path().join(PID_FILE).exists());
    run_stop(home.path()).unwrap();
    assert!(markers.stop_requested());
}
