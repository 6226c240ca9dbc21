// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the `sentinel-server` stdio binary: one
//! newline-delimited JSON-RPC request per line in, one response line out.

use assert_cmd::Command;
use serde_json::{json, Value};

fn sentinel_server() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("sentinel-server").expect("binary `sentinel-server` should be built")
}

/// Feed `requests` (one JSON value per line) to the binary and parse its
/// stdout back into one [`Value`] per response line.
fn run(requests: &[Value]) -> Vec<Value> {
    let mut stdin = String::new();
    for request in requests {
        stdin.push_str(&request.to_string());
        stdin.push('\n');
    }

    let output = sentinel_server()
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    String::from_utf8(output)
        .expect("stdout is valid utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).unwrap_or_else(|e| panic!("line `{line}` is not valid JSON: {e}")))
        .collect()
}

#[test]
fn unregistered_tool_call_is_allowed() {
    let responses = run(&[json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {
            "tool_name": "list_files",
            "tool_args": {"path": "/tmp"},
            "prompt": "list the files in /tmp",
            "response": "found 3 files in /tmp: a.txt, b.txt, c.txt",
            "numeric_samples": [],
        },
    })]);

    assert_eq!(responses.len(), 1);
    let result = &responses[0]["result"];
    assert_eq!(result["decision"], "allow");
    assert!(result["token"].is_null(), "unregistered tools don't require a token");
}

#[test]
fn propose_then_commit_round_trips_over_stdio() {
    // Each process run gets its own fresh in-memory proposal store, so the
    // propose and the commit that references it must ride the same stdin
    // stream.
    let propose = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/propose",
        "params": {
            "tool_name": "send_email",
            "tool_args": {"to": "a@example.com"},
            "prompt": "send a friendly reminder email",
        },
    });

    let mut stdin = String::new();
    stdin.push_str(&propose.to_string());
    stdin.push('\n');

    let output = sentinel_server()
        .write_stdin(stdin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let propose_response: Value = String::from_utf8(output)
        .unwrap()
        .lines()
        .next()
        .map(|line| serde_json::from_str(line).unwrap())
        .unwrap();
    let propose_result = &propose_response["result"];
    assert_eq!(propose_result["outcome"], "ready_to_commit");

    let commit = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/commit",
        "params": {
            "proposal_id": propose_result["proposal_id"],
            "token": propose_result["commit_token"]["token"],
            "tool_name": "send_email",
            "tool_args": {"to": "a@example.com"},
        },
    });

    let responses = run(&[propose, commit]);
    let commit_result = &responses[1]["result"];
    assert_eq!(commit_result["ok"], true);
    assert_eq!(commit_result["reason"], "ok");
}

#[test]
fn unknown_method_produces_jsonrpc_error() {
    let responses = run(&[json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/frobnicate",
        "params": {},
    })]);

    assert_eq!(responses[0]["id"], 7);
    assert_eq!(responses[0]["error"]["code"], -32601);
}

#[test]
fn malformed_line_yields_null_id_error_without_crashing_the_loop() {
    let mut cmd = sentinel_server();
    let stdin = format!(
        "not json at all\n{}\n",
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "tool_name": "list_files",
                "tool_args": {},
                "prompt": "p",
                "response": "r",
            },
        })
    );
    let output = cmd.write_stdin(stdin).assert().success().get_output().stdout.clone();
    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0]["id"].is_null());
    assert_eq!(lines[0]["error"]["code"], -32602);
    assert_eq!(lines[1]["result"]["decision"], "allow");
}

#[test]
fn blank_lines_are_skipped() {
    let responses = run(&[]);
    assert!(responses.is_empty());
}
