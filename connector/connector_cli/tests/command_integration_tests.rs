use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const POLICY: &str = r#"{
    "uid": "policy-eu",
    "permissions": [{
        "uid": "perm-use",
        "action": {"type": "use"},
        "constraints": [{
            "@type": "AtomicConstraint",
            "leftExpression": {"@type": "LiteralExpression", "value": "region"},
            "operator": "EQ",
            "rightExpression": {"@type": "LiteralExpression", "value": "EU"}
        }],
        "duties": [{
            "uid": "duty-notify",
            "action": {"type": "notify"},
            "consequence": {"uid": "duty-compensate", "action": {"type": "compensate"}}
        }]
    }],
    "prohibitions": [{"uid": "no-distribute", "action": {"type": "distribute"}}]
}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

fn connector() -> Command {
    let mut cmd = Command::cargo_bin("connector").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_evaluate_permits() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let context = write(
        &dir,
        "context.json",
        r#"{"participant": "did:web:consumer", "facts": {"region": "EU"}}"#,
    );

    connector()
        .args(["evaluate", "--scope", "contract.negotiation", "--action", "use"])
        .arg("--policy")
        .arg(&policy)
        .arg("--context")
        .arg(&context)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"decision\": \"Permit\""));
}

#[test]
fn test_evaluate_denied_exit_code() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let context = write(&dir, "context.json", r#"{"facts": {"region": "US"}}"#);

    let output = connector()
        .args(["evaluate", "--scope", "catalog", "--action", "use"])
        .arg("--policy")
        .arg(&policy)
        .arg("--context")
        .arg(&context)
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["decision"], "Deny");
    assert_eq!(result["violations"][0]["rule_uid"], "perm-use");
}

#[test]
fn test_evaluate_prohibited_action() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);

    connector()
        .args(["evaluate", "--scope", "catalog", "--action", "distribute"])
        .arg("--policy")
        .arg(&policy)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("prohibition_applies"));
}

#[test]
fn test_evaluate_with_configured_operands() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);
    let context = write(&dir, "context.json", r#"{"facts": {"region": "EU"}}"#);
    let config = write(
        &dir,
        "engine.toml",
        "duty_enforcement = \"blocking\"\nfact_operands = [\"purpose\"]\n",
    );

    connector()
        .args(["evaluate", "--scope", "catalog"])
        .arg("--policy")
        .arg(&policy)
        .arg("--context")
        .arg(&context)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unknown_left_operand"));
}

#[test]
fn test_evaluate_rejects_blank_scope() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);

    connector()
        .args(["evaluate", "--scope", " "])
        .arg("--policy")
        .arg(&policy)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid evaluation scope"));
}

#[test]
fn test_validate_prints_uid() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);

    connector()
        .arg("validate")
        .arg("--policy")
        .arg(&policy)
        .assert()
        .success()
        .stdout(predicate::str::diff("policy-eu\n"));
}

#[test]
fn test_validate_rejects_malformed_policy() {
    let dir = TempDir::new().unwrap();
    let policy = write(
        &dir,
        "policy.json",
        r#"{"permissions": [{"action": {"type": ""}}]}"#,
    );

    connector()
        .arg("validate")
        .arg("--policy")
        .arg(&policy)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed policy"));
}

#[test]
fn test_bind_target() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.json", POLICY);

    let output = connector()
        .args(["bind-target", "--target", "asset-42"])
        .arg("--policy")
        .arg(&policy)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let bound: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(bound["target"], "asset-42");
    assert_eq!(bound["permissions"][0]["target"], "asset-42");
    assert_eq!(bound["permissions"][0]["duties"][0]["target"], "asset-42");
    assert_eq!(
        bound["permissions"][0]["duties"][0]["consequence"]["target"],
        "asset-42"
    );
    assert_eq!(bound["prohibitions"][0]["target"], "asset-42");
    assert_eq!(bound["uid"], "policy-eu");
}

#[test]
fn test_types() {
    connector()
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("XoneConstraint"))
        .stdout(predicate::str::contains("PolicyType"));
}
