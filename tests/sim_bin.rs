use std::process::Command;

#[test]
fn sim_binary_smoke() {
    let output = Command::new(env!("CARGO_BIN_EXE_sim"))
        .args(["1", "2", "300"])
        .output()
        .expect("failed to run sim binary");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("non utf8 output");
    let v: serde_json::Value = serde_json::from_str(stdout.trim()).expect("invalid json");
    assert_eq!(v["player1"]["frames"], 300);
    assert_eq!(v["player2"]["frames"], 300);
    assert!(v["player1"]["phase"].is_string());
    assert!(v.get("leader").is_some());
}

#[test]
fn sim_binary_rejects_missing_seeds() {
    let output = Command::new(env!("CARGO_BIN_EXE_sim"))
        .arg("1")
        .output()
        .expect("failed to run sim binary");
    assert!(!output.status.success());
}
