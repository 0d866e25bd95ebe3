use serde_json::Value;
use serial_test::serial;
use std::{
    io::Write,
    process::{Command, Stdio}
};

const BINARY: &str = env!("CARGO_BIN_EXE_kz-points");

const EXAMPLE_RUN: &str = r#"{ "time": 8.609375, "nub_data": { "tier": 1, "wr": 7.6484375, "leaderboard_size": 224, "dist_params": { "a": 33.53900289787477, "b": 33.52140111667502, "loc": 6.3663207368487065, "scale": 0.4480388195262859, "top_scale": 0.9979285278452101 } }, "pro_data": { "tier": 1, "wr": 7.6484375, "leaderboard_size": 165, "dist_params": { "a": 2.6294814553333743, "b": 2.511121972118702, "loc": 8.713014153227697, "scale": 2.2226724397990805, "top_scale": 0.9952929135343108 }}}"#;

/// JSON records in a stream that may also carry log lines
fn records(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).expect("record should be valid JSON"))
        .collect()
}

/// Test that the application exits with error code when database connection fails
#[test]
#[serial]
fn test_application_exits_on_connection_failure() {
    let output = Command::new(BINARY)
        .args(["--log-level", "error", "filter"])
        .env(
            "DATABASE_URL",
            "host=invalid_host port=5432 user=postgres password=wrong dbname=nonexistent"
        )
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute processor");

    assert!(!output.status.success(), "Process should fail with invalid connection");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to connect to database"),
        "Expected connection failure message in stderr, got: {}",
        stderr
    );
}

#[test]
#[serial]
fn test_run_mode_stream() {
    let mut child = Command::new(BINARY)
        .args(["--log-level", "error", "run"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start processor");

    let input = format!(
        "{{\"time\": \"x\"}}\n{}\n{{\"time\": 5.0, \"nub_data\": {{\"tier\": 3, \"wr\": 5.0, \"leaderboard_size\": 10}}}}\n",
        EXAMPLE_RUN
    );
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input.as_bytes())
        .expect("Failed to write requests");

    let output = child.wait_with_output().expect("Failed to wait for processor");
    assert!(output.status.success());

    let responses = records(&output.stdout);
    assert_eq!(responses.len(), 2);
    assert!((responses[0]["nub_fraction"].as_f64().unwrap() - 0.9745534941686896).abs() < 1e-7);
    assert!((responses[0]["pro_fraction"].as_f64().unwrap() - 0.9760910013054752).abs() < 1e-7);
    assert!(responses[1]["pro_fraction"].is_null());

    let errors = records(&output.stderr);
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["error"].as_str().unwrap().starts_with("Invalid JSON input: "));
}
