//! Scenario: MCP_DEVKIT_PATH selects the artifact
//!
//! Without --artifact-path, the environment override is passed to the
//! target command and reported in the startup log.

use e2e_tests::{get_proxy_path, get_testexe_path, ProxyProcess};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_artifact_path_env() {
    println!("\n========================================");
    println!("TEST: Artifact Path From Environment");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let artifact = dir.path().join("from-env.js");
    let args: Vec<String> = vec![
        "--command".to_string(),
        get_testexe_path().display().to_string(),
        "--no-watch".to_string(),
        "--".to_string(),
        "--banner".to_string(),
    ];

    let mut proxy = ProxyProcess::new(dir.path());
    proxy
        .start(
            &get_proxy_path(),
            &args,
            &[("MCP_DEVKIT_PATH", artifact.display().to_string())],
        )
        .unwrap();

    proxy
        .wait_for_stdout("started pid=", Duration::from_secs(10))
        .unwrap();
    proxy
        .wait_for_log("Using MCP_DEVKIT_PATH from environment", Duration::from_secs(5))
        .unwrap();
    // testexe logs its arguments on stderr, which the proxy forwards
    proxy
        .wait_for_log("from-env.js", Duration::from_secs(5))
        .unwrap();

    assert_eq!(proxy.shutdown(Duration::from_secs(15)).unwrap(), Some(0));

    println!("✓ TEST PASSED: Artifact Path From Environment\n");
}
