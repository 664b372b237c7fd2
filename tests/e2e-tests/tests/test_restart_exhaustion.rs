//! Scenario: crash restarts are bounded
//!
//! A target that exits with code 1 right away is spawned max_attempts + 1
//! times, then the proxy itself exits with code 1.

use e2e_tests::{get_proxy_path, proxy_args, read_lines, ProxyProcess};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_restart_exhaustion() {
    println!("\n========================================");
    println!("TEST: Restart Exhaustion");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let spawn_log = dir.path().join("spawns.log");

    let args = proxy_args(
        &dir.path().join("main.js"),
        &["--no-watch", "--max-restart-attempts", "2", "--restart-delay-ms", "100"],
        &[
            "--exit-code".to_string(),
            "1".to_string(),
            "--run-duration-ms".to_string(),
            "10".to_string(),
            "--spawn-log".to_string(),
            spawn_log.display().to_string(),
        ],
    );

    // Step 1: Start the proxy and let it give up
    println!("Step 1: Starting proxy with a crashing target...");
    let started = Instant::now();
    let mut proxy = ProxyProcess::new(dir.path());
    proxy.start(&get_proxy_path(), &args, &[]).unwrap();

    let code = proxy.wait_for_exit(Duration::from_secs(20)).unwrap();
    println!("✓ Proxy exited with {:?} after {:?}\n", code, started.elapsed());

    // Step 2: Verify exit code and spawn count
    println!("Step 2: Verifying spawn count...");
    assert_eq!(code, Some(1));
    assert_eq!(read_lines(&spawn_log).len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(proxy.has_log_matching("Max restart attempts (2) reached"));
    assert!(proxy.has_log_matching("Scheduling restart in 100ms (attempt 2/2)"));
    println!("✓ Spawned 3 times, then gave up\n");

    println!("========================================");
    println!("✓ TEST PASSED: Restart Exhaustion");
    println!("========================================\n");
}

#[test]
fn test_missing_command_exhausts() {
    println!("\n========================================");
    println!("TEST: Missing Command");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let args: Vec<String> = [
        "--command",
        "/nonexistent/target-runtime",
        "--no-watch",
        "--max-restart-attempts",
        "1",
        "--restart-delay-ms",
        "50",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut proxy = ProxyProcess::new(dir.path());
    proxy.start(&get_proxy_path(), &args, &[]).unwrap();

    let code = proxy.wait_for_exit(Duration::from_secs(20)).unwrap();
    assert_eq!(code, Some(1));
    assert!(proxy.has_log_matching("Failed to start target process"));

    println!("✓ TEST PASSED: Missing Command\n");
}
