//! Scenario: a target that ignores SIGTERM is killed after the grace window
//!
//! The proxy still exits 0.

use e2e_tests::{banner_pids, get_proxy_path, process_alive, proxy_args, ProxyProcess};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_forced_shutdown() {
    println!("\n========================================");
    println!("TEST: Forced Shutdown");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let args = proxy_args(
        &dir.path().join("main.js"),
        &["--no-watch", "--grace-timeout-ms", "500"],
        &["--banner".to_string(), "--ignore-sigterm".to_string()],
    );

    let mut proxy = ProxyProcess::new(dir.path());
    proxy.start(&get_proxy_path(), &args, &[]).unwrap();

    // Step 1: Wait for the target to be running
    println!("Step 1: Waiting for target to be running...");
    let stdout = proxy
        .wait_for_stdout("started pid=", Duration::from_secs(10))
        .unwrap();
    let pid = banner_pids(&stdout)[0];
    println!("✓ Target running with PID {}\n", pid);

    // Step 2: Shut down
    println!("Step 2: Sending SIGTERM to proxy...");
    let started = Instant::now();
    let code = proxy.shutdown(Duration::from_secs(15)).unwrap();
    let elapsed = started.elapsed();
    println!("✓ Proxy exited with {:?} after {:?}\n", code, elapsed);

    // Step 3: Verify
    println!("Step 3: Verifying forced kill...");
    assert_eq!(code, Some(0));
    assert!(elapsed >= Duration::from_millis(500));
    assert!(proxy.has_log_matching("Force killing target process"));
    assert!(!process_alive(pid), "target {} survived shutdown", pid);
    println!("✓ Target killed after grace window\n");

    println!("========================================");
    println!("✓ TEST PASSED: Forced Shutdown");
    println!("========================================\n");
}
