//! Scenario: SIGTERM to the proxy stops a cooperative target
//!
//! The target exits on SIGTERM, the proxy exits 0 without SIGKILL and no
//! child process survives.

use e2e_tests::{banner_pids, get_proxy_path, process_alive, proxy_args, ProxyProcess};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_graceful_shutdown() {
    println!("\n========================================");
    println!("TEST: Graceful Shutdown");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let args = proxy_args(
        &dir.path().join("main.js"),
        &["--no-watch"],
        &["--banner".to_string()],
    );

    let mut proxy = ProxyProcess::new(dir.path());
    proxy.start(&get_proxy_path(), &args, &[]).unwrap();

    // Step 1: Wait for the target to be running
    println!("Step 1: Waiting for target to be running...");
    let stdout = proxy
        .wait_for_stdout("started pid=", Duration::from_secs(10))
        .unwrap();
    let pid = banner_pids(&stdout)[0];
    assert!(process_alive(pid));
    println!("✓ Target running with PID {}\n", pid);

    // Step 2: Shut down
    println!("Step 2: Sending SIGTERM to proxy...");
    let started = Instant::now();
    let code = proxy.shutdown(Duration::from_secs(15)).unwrap();
    println!("✓ Proxy exited with {:?} after {:?}\n", code, started.elapsed());

    // Step 3: Verify
    println!("Step 3: Verifying clean shutdown...");
    assert_eq!(code, Some(0));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(proxy.has_log_matching("Shutting down proxy"));
    assert!(!proxy.has_log_matching("Force killing target process"));
    assert!(!process_alive(pid), "target {} survived shutdown", pid);
    println!("✓ Target stopped without SIGKILL\n");

    println!("========================================");
    println!("✓ TEST PASSED: Graceful Shutdown");
    println!("========================================\n");
}
