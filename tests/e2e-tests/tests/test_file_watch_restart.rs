//! Scenario: a rebuilt artifact restarts the target
//!
//! With a zero crash budget, a change to a watched .js file still restarts
//! the target, because file-triggered restarts are not counted.

use e2e_tests::{banner_pids, get_proxy_path, proxy_args, read_lines, ProxyProcess};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_file_watch_restart() {
    println!("\n========================================");
    println!("TEST: File Watch Restart");
    println!("========================================\n");

    let dir = TempDir::new().unwrap();
    let artifact = dir.path().join("main.js");
    std::fs::write(&artifact, "// v1\n").unwrap();
    let spawn_log = dir.path().join("spawns.log");

    let args = proxy_args(
        &artifact,
        &["--max-restart-attempts", "0"],
        &[
            "--banner".to_string(),
            "--spawn-log".to_string(),
            spawn_log.display().to_string(),
        ],
    );

    let mut proxy = ProxyProcess::new(dir.path());
    proxy.start(&get_proxy_path(), &args, &[]).unwrap();

    // Step 1: Wait for the first target and the watcher
    println!("Step 1: Waiting for target and watcher...");
    proxy
        .wait_for_stdout("started pid=", Duration::from_secs(10))
        .unwrap();
    proxy
        .wait_for_log("for changes", Duration::from_secs(10))
        .unwrap();
    println!("✓ Target running, watcher active\n");

    // Step 2: Rebuild the artifact
    println!("Step 2: Rewriting main.js...");
    std::fs::write(&artifact, "// v2\n").unwrap();

    let start = Instant::now();
    while read_lines(&spawn_log).len() < 2 && start.elapsed() < Duration::from_secs(15) {
        thread::sleep(Duration::from_millis(100));
    }
    let stdout = proxy
        .wait_for_stdout("started pid=", Duration::from_secs(1))
        .unwrap();
    println!("✓ Spawn log: {:?}\n", read_lines(&spawn_log));

    // Step 3: Verify exactly one restart and a clean exit
    println!("Step 3: Verifying restart...");
    thread::sleep(Duration::from_millis(500));
    assert_eq!(read_lines(&spawn_log).len(), 2);
    assert!(banner_pids(&stdout).len() <= 2);
    assert_eq!(proxy.shutdown(Duration::from_secs(15)).unwrap(), Some(0));
    assert!(proxy.has_log_matching("File change detected"));
    assert!(!proxy.has_log_matching("Max restart attempts"));
    println!("✓ Restarted once without using the crash budget\n");

    println!("========================================");
    println!("✓ TEST PASSED: File Watch Restart");
    println!("========================================\n");
}
