// E2E Test Framework for mcp-proxy

pub mod proxy;

pub use proxy::ProxyProcess;

use std::env;
use std::path::{Path, PathBuf};

/// Locate a binary built next to the test executable
fn get_binary_path(name: &str) -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    #[cfg(windows)]
    path.push(format!("{}.exe", name));

    #[cfg(not(windows))]
    path.push(name);

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }

    path
}

/// Get the path to the mcp-proxy binary
pub fn get_proxy_path() -> PathBuf {
    get_binary_path("mcp-proxy")
}

/// Get the path to the TESTEXE (testexe) binary
pub fn get_testexe_path() -> PathBuf {
    get_binary_path("testexe")
}

/// Proxy arguments that run testexe as the target with `artifact` as its
/// artifact path. `testexe_args` are passed through after `--`.
pub fn proxy_args(artifact: &Path, proxy_flags: &[&str], testexe_args: &[String]) -> Vec<String> {
    let mut args = vec![
        "--command".to_string(),
        get_testexe_path().display().to_string(),
        "--artifact-path".to_string(),
        artifact.display().to_string(),
    ];
    args.extend(proxy_flags.iter().map(|s| s.to_string()));
    if !testexe_args.is_empty() {
        args.push("--".to_string());
        args.extend(testexe_args.iter().cloned());
    }
    args
}

/// Non-empty lines of a file, or none if it does not exist
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| {
            content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the pid from the "started pid=<pid>" banners on stdout
pub fn banner_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("started pid="))
        .filter_map(|pid| pid.trim().parse().ok())
        .collect()
}

/// True while a process with `pid` exists
pub fn process_alive(pid: u32) -> bool {
    proxy_process::process_exists(pid).unwrap_or(false)
}
