//! mcp-proxy wrapper for E2E testing

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Wrapper for running the proxy binary during tests.
///
/// stderr (proxy logs plus the child's stderr) goes to `proxy.log` in the
/// test directory; stdout is captured in memory so tests can check the
/// pass-through stays clean.
pub struct ProxyProcess {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Arc<Mutex<Vec<u8>>>,
    log_output: Vec<String>,
    pub test_dir: PathBuf,
    log_file_path: PathBuf,
}

impl ProxyProcess {
    pub fn new(test_dir: &Path) -> Self {
        Self {
            process: None,
            stdin: None,
            stdout: Arc::new(Mutex::new(Vec::new())),
            log_output: Vec::new(),
            test_dir: test_dir.to_path_buf(),
            log_file_path: test_dir.join("proxy.log"),
        }
    }

    /// Start the proxy with `args`, plus extra environment variables.
    pub fn start(
        &mut self,
        proxy_path: &Path,
        args: &[String],
        envs: &[(&str, String)],
    ) -> Result<(), String> {
        if self.process.is_some() {
            return Err("Proxy is already running".to_string());
        }

        println!("Starting proxy: {} {}", proxy_path.display(), args.join(" "));
        println!("Working dir: {}", self.test_dir.display());

        let log_file = fs::File::create(&self.log_file_path)
            .map_err(|e| format!("Failed to create log file: {}", e))?;

        let mut cmd = Command::new(proxy_path);
        cmd.args(args)
            .current_dir(&self.test_dir)
            .env_remove("MCP_DEVKIT_PATH")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log_file));
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to spawn proxy: {}", e))?;

        self.stdin = child.stdin.take();
        if let Some(mut stdout) = child.stdout.take() {
            let buffer = Arc::clone(&self.stdout);
            thread::spawn(move || {
                let mut chunk = [0u8; 4096];
                while let Ok(n) = stdout.read(&mut chunk) {
                    if n == 0 {
                        break;
                    }
                    buffer.lock().unwrap().extend_from_slice(&chunk[..n]);
                }
            });
        }

        println!("Proxy started with PID: {}", child.id());
        self.process = Some(child);
        Ok(())
    }

    pub fn get_pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.id())
    }

    /// Everything the proxy wrote to stdout so far
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.lock().unwrap()).into_owned()
    }

    pub fn write_stdin(&mut self, data: &str) -> Result<(), String> {
        let stdin = self.stdin.as_mut().ok_or("Proxy stdin is closed")?;
        stdin
            .write_all(data.as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(|e| format!("Failed to write to proxy stdin: {}", e))
    }

    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    /// Wait until stdout contains `pattern`
    pub fn wait_for_stdout(&self, pattern: &str, timeout: Duration) -> Result<String, String> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            let stdout = self.stdout();
            if stdout.contains(pattern) {
                return Ok(stdout);
            }
            thread::sleep(Duration::from_millis(50));
        }
        Err(format!(
            "'{}' did not appear on stdout within {:?}, got: {:?}",
            pattern,
            timeout,
            self.stdout()
        ))
    }

    /// Wait until the log contains a line with `pattern`
    pub fn wait_for_log(&mut self, pattern: &str, timeout: Duration) -> Result<(), String> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            self.collect_logs();
            if self.has_log_matching(pattern) {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(100));
        }
        Err(format!("Log line '{}' did not appear within {:?}", pattern, timeout))
    }

    /// Send SIGTERM and wait for the proxy to exit. Returns the exit code.
    pub fn shutdown(&mut self, timeout: Duration) -> Result<Option<i32>, String> {
        let Some(child) = self.process.as_mut() else {
            return Err("Proxy is not running".to_string());
        };

        println!("Sending termination signal to proxy...");

        #[cfg(unix)]
        {
            nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(child.id() as i32),
                nix::sys::signal::Signal::SIGTERM,
            )
            .map_err(|e| format!("Failed to send SIGTERM: {}", e))?;
        }

        #[cfg(windows)]
        {
            // No console signal to send from here, just kill it
            child.kill().map_err(|e| format!("Failed to kill proxy: {}", e))?;
        }

        self.wait_for_exit(timeout)
    }

    /// Wait for the proxy to exit on its own. Returns the exit code.
    pub fn wait_for_exit(&mut self, timeout: Duration) -> Result<Option<i32>, String> {
        let Some(mut child) = self.process.take() else {
            return Err("Proxy is not running".to_string());
        };

        let result = match child.wait_timeout(timeout) {
            Ok(Some(status)) => {
                println!("Proxy exited with status: {}", status);
                Ok(status.code())
            }
            Ok(None) => {
                println!("Proxy did not exit in time, forcing kill");
                child.kill().ok();
                child.wait().ok();
                Err(format!("Proxy did not exit within {:?}", timeout))
            }
            Err(e) => Err(format!("Error waiting for proxy: {}", e)),
        };

        // Let the stdout reader see EOF
        thread::sleep(Duration::from_millis(100));
        self.collect_logs();
        result
    }

    fn collect_logs(&mut self) {
        if let Ok(content) = fs::read_to_string(&self.log_file_path) {
            let new_lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();

            for line in new_lines.iter().skip(self.log_output.len()) {
                println!("[PROXY] {}", line);
            }

            self.log_output = new_lines;
        }
    }

    pub fn get_logs(&self) -> &[String] {
        &self.log_output
    }

    pub fn has_log_matching(&self, pattern: &str) -> bool {
        self.log_output.iter().any(|line| line.contains(pattern))
    }
}

impl Drop for ProxyProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            println!("Cleaning up proxy in Drop");
            child.kill().ok();
            child.wait().ok();
        }
    }
}
