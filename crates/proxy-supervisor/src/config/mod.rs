use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod validation;

/// Artifact launched when neither the config nor the environment names one
pub const DEFAULT_ARTIFACT_PATH: &str = "dist/apps/mcp-devkit/main.js";

/// Environment variable that overrides the artifact path
pub const DEFAULT_ARTIFACT_PATH_ENV: &str = "MCP_DEVKIT_PATH";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub restart: RestartSettings,
    #[serde(default)]
    pub shutdown: ShutdownSettings,
    #[serde(default)]
    pub watch: WatchSettings,
    #[serde(default)]
    pub stdio: StdioSettings,
}

/// What to launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_command")]
    pub command: String,

    /// Script handed to `command` as its first argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,

    #[serde(default = "default_artifact_path_env")]
    pub artifact_path_env: String,

    /// Extra arguments appended after the artifact path
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    #[serde(skip)]
    pub artifact_source: ArtifactSource,
}

/// Where the artifact path came from, for startup diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArtifactSource {
    #[default]
    Default,
    ConfigFile,
    Environment,
    CommandLine,
}

impl std::fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactSource::Default => write!(f, "default"),
            ArtifactSource::ConfigFile => write!(f, "config file"),
            ArtifactSource::Environment => write!(f, "environment"),
            ArtifactSource::CommandLine => write!(f, "command line"),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            artifact_path: None,
            artifact_path_env: default_artifact_path_env(),
            args: Vec::new(),
            working_directory: None,
            artifact_source: ArtifactSource::Default,
        }
    }
}

impl TargetConfig {
    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_PATH))
    }

    pub fn set_artifact_path(&mut self, path: impl Into<PathBuf>, source: ArtifactSource) {
        self.artifact_path = Some(path.into());
        self.artifact_source = source;
    }

    /// Arguments passed to `command`: the artifact path, then `args`.
    pub fn resolved_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.artifact_path().to_string_lossy().into_owned());
        args.extend(self.args.iter().cloned());
        args
    }

    /// Human-readable command line, for logs only.
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.clone())
            .chain(self.resolved_args())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Crash restart budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartSettings {
    #[serde(default = "default_restart_delay", with = "duration_serde")]
    pub delay: Duration,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// How long a child has to stay up before the attempt counter resets
    #[serde(default = "default_reset_after", with = "duration_serde")]
    pub reset_after: Duration,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            delay: default_restart_delay(),
            max_attempts: default_max_attempts(),
            reset_after: default_reset_after(),
        }
    }
}

/// Grace windows between SIGTERM and SIGKILL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSettings {
    #[serde(default = "default_grace_timeout", with = "duration_serde")]
    pub grace_timeout: Duration,
    #[serde(default = "default_grace_timeout", with = "duration_serde")]
    pub restart_grace_timeout: Duration,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_timeout: default_grace_timeout(),
            restart_grace_timeout: default_grace_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the directory derived from the artifact path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_debounce", with = "duration_serde")]
    pub debounce: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            extensions: default_extensions(),
            debounce: default_debounce(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StdioSettings {
    /// Start a graceful shutdown once the supervisor's stdin reaches EOF
    #[serde(default)]
    pub shutdown_on_stdin_eof: bool,
}

impl SupervisorConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let mut config: SupervisorConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        if config.target.artifact_path.is_some() {
            config.target.artifact_source = ArtifactSource::ConfigFile;
        }
        config.watch.extensions = proxy_watch::normalize_extensions(&config.watch.extensions);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Apply the artifact path override from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply the artifact path override using `lookup` to read variables.
    ///
    /// A set, non-empty variable wins over the config file and the default.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.target.artifact_path_env.is_empty() {
            return;
        }
        if let Some(value) = lookup(&self.target.artifact_path_env).filter(|v| !v.is_empty()) {
            self.target
                .set_artifact_path(value, ArtifactSource::Environment);
        }
    }

    /// Directory the file watcher observes.
    ///
    /// `watch.directory` if set, otherwise derived from the artifact path
    /// relative to the child's working directory.
    pub fn watch_directory(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Ok(self.watch_directory_from(&cwd))
    }

    /// Same as [`watch_directory`](Self::watch_directory) with an explicit process cwd.
    pub fn watch_directory_from(&self, cwd: &Path) -> PathBuf {
        let base = match &self.target.working_directory {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };

        match &self.watch.directory {
            Some(dir) => base.join(dir),
            None => proxy_watch::derive_watch_dir(&self.target.artifact_path(), &base),
        }
    }
}

fn default_command() -> String {
    "node".to_string()
}

fn default_artifact_path_env() -> String {
    DEFAULT_ARTIFACT_PATH_ENV.to_string()
}

fn default_restart_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_attempts() -> u32 {
    10
}

fn default_reset_after() -> Duration {
    Duration::from_secs(1)
}

fn default_grace_timeout() -> Duration {
    Duration::from_millis(5000)
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec![".js".to_string(), ".json".to_string()]
}

fn default_debounce() -> Duration {
    Duration::from_millis(100)
}

// Custom serialization for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let invalid = || format!("Invalid duration: {}", s);

        // "ms" before "s", since "ms" ends with 's'
        if let Some(num) = s.strip_suffix("ms") {
            num.trim().parse().map(Duration::from_millis).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('s') {
            num.trim().parse().map(Duration::from_secs).map_err(|_| invalid())
        } else if let Some(num) = s.strip_suffix('m') {
            num.trim()
                .parse::<u64>()
                .ok()
                .and_then(|mins| mins.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or_else(invalid)
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
