use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &SupervisorConfig) -> Result<()> {
    validate_target(&config.target)?;
    validate_shutdown(&config.shutdown)?;
    validate_watch(&config.watch)?;

    Ok(())
}

fn validate_target(target: &TargetConfig) -> Result<()> {
    if target.command.trim().is_empty() {
        return Err(anyhow!("Target command cannot be empty"));
    }

    if target.artifact_path().as_os_str().is_empty() {
        return Err(anyhow!("Artifact path cannot be empty"));
    }

    if target.artifact_path_env.contains('=') {
        return Err(anyhow!(
            "Invalid artifact path environment variable name: {}",
            target.artifact_path_env
        ));
    }

    Ok(())
}

fn validate_shutdown(shutdown: &ShutdownSettings) -> Result<()> {
    if shutdown.grace_timeout.is_zero() {
        return Err(anyhow!("Shutdown grace timeout must be greater than 0"));
    }

    if shutdown.restart_grace_timeout.is_zero() {
        return Err(anyhow!("Restart grace timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_watch(watch: &WatchSettings) -> Result<()> {
    if !watch.enabled {
        return Ok(());
    }

    if watch.extensions.is_empty() {
        return Err(anyhow!("At least one watch extension must be configured"));
    }

    if let Some(ext) = watch.extensions.iter().find(|ext| ext.trim().trim_start_matches('.').is_empty()) {
        return Err(anyhow!("Invalid watch extension: '{}'", ext));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected() {
        let mut config = SupervisorConfig::default();
        config.target.command = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("command cannot be empty"));
    }

    #[test]
    fn test_empty_artifact_rejected() {
        let mut config = SupervisorConfig::default();
        config.target.set_artifact_path("", ArtifactSource::CommandLine);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_grace_rejected() {
        let mut config = SupervisorConfig::default();
        config.shutdown.grace_timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());

        let mut config = SupervisorConfig::default();
        config.shutdown.restart_grace_timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_watch_extensions() {
        let mut config = SupervisorConfig::default();
        config.watch.extensions.clear();
        assert!(validate_config(&config).is_err());

        config.watch.extensions = vec![".js".to_string(), ".".to_string()];
        assert!(validate_config(&config).is_err());

        // Irrelevant when watching is off
        config.watch.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_attempts_allowed() {
        let mut config = SupervisorConfig::default();
        config.restart.max_attempts = 0;
        config.restart.delay = Duration::ZERO;
        assert!(validate_config(&config).is_ok());
    }
}
