// # Command Health Check
//
// Runs an external program once per check. Exit status 0 means healthy.
//
// The child is spawned with kill-on-drop: when the executor kills a
// timed-out check task, the child process is killed with it and reaped by
// the runtime.

use async_trait::async_trait;
use std::net::IpAddr;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::CheckConfig;
use crate::traits::{HealthCheck, HealthCheckFactory};
use crate::{Error, Result};

/// Placeholder replaced by the checked address in command arguments
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Health check backed by an external command
///
/// Every `{target}` in the arguments is replaced by the checked address.
/// When no argument contains the placeholder, the address is appended as
/// the last argument.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    program: String,
    args: Vec<String>,
}

impl CommandCheck {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments for one invocation against `target`
    fn args_for(&self, target: IpAddr) -> Vec<String> {
        let target = target.to_string();
        if self.args.iter().any(|arg| arg.contains(TARGET_PLACEHOLDER)) {
            self.args
                .iter()
                .map(|arg| arg.replace(TARGET_PLACEHOLDER, &target))
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(target);
            args
        }
    }
}

#[async_trait]
impl HealthCheck for CommandCheck {
    async fn check(&self, target: IpAddr) -> Result<bool> {
        let status = Command::new(&self.program)
            .args(self.args_for(target))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::health_check(format!("Failed to run {}: {}", self.program, e)))?;

        if !status.success() {
            tracing::debug!("{} exited with {} for {}", self.program, status, target);
        }
        Ok(status.success())
    }

    fn describe(&self) -> String {
        format!("command check ({})", self.program)
    }
}

/// Factory for creating command checks
pub struct CommandCheckFactory;

impl HealthCheckFactory for CommandCheckFactory {
    fn create(&self, config: &CheckConfig) -> Result<Box<dyn HealthCheck>> {
        match config {
            CheckConfig::Command { program, args } => {
                if program.is_empty() {
                    return Err(Error::config("Check command cannot be empty"));
                }
                Ok(Box::new(CommandCheck::new(program.clone(), args.clone())))
            }
            _ => Err(Error::config("Invalid config for command check")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_substituted() {
        let check = CommandCheck::new(
            "curl",
            vec!["-fsS".to_string(), "http://{target}:8080/health".to_string()],
        );
        assert_eq!(
            check.args_for(IpAddr::from([192, 0, 2, 4])),
            vec!["-fsS".to_string(), "http://192.0.2.4:8080/health".to_string()]
        );
    }

    #[test]
    fn target_is_appended_without_placeholder() {
        let check = CommandCheck::new("ping", vec!["-c1".to_string()]);
        assert_eq!(
            check.args_for(IpAddr::from([192, 0, 2, 4])),
            vec!["-c1".to_string(), "192.0.2.4".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_decides_health() {
        let target = IpAddr::from([127, 0, 0, 1]);

        let healthy = CommandCheck::new("sh", vec!["-c".to_string(), "exit 0".to_string(), "{target}".to_string()]);
        assert!(healthy.check(target).await.unwrap());

        let unhealthy = CommandCheck::new("sh", vec!["-c".to_string(), "exit 3".to_string(), "{target}".to_string()]);
        assert!(!unhealthy.check(target).await.unwrap());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let check = CommandCheck::new("/nonexistent/adf-health", Vec::new());
        let result = check.check(IpAddr::from([127, 0, 0, 1])).await;
        assert!(matches!(result, Err(Error::HealthCheck(_))));
    }

    #[test]
    fn factory_creation() {
        let config = CheckConfig::Command {
            program: "true".to_string(),
            args: Vec::new(),
        };
        assert!(CommandCheckFactory.create(&config).is_ok());
        assert!(CommandCheckFactory.create(&CheckConfig::default()).is_err());
    }
}
