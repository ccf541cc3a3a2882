//! 命令驱动的服务逻辑
//!
//! 每个配置中声明的服务由一条可选的启动命令和停止命令驱动，
//! 命令通过 `sh -c` 同步执行，退出码非零即视为失败。

use anyhow::{Context, bail};
use lifecycle::ServiceLogic;
use orchestrix_common::ServiceConfig;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// 由 shell 命令实现 start/stop 的服务
#[derive(Debug, Clone)]
pub struct CommandService {
    name: String,
    description: String,
    start_command: Option<String>,
    stop_command: Option<String>,
}

impl CommandService {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            start_command: None,
            stop_command: None,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            start_command: config.start_command.clone(),
            stop_command: config.stop_command.clone(),
        }
    }

    pub fn with_start_command(mut self, command: impl Into<String>) -> Self {
        self.start_command = Some(command.into());
        self
    }

    pub fn with_stop_command(mut self, command: impl Into<String>) -> Self {
        self.stop_command = Some(command.into());
        self
    }

    fn run(&self, phase: &str, command: Option<&str>) -> anyhow::Result<()> {
        let Some(command) = command else {
            debug!(service = %self.name, phase, "No command configured");
            return Ok(());
        };

        info!(service = %self.name, phase, command, "Running service command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to spawn {phase} command for '{}'", self.name))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(service = %self.name, phase, stdout = %stdout.trim(), "Command output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{phase} command `{command}` exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

impl ServiceLogic for CommandService {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }

    fn do_start(&self) -> anyhow::Result<()> {
        self.run("start", self.start_command.as_deref())
    }

    fn do_stop(&self) -> anyhow::Result<()> {
        self.run("stop", self.stop_command.as_deref())
    }
}
