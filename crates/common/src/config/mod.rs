//! 统一配置管理系统
//!
//! 本模块是 Orchestrix 配置的"单一真理之源"。
//! 所有配置项的定义、文档、默认值都在这里统一管理。

pub mod services;

pub use crate::config::services::{DependencyConfig, ServiceConfig};
use crate::error::{BaseError, ConfigError};
use lifecycle::{MonitorOptions, ServiceGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Orchestrix 的主配置结构体
///
/// 配置文件使用 TOML 格式，支持完整的类型安全加载。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrchestrixConfig {
    /// 实例名称
    ///
    /// 用于在日志中区分不同的编排器实例。
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，对日志配置做额外检查
    /// - "test": 测试环境，用于自动化测试
    pub env: String,

    /// PID 文件路径（可选）
    ///
    /// 未配置时不写 PID 文件。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,

    /// 启动目标
    ///
    /// 启动时依次调用这些服务的 start，其必需依赖会被级联启动。
    /// 为空时按依赖优先的构建顺序启动全部服务。
    #[serde(default)]
    pub start: Vec<String>,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// 服务监视器配置
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// 受管服务声明
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,lifecycle=debug"）。默认值 "info"。
    /// 设置了 RUST_LOG 时以 RUST_LOG 为准。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关
    ///
    /// 当 output = "file" 时有效：
    /// - true: 按天轮转日志文件
    /// - false: 追加到单个文件
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，当 output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

/// 服务监视器配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// 每个服务保留的状态转换历史条数，0 表示不保留
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn options(&self) -> MonitorOptions {
        MonitorOptions {
            history_capacity: self.history_capacity,
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

fn default_history_capacity() -> usize {
    MonitorOptions::default().history_capacity
}

impl Default for OrchestrixConfig {
    fn default() -> Self {
        Self {
            name: "orchestrix-default".to_string(),
            env: "dev".to_string(),
            pid: Some("logs/orchestrix.pid".to_string()),
            start: Vec::new(),
            observability: ObservabilityConfig::default(),
            monitor: MonitorConfig::default(),
            services: Vec::new(),
        }
    }
}

impl OrchestrixConfig {
    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 返回日志配置引用
    pub fn log_config(&self) -> &LogConfig {
        &self.observability.log
    }

    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.observability.log.output == "console"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.observability.log.output == "file" && self.observability.log.rotate
    }

    /// 获取 PID 文件路径
    pub fn get_pid_path(&self) -> Option<&str> {
        self.pid.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// 按名称查找服务声明
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// 由服务声明构建依赖图（不做校验）
    pub fn service_graph(&self) -> ServiceGraph {
        let mut graph = ServiceGraph::new();
        for service in &self.services {
            graph.declare(service.declaration());
        }
        graph
    }

    /// 依赖优先的构建顺序，依赖图非法时返回错误
    pub fn start_order(&self) -> Result<Vec<String>, BaseError> {
        let graph = self.service_graph();
        let plan = graph.plan()?;
        Ok(plan.into_iter().map(|d| d.name.clone()).collect())
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: path_ref.display().to_string(),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                value: format!("{} is not a regular file", path_ref.display()),
            });
        }

        let content = std::fs::read_to_string(path_ref).map_err(ConfigError::parse)?;
        Self::from_toml(&content)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// 验证配置有效性
    ///
    /// 返回发现的全部问题；以 "Warning:" 开头的条目不影响启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // 验证实例名称
        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        // 验证环境
        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 验证过滤级别（EnvFilter 语法）
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        // 验证日志输出
        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        if self.env == "prod"
            && self.observability.log.output == "file"
            && !self.observability.log.rotate
        {
            errors.push("Warning: Production environment should enable log rotation (observability.log.rotate = true)".to_string());
        }

        if self.monitor.history_capacity == 0 {
            errors.push(
                "Warning: monitor.history_capacity = 0 disables transition history".to_string(),
            );
        }

        if self.services.is_empty() {
            errors.push("Warning: No services declared ([[services]])".to_string());
        }

        // 验证服务声明
        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                errors.push("Service name cannot be empty".to_string());
                continue;
            }
            if !names.insert(service.name.as_str()) {
                errors.push(format!("Duplicate service name '{}'", service.name));
            }

            let mut targets = HashSet::new();
            for dependency in &service.dependencies {
                if dependency.target.trim().is_empty() {
                    errors.push(format!(
                        "Service '{}' has a dependency with an empty target",
                        service.name
                    ));
                } else if !targets.insert(dependency.target.as_str()) {
                    errors.push(format!(
                        "Service '{}' depends on '{}' more than once",
                        service.name, dependency.target
                    ));
                }
            }

            if let Some(command) = &service.start_command
                && command.trim().is_empty()
            {
                errors.push(format!(
                    "Service '{}' has an empty start_command",
                    service.name
                ));
            }
            if let Some(command) = &service.stop_command
                && command.trim().is_empty()
            {
                errors.push(format!(
                    "Service '{}' has an empty stop_command",
                    service.name
                ));
            }
        }

        // 依赖图：未知目标、自依赖、环
        if let Err(e) = self.service_graph().validate() {
            errors.push(format!("Service dependency graph error: {e}"));
        }

        // 启动目标
        for target in &self.start {
            if !names.contains(target.as_str()) {
                errors.push(format!("Unknown start target '{target}'"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// 验证配置，只把非警告问题视为错误
    pub fn validate_strict(&self) -> Result<(), ConfigError> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(problems) => {
                let errors: Vec<String> = problems
                    .into_iter()
                    .filter(|p| !p.starts_with("Warning:"))
                    .collect();
                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(ConfigError::Validation { errors })
                }
            }
        }
    }
}
