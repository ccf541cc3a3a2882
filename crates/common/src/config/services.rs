//! 服务声明配置
//!
//! 每个 `[[services]]` 条目声明一个受管服务及其依赖边：
//!
//! ```toml
//! [[services]]
//! name = "api"
//! start_command = "./bin/api --daemon"
//!
//! [[services.dependencies]]
//! target = "db"
//! stop_on_stop = false
//! ```

use lifecycle::{DependencyFlags, ServiceDeclaration};
use serde::{Deserialize, Serialize};

/// 单个服务的声明
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// 服务名称，在整个配置中唯一
    pub name: String,

    /// 服务描述（可选）
    #[serde(default)]
    pub description: String,

    /// 启动命令（可选）
    ///
    /// 通过 `sh -c` 执行，退出码非零视为启动失败。未配置时服务仅做状态切换。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,

    /// 停止命令（可选），语义同 `start_command`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_command: Option<String>,

    /// 依赖声明，按声明顺序启动
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

/// 一条依赖边，未写出的标志默认为 true
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DependencyConfig {
    /// 被依赖服务的名称
    pub target: String,

    /// 启动本服务前先启动依赖，依赖启动失败则本服务失败
    #[serde(default = "default_true")]
    pub required_at_start: bool,

    /// 依赖停止时停止本服务
    #[serde(default = "default_true")]
    pub stop_on_stop: bool,

    /// 依赖（重新）启动后启动本服务
    #[serde(default = "default_true")]
    pub start_on_restart: bool,
}

fn default_true() -> bool {
    true
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start_command: None,
            stop_command: None,
            dependencies: Vec::new(),
        }
    }

    /// 转换为按名称引用依赖的服务声明
    pub fn declaration(&self) -> ServiceDeclaration {
        self.dependencies.iter().fold(
            ServiceDeclaration::new(&self.name).with_description(&self.description),
            |declaration, dependency| declaration.depends_on(&dependency.target, dependency.flags()),
        )
    }
}

impl DependencyConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            required_at_start: true,
            stop_on_stop: true,
            start_on_restart: true,
        }
    }

    pub fn flags(&self) -> DependencyFlags {
        DependencyFlags::optional()
            .with_required_at_start(self.required_at_start)
            .with_stop_on_stop(self.stop_on_stop)
            .with_start_on_restart(self.start_on_restart)
    }
}

impl From<&DependencyConfig> for DependencyFlags {
    fn from(config: &DependencyConfig) -> Self {
        config.flags()
    }
}
