//! 统一错误处理模型
//!
//! 提供主应用 orchestrix 的顶层错误类型，聚合所有子模块和依赖 crate 的错误

use lifecycle::{GraphError, RegistryError, ServiceError};
use orchestrix_common::{BaseError, ConfigError};
use thiserror::Error;

/// 主应用的统一错误枚举
#[derive(Debug, Error)]
pub enum Error {
    // ========== 配置相关错误 ==========
    /// 配置文件相关错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // ========== 基础库错误 ==========
    /// Base crate 聚合错误
    #[error("Base library error: {0}")]
    Base(Box<BaseError>),

    // ========== 服务相关错误 ==========
    /// 服务启动/停止失败
    #[error("Service lifecycle error: {0}")]
    Lifecycle(#[from] ServiceError),

    /// 服务注册失败
    #[error("Service registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 服务依赖图非法
    #[error("Service graph error: {0}")]
    Graph(#[from] GraphError),

    // ========== 系统级错误 ==========
    /// I/O 操作错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// 阻塞任务执行失败
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    // ========== 业务逻辑错误 ==========
    /// 服务启动失败
    #[error("Service startup failed: {message}")]
    ServiceStartup { message: String },

    /// 服务配置验证失败
    #[error("Service configuration validation failed: {message}")]
    ServiceValidation { message: String },

    // ========== 通用错误 ==========
    /// Anyhow 错误兼容层
    #[error("Legacy error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// 自定义错误消息
    #[error("Application error: {message}")]
    Custom { message: String },
}

impl From<BaseError> for Error {
    fn from(err: BaseError) -> Self {
        Error::Base(Box::new(err))
    }
}

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 创建自定义错误
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    /// 创建服务启动失败错误
    pub fn service_startup(message: impl Into<String>) -> Self {
        Self::ServiceStartup {
            message: message.into(),
        }
    }

    /// 创建服务配置验证失败错误
    pub fn service_validation(message: impl Into<String>) -> Self {
        Self::ServiceValidation {
            message: message.into(),
        }
    }
}
