//! Base 基础设施库
//!
//! 为 Orchestrix 提供配置加载与校验、统一错误模型等基础设施组件

pub mod config;
pub mod error;

pub use config::{
    DependencyConfig, LogConfig, MonitorConfig, ObservabilityConfig, OrchestrixConfig,
    ServiceConfig,
};
pub use error::{BaseError, ConfigError, Result};
