//! # orchestrix
//!
//! 服务生命周期编排器：按配置声明的依赖图启动、停止并监控服务

pub mod error;
pub mod service;

// Re-export commonly used types
pub use error::{Error, Result};
pub use orchestrix_common::config::OrchestrixConfig;
pub use service::{CommandService, ServiceManager};
