//! 服务管理模块
//!
//! 将配置中声明的服务接入生命周期编排：
//!
//! - `CommandService`: 以 shell 命令实现启动/停止逻辑的服务
//! - `ServiceManager`: 按依赖图构建服务、启动目标并按逆序停止

pub mod command;
pub mod manager;

pub use command::CommandService;
pub use manager::ServiceManager;
