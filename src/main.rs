//! Orchestrix 主程序
//!
//! 按配置构建服务依赖图，启动目标服务，等待关闭信号后按逆序停止

mod cli;
mod observability;
mod process;

use clap::Parser;
use observability::init_observability;
use orchestrix::error::{Error, Result};
use orchestrix::{OrchestrixConfig, ServiceManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*);
    };
}

use cli::{Cli, Commands};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Test { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::test_config_file(&config_path)
        }
        Some(Commands::Plan { config_file }) => {
            let config_path =
                ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
            ApplicationLauncher::print_plan(&config_path)
        }
        None => {
            let config_path = ApplicationLauncher::find_config_file(&cli.config)?;

            // Create Tokio runtime（before running the application）
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(ApplicationLauncher::run_application(
                &config_path,
                cli.once,
                cli.report.as_deref(),
            ))
        }
    }
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        // If the provided path is not the default "config.toml", check if it exists
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = vec![
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from("/etc/orchestrix/config.toml"),
        ];

        bootstrap_info!("Searching for config file in default locations...");

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            } else {
                bootstrap_info!("Config not found at: {:?}", path);
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: orchestrix --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 加载并验证配置，打印所有问题；存在非警告问题时返回错误
    fn load_config(config_path: &Path) -> Result<OrchestrixConfig> {
        let config = match OrchestrixConfig::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                bootstrap_error!("❌ 配置加载失败: {}", e);
                return Err(Error::service_validation(format!("配置解析失败: {e}")));
            }
        };

        if let Err(problems) = config.validate() {
            let mut has_critical_errors = false;
            bootstrap_error!("配置验证发现问题:");
            for (i, problem) in problems.iter().enumerate() {
                if problem.starts_with("Warning:") {
                    bootstrap_info!("  {}. ⚠️  {}", i + 1, problem);
                } else {
                    bootstrap_error!("  {}. ❌ {}", i + 1, problem);
                    has_critical_errors = true;
                }
            }
            if has_critical_errors {
                return Err(Error::service_validation("配置验证失败，请修复上述错误"));
            }
        }

        Ok(config)
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        let config = Self::load_config(config_path)?;
        bootstrap_info!("✅ 配置文件解析成功: {:?}", config_path);
        bootstrap_info!(
            "✅ 配置验证通过: {} 个服务, 启动目标: {}",
            config.services.len(),
            if config.start.is_empty() {
                "全部".to_string()
            } else {
                config.start.join(", ")
            }
        );
        Ok(())
    }

    /// 打印依赖优先的启动顺序
    fn print_plan(config_path: &Path) -> Result<()> {
        let config = Self::load_config(config_path)?;
        let order = config.start_order()?;

        bootstrap_info!("Start order ({} services):", order.len());
        for (i, name) in order.iter().enumerate() {
            let dependencies = config
                .service(name)
                .map(|s| {
                    s.dependencies
                        .iter()
                        .map(|d| d.target.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            if dependencies.is_empty() {
                bootstrap_info!("  {}. {}", i + 1, name);
            } else {
                bootstrap_info!("  {}. {} <- {}", i + 1, name, dependencies);
            }
        }
        Ok(())
    }

    /// 运行应用程序的主入口
    async fn run_application(
        config_path: &Path,
        once: bool,
        report: Option<&Path>,
    ) -> Result<()> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);
        let config = Self::load_config(config_path)?;
        bootstrap_info!("✅ 配置加载成功");

        // 初始化可观测性系统（日志）
        let observability_guard = init_observability(&config)?;
        if observability_guard.is_file_backed() {
            bootstrap_info!("日志已写入文件: {}", config.log_config().path);
        }

        let pid_path = process::ProcessManager::write_pid_file(config.get_pid_path())?;
        let _pid_guard = process::PidFileGuard::new(pid_path);

        info!("🚀 启动服务编排器: {} ({})", config.name, config.env);
        let manager = Arc::new(ServiceManager::from_config(&config)?);

        // 生命周期调用是同步的，放到阻塞线程执行
        let starter = manager.clone();
        let started = tokio::task::spawn_blocking(move || starter.start_all_checked()).await?;
        manager.log_status_report();

        if let Err(e) = started {
            error!("❌ {}，停止所有服务", e);
            Self::shutdown(manager.clone(), report).await?;
            return Err(e);
        }

        info!(
            "✅ {} / {} 个服务已启动",
            manager.started_count(),
            manager.services().len()
        );

        if !once {
            wait_for_shutdown().await;
        }

        Self::shutdown(manager, report).await?;
        info!("🛑 所有服务已安全关闭");
        Ok(())
    }

    /// 按构建顺序的逆序停止所有服务
    async fn shutdown(manager: Arc<ServiceManager>, report: Option<&Path>) -> Result<()> {
        let stopper = manager.clone();
        let failures = tokio::task::spawn_blocking(move || stopper.stop_all()).await?;
        for failure in &failures {
            warn!("停止失败: {}", failure);
        }
        manager.log_status_report();

        if let Some(path) = report {
            std::fs::write(path, manager.status_report_json()?)?;
            info!("状态报告已写入: {:?}", path);
        }
        Ok(())
    }
}

/// 等待 Ctrl-C 信号
async fn wait_for_shutdown() {
    info!("等待 Ctrl-C 信号以关闭...");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到Ctrl-C信号，开始优雅关闭..."),
        Err(e) => error!("无法监听Ctrl-C信号: {}", e),
    }
}
