//! 服务管理器模块 - 负责按配置构建服务依赖图并驱动其生命周期

use super::CommandService;
use crate::error::{Error, Result};
use lifecycle::{
    Service, ServiceBase, ServiceError, ServiceStatusReport, ServicesMonitor, Status,
};
use orchestrix_common::OrchestrixConfig;
use std::sync::Arc;
use tracing::{error, info, warn};

type ManagedService = Arc<ServiceBase<CommandService>>;

/// 服务管理器，持有监视器与全部受管服务
#[derive(Debug)]
pub struct ServiceManager {
    monitor: Arc<ServicesMonitor>,
    /// 依赖优先的构建顺序
    services: Vec<ManagedService>,
    start_targets: Vec<String>,
}

impl ServiceManager {
    /// 由配置构建服务图，依赖总在其使用者之前构建
    pub fn from_config(config: &OrchestrixConfig) -> Result<Self> {
        let monitor = ServicesMonitor::with_options(config.monitor.options());
        let graph = config.service_graph();
        let services = graph.build(&monitor, |declaration| {
            config
                .service(&declaration.name)
                .map(CommandService::from_config)
                .unwrap_or_else(|| {
                    CommandService::new(&declaration.name, &declaration.description)
                })
        })?;

        for service in &services {
            info!(
                service = service.name(),
                dependencies = service.dependencies().len(),
                "Adding service to manager"
            );
        }

        Ok(Self {
            monitor,
            services,
            start_targets: config.start.clone(),
        })
    }

    pub fn monitor(&self) -> &Arc<ServicesMonitor> {
        &self.monitor
    }

    pub fn services(&self) -> &[ManagedService] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ManagedService> {
        self.services.iter().find(|s| s.name() == name)
    }

    /// 启动目标：配置的 `start` 列表，为空时为全部服务（构建顺序）
    pub fn start_targets(&self) -> Vec<&ManagedService> {
        if self.start_targets.is_empty() {
            self.services.iter().collect()
        } else {
            self.start_targets
                .iter()
                .filter_map(|name| self.service(name))
                .collect()
        }
    }

    /// 依次启动所有启动目标，返回失败的目标
    ///
    /// 一个目标失败不影响其余目标的启动。
    pub fn start_all(&self) -> Vec<ServiceError> {
        let targets = self.start_targets();
        info!(
            "Starting {} target service(s): {}",
            targets.len(),
            targets
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut failures = Vec::new();
        for service in targets {
            if let Err(e) = service.start() {
                error!(service = service.name(), error = %e, "Start target failed");
                failures.push(e);
            }
        }
        failures
    }

    /// 启动全部目标，有任一失败即返回错误
    pub fn start_all_checked(&self) -> Result<()> {
        let failures = self.start_all();
        if failures.is_empty() {
            return Ok(());
        }
        let summary = failures
            .iter()
            .map(|e| format!("{} ({})", e.service(), e.root_service()))
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::service_startup(format!(
            "{} start target(s) failed: {summary}",
            failures.len()
        )))
    }

    /// 按构建顺序的逆序停止所有服务，返回停止失败
    pub fn stop_all(&self) -> Vec<ServiceError> {
        info!("Stopping all services");

        let mut failures = Vec::new();
        for service in self.services.iter().rev() {
            if let Err(e) = service.stop() {
                warn!(service = service.name(), error = %e, "Failed to stop service");
                failures.push(e);
            }
        }

        info!("All services stopped");
        failures
    }

    pub fn status_report(&self) -> Vec<ServiceStatusReport> {
        self.monitor.status_report()
    }

    /// 以 JSON 形式导出状态报告
    pub fn status_report_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.status_report())?)
    }

    /// 以日志形式输出当前状态
    pub fn log_status_report(&self) {
        for entry in self.status_report() {
            let record = &entry.record;
            if record.current_status.is_failure() {
                warn!(
                    service = %entry.name,
                    status = %record.current_status,
                    previous = %record.previous_status,
                    "Service status"
                );
            } else {
                info!(
                    service = %entry.name,
                    status = %record.current_status,
                    previous = %record.previous_status,
                    listeners = entry.listeners,
                    "Service status"
                );
            }
        }
    }

    /// 当前处于 STARTED 的服务数量
    pub fn started_count(&self) -> usize {
        self.services
            .iter()
            .filter(|s| s.status() == Status::Started)
            .count()
    }
}
