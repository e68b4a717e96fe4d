//! 连接参数
//!
//! 命令行参数优先于配置文件：`--proxy` 选择消息队列代理，
//! `--port` 选择串口，二者都没有时使用 `--config` 或默认配置。

use anyhow::{Context, Result};
use clap::Args;
use dxl_driver::{DriverConfig, DriverSession, TransportKind};
use std::path::PathBuf;
use tracing::info;

/// 全局连接参数
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 串口设备（如 /dev/ttyUSB0、COM3）
    #[arg(short, long, global = true, conflicts_with = "proxy")]
    pub port: Option<String>,

    /// 串口波特率
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// 代理端点（如 tcp://127.0.0.1:5000）
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// 应答超时（ms）
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

impl ConnectionArgs {
    /// 合并配置文件与命令行参数
    pub fn resolve(&self) -> Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::from_file(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
            None => DriverConfig::default(),
        };

        if let Some(endpoint) = &self.proxy {
            config.transport = TransportKind::QueueProxy;
            config.queue_proxy.endpoint = endpoint.clone();
        }
        if let Some(port) = &self.port {
            config.transport = TransportKind::Serial;
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            match config.transport {
                TransportKind::Serial => config.serial.timeout_ms = timeout_ms,
                TransportKind::QueueProxy => config.queue_proxy.timeout_ms = timeout_ms,
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 打开会话
    pub fn open(&self) -> Result<DriverSession> {
        let config = self.resolve()?;
        info!("Opening {} transport", config.transport);
        let session = dxl_driver::open(&config).context("打开总线失败")?;
        info!("🔌 Connected: {}", session.description());
        Ok(session)
    }
}
