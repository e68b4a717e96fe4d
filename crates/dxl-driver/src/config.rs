//! 驱动配置
//!
//! 可以直接在代码里构造，也可以从 TOML 文件加载：
//!
//! ```toml
//! transport = "queue_proxy"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 1000000
//! timeout_ms = 100
//!
//! [queue_proxy]
//! endpoint = "tcp://127.0.0.1:5000"
//! timeout_ms = 1000
//! interpolation = true
//! direct = false
//! ```

use crate::DriverError;
use dxl_transport::proxy::DEFAULT_ENDPOINT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 默认串口波特率（AX-12 出厂值）
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// 后端类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// 本机串口总线
    #[default]
    Serial,
    /// 远端总线进程（消息队列代理）
    QueueProxy,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Serial => write!(f, "serial"),
            TransportKind::QueueProxy => write!(f, "queue_proxy"),
        }
    }
}

/// 串口后端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// 串口设备路径
    pub port: String,

    /// 波特率
    pub baud_rate: u32,

    /// 状态包应答超时（ms）
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 100,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 消息队列代理配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueProxyConfig {
    /// ZeroMQ 端点
    pub endpoint: String,

    /// 连接与单次往返超时（ms）
    pub timeout_ms: u64,

    /// 远端是否支持插值运动
    pub interpolation: bool,

    /// 远端是否直接驱动总线
    pub direct: bool,
}

impl Default for QueueProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 1000,
            interpolation: false,
            direct: false,
        }
    }
}

impl QueueProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 驱动配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 选用的后端
    pub transport: TransportKind,

    pub serial: SerialConfig,

    pub queue_proxy: QueueProxyConfig,
}

impl DriverConfig {
    /// 串口配置
    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            transport: TransportKind::Serial,
            serial: SerialConfig {
                port: port.into(),
                baud_rate,
                ..SerialConfig::default()
            },
            ..Self::default()
        }
    }

    /// 消息队列代理配置
    pub fn queue_proxy(endpoint: impl Into<String>) -> Self {
        Self {
            transport: TransportKind::QueueProxy,
            queue_proxy: QueueProxyConfig {
                endpoint: endpoint.into(),
                ..QueueProxyConfig::default()
            },
            ..Self::default()
        }
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        let config: Self =
            toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DriverError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string(self).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// 检查所选后端的参数
    pub fn validate(&self) -> Result<(), DriverError> {
        match self.transport {
            TransportKind::Serial => {
                if self.serial.port.is_empty() {
                    return Err(DriverError::Config("serial.port is empty".into()));
                }
                if self.serial.baud_rate == 0 {
                    return Err(DriverError::Config("serial.baud_rate must be > 0".into()));
                }
                if self.serial.timeout_ms == 0 {
                    return Err(DriverError::Config("serial.timeout_ms must be > 0".into()));
                }
            },
            TransportKind::QueueProxy => {
                if self.queue_proxy.endpoint.is_empty() {
                    return Err(DriverError::Config("queue_proxy.endpoint is empty".into()));
                }
                if self.queue_proxy.timeout_ms == 0 {
                    return Err(DriverError::Config(
                        "queue_proxy.timeout_ms must be > 0".into(),
                    ));
                }
            },
        }
        Ok(())
    }
}
