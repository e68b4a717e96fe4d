//! # Dynamixel 驱动层
//!
//! 对上层（姿态编辑、运动序列等工具）提供与后端无关的会话接口：
//!
//! - [`DriverSession`]：独占一个传输端点，串行化调用并维护粘滞错误状态
//! - [`DriverConfig`]：选择串口总线或消息队列代理，可从 TOML 加载
//! - [`DriverError`]：驱动层统一错误类型
//!
//! ```no_run
//! use dxl_driver::{ActuatorId, DriverConfig};
//!
//! # fn main() -> Result<(), dxl_driver::DriverError> {
//! let session = dxl_driver::open(&DriverConfig::serial("/dev/ttyUSB0", 1_000_000))?;
//! let id = ActuatorId::new(1)?;
//! session.set_reg(id, 24, &[1])?;
//! let position = session.get_reg(id, 36, 2)?;
//! println!("{}: {:?} ({})", session.description(), position, session.last_error());
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;

pub use config::{DriverConfig, QueueProxyConfig, SerialConfig, TransportKind};
pub use error::DriverError;
pub use session::{Capabilities, DriverSession, ErrorStatus, open};

// 重新导出常用协议类型
pub use dxl_protocol::{ActuatorId, Instruction, RegisterAddress, StatusError, SyncWriteBatch};
pub use dxl_transport::{Reply, Transport};
