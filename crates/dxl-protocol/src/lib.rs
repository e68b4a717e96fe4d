//! # Dynamixel Protocol
//!
//! AX-12 类舵机的寄存器协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `instruction`: 指令集定义
//! - `status`: 舵机状态错误位
//! - `packet`: 串口总线帧编码/解码（协议 1.0）
//! - `sync_write`: SYNC_WRITE 批量写入
//! - `proxy`: 消息队列代理的 msgpack 编码
//! - `control_table`: AX-12 控制表寄存器地址
//!
//! ## 字节序
//!
//! 控制表中的双字节寄存器使用小端字节序（低字节在前，`*_L` 地址）。

pub mod control_table;
pub mod instruction;
pub mod packet;
pub mod proxy;
pub mod status;
pub mod sync_write;

pub use instruction::Instruction;
pub use packet::{InstructionPacket, StatusPacket, checksum};
pub use status::StatusError;
pub use sync_write::SyncWriteBatch;

use std::fmt;
use thiserror::Error;

/// 控制表寄存器地址
pub type RegisterAddress = u8;

/// 总线上的舵机 ID
///
/// - `0..=253`: 单个舵机
/// - `254` (0xFE): 广播 ID，总线上所有舵机都会执行，但不返回状态包
/// - `255` 与帧头字节冲突，不合法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActuatorId(u8);

impl ActuatorId {
    /// 广播 ID
    pub const BROADCAST: ActuatorId = ActuatorId(0xFE);

    /// 单个舵机可用的最大 ID
    pub const MAX_UNICAST: u8 = 0xFD;

    /// 创建舵机 ID，拒绝 0xFF
    pub fn new(raw: u8) -> Result<Self, ProtocolError> {
        if raw == 0xFF {
            return Err(ProtocolError::InvalidValue {
                field: "ActuatorId".to_string(),
                value: raw as i64,
            });
        }
        Ok(Self(raw))
    }

    /// 原始 ID 值
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// 是否为广播 ID
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl TryFrom<u8> for ActuatorId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActuatorId> for u8 {
    fn from(id: ActuatorId) -> Self {
        id.0
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "broadcast")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// 协议编码/解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid packet header: {0:02X?}")]
    InvalidHeader([u8; 2]),

    #[error("Invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidChecksum { expected: u8, actual: u8 },

    #[error("Actuator id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: u8, actual: u8 },

    #[error("Packet too long: {params} parameter bytes (max {max})")]
    PacketTooLong { params: usize, max: usize },

    #[error("Malformed sync write batch: {0}")]
    MalformedBatch(String),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: i64 },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// 小端字节序转 u16（控制表双字节寄存器）
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// u16 转小端字节序
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
