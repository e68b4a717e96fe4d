//! 驱动层错误类型定义

use dxl_protocol::{ActuatorId, ProtocolError, StatusError};
use dxl_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 构造期和前置条件错误只通过返回值报告；链路错误（超时、坏帧、IO）
/// 同时记录到会话的 `last_error`。驱动层从不自动重试。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 端点无法打开（会话构造失败）
    #[error("Connection error: {0}")]
    Connection(String),

    /// 会话已关闭后仍调用操作（调用方 bug）
    #[error("Session closed")]
    SessionClosed,

    /// 应答帧校验失败
    #[error("Corrupt reply frame: {0}")]
    FrameCorrupt(ProtocolError),

    /// 在限定时间内没有应答
    #[error("Operation timeout")]
    Timeout,

    /// SYNC_WRITE 批量数据不满足不变量，未进行任何 IO
    #[error("Malformed sync write batch: {0}")]
    MalformedBatch(String),

    /// 舵机返回了非零错误状态
    #[error("Actuator {id} reported {status}")]
    Actuator { id: ActuatorId, status: StatusError },

    /// 协议编码错误（如参数过长）
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    /// 其他传输层错误
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 锁被毒化（线程 panic）
    #[error("Poisoned lock (thread panic)")]
    PoisonedLock,
}

impl From<ProtocolError> for DriverError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::MalformedBatch(msg) => DriverError::MalformedBatch(msg),
            other => DriverError::Protocol(other),
        }
    }
}

impl From<TransportError> for DriverError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Connection(msg) => DriverError::Connection(msg),
            TransportError::Timeout => DriverError::Timeout,
            TransportError::FrameCorrupt(p) => DriverError::FrameCorrupt(p),
            TransportError::Protocol(p) => p.into(),
            TransportError::Closed => DriverError::SessionClosed,
            other => DriverError::Transport(other),
        }
    }
}
