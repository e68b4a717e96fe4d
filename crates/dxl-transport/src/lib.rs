//! # Dynamixel Transport Layer
//!
//! 舵机总线传输抽象层，提供统一的寄存器操作接口。
//!
//! - [`serial::SerialBus`]: 直接通过串口说协议 1.0 帧格式
//! - [`proxy::QueueProxy`]: 通过请求/应答消息通道转发给持有总线的远端进程
//!
//! 两种后端实现同一个 [`Transport`] trait，上层代码与传输方式无关。
//! 两者都是同步阻塞、单请求在途的设计：总线是半双工单主机，代理通道是严格的
//! REQ/REP，在前一个应答被读取之前发出第二个请求会打乱应答顺序。

pub mod proxy;
pub mod serial;

pub use proxy::{QueueProxy, RequestChannel};
pub use serial::{BusLink, ReplyPolicy, SerialBus};

pub use dxl_protocol::{ActuatorId, Instruction, RegisterAddress, StatusError, SyncWriteBatch};

use dxl_protocol::ProtocolError;
use thiserror::Error;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// 端点无法打开/连接（构造期错误）
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Read timeout")]
    Timeout,
    /// 应答帧校验和或 ID 校验失败
    #[error("Corrupt reply frame: {0}")]
    FrameCorrupt(ProtocolError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Transport closed")]
    Closed,
}

/// 一次请求的应答
///
/// 广播请求没有应答，返回空状态、空数据。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusError,
    pub data: Vec<u8>,
}

impl Reply {
    pub fn new(status: StatusError, data: Vec<u8>) -> Self {
        Self { status, data }
    }
}

/// 所有后端必须实现的传输接口
///
/// `write_registers`/`read_registers`/`sync_write` 的默认实现按串口总线的
/// 原生参数布局委托给 `execute`；消息队列代理使用自己的请求格式覆盖它们。
pub trait Transport: Send {
    /// 发送任意指令（PING、RESET 等）
    fn execute(
        &mut self,
        target: ActuatorId,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<Reply, TransportError>;

    /// WRITE_DATA: 从 `address` 开始立即写入 `values`
    fn write_registers(
        &mut self,
        target: ActuatorId,
        address: RegisterAddress,
        values: &[u8],
    ) -> Result<Reply, TransportError> {
        let mut params = Vec::with_capacity(values.len() + 1);
        params.push(address);
        params.extend_from_slice(values);
        self.execute(target, Instruction::WriteData, &params)
    }

    /// READ_DATA: 从 `address` 开始读取 `length` 字节
    fn read_registers(
        &mut self,
        target: ActuatorId,
        address: RegisterAddress,
        length: u8,
    ) -> Result<Reply, TransportError> {
        self.execute(target, Instruction::ReadData, &[address, length])
    }

    /// SYNC_WRITE: 一次事务写多个舵机
    fn sync_write(
        &mut self,
        address: RegisterAddress,
        batch: &SyncWriteBatch,
    ) -> Result<Reply, TransportError> {
        self.execute(
            ActuatorId::BROADCAST,
            Instruction::SyncWrite,
            &batch.native_params(address),
        )
    }

    /// 释放端点，可重复调用
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// 端点描述（日志/状态栏）
    fn describe(&self) -> String;
}
