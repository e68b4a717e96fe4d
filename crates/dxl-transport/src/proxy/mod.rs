//! 消息队列代理后端
//!
//! 当控制进程与总线硬件不在同一台机器/进程时，把指令编码为 msgpack 整数数组，
//! 通过请求/应答通道交给持有总线的远端进程执行。
//!
//! 每次调用严格发送一个请求、阻塞等待一个应答，不支持乱序或流水线请求。
//! 这是 REQ/REP 原语本身的限制，也是本后端的吞吐上限：每条指令至少一个往返时延。

#[cfg(feature = "zmq")]
pub mod zmq;

#[cfg(feature = "zmq")]
pub use self::zmq::ZmqChannel;

use crate::{Reply, Transport, TransportError};
use dxl_protocol::{ActuatorId, Instruction, RegisterAddress, SyncWriteBatch, proxy};
use tracing::{debug, info};

/// 默认代理端点
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5000";

/// 请求/应答通道
///
/// `request` 必须发送恰好一个请求并返回恰好一个应答。
pub trait RequestChannel: Send {
    fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    fn close(&mut self) {}

    fn describe(&self) -> String;
}

/// 消息队列代理驱动
pub struct QueueProxy<C: RequestChannel> {
    channel: Option<C>,
    name: String,
}

impl<C: RequestChannel> QueueProxy<C> {
    pub fn new(channel: C) -> Self {
        let name = channel.describe();
        Self {
            channel: Some(channel),
            name,
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn exchange(&mut self, request: Vec<u8>) -> Result<Reply, TransportError> {
        let channel = self.channel.as_mut().ok_or(TransportError::Closed)?;
        let bytes = channel.request(&request)?;
        let reply = proxy::decode_reply(&bytes).map_err(TransportError::FrameCorrupt)?;
        Ok(Reply::new(reply.status, reply.data))
    }
}

impl<C: RequestChannel> Transport for QueueProxy<C> {
    fn execute(
        &mut self,
        target: ActuatorId,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<Reply, TransportError> {
        debug!("execute {} -> {} {:?}", instruction, target, params);
        self.exchange(proxy::encode_execute(target, instruction, params)?)
    }

    fn write_registers(
        &mut self,
        target: ActuatorId,
        address: RegisterAddress,
        values: &[u8],
    ) -> Result<Reply, TransportError> {
        debug!("setReg {} @{} {:?}", target, address, values);
        self.exchange(proxy::encode_write(target, address, values)?)
    }

    fn read_registers(
        &mut self,
        target: ActuatorId,
        address: RegisterAddress,
        length: u8,
    ) -> Result<Reply, TransportError> {
        debug!("getReg {} @{} len={}", target, address, length);
        self.exchange(proxy::encode_read(target, address, length)?)
    }

    fn sync_write(
        &mut self,
        address: RegisterAddress,
        batch: &SyncWriteBatch,
    ) -> Result<Reply, TransportError> {
        debug!("syncWrite @{} {} actuators x {} bytes", address, batch.len(), batch.width());
        self.exchange(proxy::encode_sync_write(address, batch)?)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
            info!("Queue proxy closed: {}", self.name);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
