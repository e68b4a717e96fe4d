//! 驱动会话
//!
//! 会话独占一个传输端点，用互斥锁串行化所有调用方，
//! 并维护"最近一次操作"的粘滞错误状态。

use crate::config::{DriverConfig, TransportKind};
use crate::DriverError;
use dxl_protocol::control_table::TORQUE_ENABLE;
use dxl_protocol::{ActuatorId, Instruction, ProtocolError, RegisterAddress, StatusError, SyncWriteBatch};
use dxl_transport::{Reply, Transport, TransportError};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// 粘滞错误状态
///
/// 每次完成的总线操作都会覆盖它；`close()` 和调用前置条件错误
/// （会话已关闭、批量数据非法）不会改变它。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorStatus {
    /// 最近一次操作成功
    #[default]
    Ok,
    /// 舵机在状态包中报告了错误位
    Actuator(StatusError),
    /// 应答帧损坏
    FrameCorrupt,
    /// 应答超时
    Timeout,
    /// 底层链路 IO 错误或重连失败
    Link,
}

impl ErrorStatus {
    /// 由舵机状态字节得到
    pub fn from_status(status: StatusError) -> Self {
        if status.is_ok() {
            ErrorStatus::Ok
        } else {
            ErrorStatus::Actuator(status)
        }
    }

    /// 链路失败对应的状态；不涉及总线的错误返回 `None`
    fn from_failure(error: &TransportError) -> Option<Self> {
        match error {
            TransportError::Timeout => Some(ErrorStatus::Timeout),
            TransportError::FrameCorrupt(_) => Some(ErrorStatus::FrameCorrupt),
            TransportError::Io(_) | TransportError::Connection(_) => Some(ErrorStatus::Link),
            _ => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ErrorStatus::Ok)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Ok => write!(f, "ok"),
            ErrorStatus::Actuator(status) => write!(f, "actuator error {}", status),
            ErrorStatus::FrameCorrupt => write!(f, "corrupt frame"),
            ErrorStatus::Timeout => write!(f, "timeout"),
            ErrorStatus::Link => write!(f, "link error"),
        }
    }
}

/// 后端能力标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// 后端自行做插值运动
    pub interpolation: bool,
    /// 后端直接驱动总线
    pub direct: bool,
}

struct SessionState {
    transport: Option<Box<dyn Transport>>,
    last_error: ErrorStatus,
}

/// 驱动会话
///
/// `Sync`：可以在多个线程间共享（例如 `Arc<DriverSession>`），
/// 同一时刻只有一个请求在途。
pub struct DriverSession {
    state: Mutex<SessionState>,
    kind: TransportKind,
    description: String,
    capabilities: Capabilities,
}

/// 按配置打开会话
///
/// 端点无法打开时返回 `DriverError::Connection`，不会产生半初始化的会话。
pub fn open(config: &DriverConfig) -> Result<DriverSession, DriverError> {
    DriverSession::open(config)
}

impl DriverSession {
    /// 按配置打开会话
    ///
    /// 会话接口是同步阻塞的；在 tokio 运行时内部打开代理会话会返回
    /// `DriverError::Connection`。
    pub fn open(config: &DriverConfig) -> Result<Self, DriverError> {
        config.validate()?;
        match config.transport {
            TransportKind::Serial => Self::open_serial(config),
            TransportKind::QueueProxy => Self::open_queue_proxy(config),
        }
    }

    #[cfg(feature = "serial")]
    fn open_serial(config: &DriverConfig) -> Result<Self, DriverError> {
        let serial = &config.serial;
        let bus = dxl_transport::SerialBus::open(&serial.port, serial.baud_rate, serial.timeout())?;
        Ok(Self::from_transport(
            TransportKind::Serial,
            bus,
            Capabilities {
                interpolation: false,
                direct: true,
            },
        ))
    }

    #[cfg(not(feature = "serial"))]
    fn open_serial(_config: &DriverConfig) -> Result<Self, DriverError> {
        Err(DriverError::Config("serial transport not compiled in".into()))
    }

    #[cfg(feature = "zmq")]
    fn open_queue_proxy(config: &DriverConfig) -> Result<Self, DriverError> {
        let proxy = &config.queue_proxy;
        let channel = dxl_transport::proxy::ZmqChannel::connect(&proxy.endpoint, proxy.timeout())?;
        let mut session = Self::from_transport(
            TransportKind::QueueProxy,
            dxl_transport::QueueProxy::new(channel),
            Capabilities {
                interpolation: proxy.interpolation,
                direct: proxy.direct,
            },
        );
        session.description = format!("ZMQ: {}", proxy.endpoint);
        Ok(session)
    }

    #[cfg(not(feature = "zmq"))]
    fn open_queue_proxy(_config: &DriverConfig) -> Result<Self, DriverError> {
        Err(DriverError::Config("queue proxy transport not compiled in".into()))
    }

    /// 使用已打开的传输端点构造会话
    pub fn from_transport<T: Transport + 'static>(
        kind: TransportKind,
        transport: T,
        capabilities: Capabilities,
    ) -> Self {
        let description = transport.describe();
        info!("Driver session opened ({}): {}", kind, description);
        Self {
            state: Mutex::new(SessionState {
                transport: Some(Box::new(transport)),
                last_error: ErrorStatus::Ok,
            }),
            kind,
            description,
            capabilities,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// 状态栏文本："端口 @ 波特率" 或 "ZMQ: 端点"
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_open(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.transport.is_some(),
            Err(poisoned) => poisoned.into_inner().transport.is_some(),
        }
    }

    /// 最近一次操作的状态
    pub fn last_error(&self) -> ErrorStatus {
        match self.state.lock() {
            Ok(state) => state.last_error,
            Err(poisoned) => poisoned.into_inner().last_error,
        }
    }

    // ============================================================
    // 请求执行
    // ============================================================

    /// 在锁内执行一次交换，并更新粘滞状态
    fn exchange<F>(&self, op: F) -> Result<Reply, DriverError>
    where
        F: FnOnce(&mut dyn Transport) -> Result<Reply, TransportError>,
    {
        let mut guard = self.state.lock().map_err(|_| DriverError::PoisonedLock)?;
        let state = &mut *guard;
        let transport = state.transport.as_mut().ok_or(DriverError::SessionClosed)?;

        match op(&mut **transport) {
            Ok(reply) => {
                state.last_error = ErrorStatus::from_status(reply.status);
                Ok(reply)
            },
            Err(e) => {
                if let Some(status) = ErrorStatus::from_failure(&e) {
                    state.last_error = status;
                    warn!("Exchange on {} failed: {}", self.description, e);
                }
                Err(e.into())
            },
        }
    }

    /// 发送任意指令
    pub fn execute(
        &self,
        target: ActuatorId,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<Reply, DriverError> {
        self.exchange(|t| t.execute(target, instruction, params))
    }

    /// WRITE_DATA：立即写寄存器，返回更新后的粘滞状态
    pub fn set_reg(
        &self,
        target: ActuatorId,
        start: RegisterAddress,
        values: &[u8],
    ) -> Result<ErrorStatus, DriverError> {
        debug!("set_reg {} @{} {:?}", target, start, values);
        let reply = self.exchange(|t| t.write_registers(target, start, values))?;
        Ok(ErrorStatus::from_status(reply.status))
    }

    /// READ_DATA：读取 `length` 字节
    ///
    /// 成功时恰好返回 `length` 字节；舵机报告错误时返回
    /// `DriverError::Actuator`，不返回数据。
    pub fn get_reg(
        &self,
        target: ActuatorId,
        start: RegisterAddress,
        length: u8,
    ) -> Result<Vec<u8>, DriverError> {
        if target.is_broadcast() {
            return Err(ProtocolError::InvalidValue {
                field: "target".to_string(),
                value: i64::from(target.raw()),
            }
            .into());
        }
        debug!("get_reg {} @{} len={}", target, start, length);

        let reply = self.exchange(|t| {
            let reply = t.read_registers(target, start, length)?;
            if reply.status.is_ok() && reply.data.len() != length as usize {
                return Err(TransportError::FrameCorrupt(ProtocolError::InvalidLength {
                    expected: length as usize,
                    actual: reply.data.len(),
                }));
            }
            Ok(reply)
        })?;

        if !reply.status.is_ok() {
            return Err(DriverError::Actuator {
                id: target,
                status: reply.status,
            });
        }
        Ok(reply.data)
    }

    /// SYNC_WRITE：一次事务写多个舵机的同一寄存器区间
    ///
    /// 批量数据在加锁之前校验，非法时不产生任何 IO。
    pub fn sync_write<I, V>(&self, start: RegisterAddress, entries: I) -> Result<ErrorStatus, DriverError>
    where
        I: IntoIterator<Item = (ActuatorId, V)>,
        V: Into<Vec<u8>>,
    {
        let batch = SyncWriteBatch::new(entries)?;
        self.sync_write_batch(start, &batch)
    }

    /// SYNC_WRITE（已校验的批量数据）
    pub fn sync_write_batch(
        &self,
        start: RegisterAddress,
        batch: &SyncWriteBatch,
    ) -> Result<ErrorStatus, DriverError> {
        debug!(
            "sync_write @{} {:?}",
            start,
            batch.ids().collect::<Vec<_>>()
        );
        let reply = self.exchange(|t| t.sync_write(start, batch))?;
        Ok(ErrorStatus::from_status(reply.status))
    }

    // ============================================================
    // 便捷指令
    // ============================================================

    /// PING：舵机是否在线
    ///
    /// 超时视为不在线（返回 `Ok(false)`），其他错误照常返回。
    pub fn ping(&self, target: ActuatorId) -> Result<bool, DriverError> {
        if target.is_broadcast() {
            return Err(ProtocolError::InvalidValue {
                field: "target".to_string(),
                value: i64::from(target.raw()),
            }
            .into());
        }
        match self.execute(target, Instruction::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(DriverError::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 依次 PING，返回有应答的舵机
    pub fn scan<I>(&self, ids: I) -> Result<Vec<ActuatorId>, DriverError>
    where
        I: IntoIterator<Item = ActuatorId>,
    {
        let mut found = Vec::new();
        for id in ids {
            if self.ping(id)? {
                found.push(id);
            }
        }
        info!("Scan found {} actuator(s): {:?}", found.len(), found);
        Ok(found)
    }

    /// REG_WRITE：暂存写入，等待 ACTION
    pub fn reg_write(
        &self,
        target: ActuatorId,
        start: RegisterAddress,
        values: &[u8],
    ) -> Result<ErrorStatus, DriverError> {
        let mut params = Vec::with_capacity(values.len() + 1);
        params.push(start);
        params.extend_from_slice(values);
        let reply = self.execute(target, Instruction::RegWrite, &params)?;
        Ok(ErrorStatus::from_status(reply.status))
    }

    /// ACTION：提交暂存写入（通常发往广播 ID）
    pub fn action(&self, target: ActuatorId) -> Result<ErrorStatus, DriverError> {
        let reply = self.execute(target, Instruction::Action, &[])?;
        Ok(ErrorStatus::from_status(reply.status))
    }

    /// RESET：控制表恢复出厂值
    pub fn reset(&self, target: ActuatorId) -> Result<ErrorStatus, DriverError> {
        warn!("Resetting control table of actuator {}", target);
        let reply = self.execute(target, Instruction::Reset, &[])?;
        Ok(ErrorStatus::from_status(reply.status))
    }

    /// 关闭扭矩输出，使舵机可以被手动摆动
    ///
    /// 逐个写入，遇到第一个错误即返回。
    pub fn relax<I>(&self, ids: I) -> Result<ErrorStatus, DriverError>
    where
        I: IntoIterator<Item = ActuatorId>,
    {
        let mut status = ErrorStatus::Ok;
        for id in ids {
            status = self.set_reg(id, TORQUE_ENABLE.address, &[0])?;
        }
        Ok(status)
    }

    // ============================================================
    // 生命周期
    // ============================================================

    /// 释放端点
    ///
    /// 可重复调用，也可在失败之后调用；不改变 `last_error`。
    pub fn close(&self) -> Result<(), DriverError> {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut transport) = guard.transport.take() {
            transport.close()?;
            info!("Driver session closed: {}", self.description);
        }
        Ok(())
    }
}

impl Drop for DriverSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close driver session {}: {}", self.description, e);
        }
    }
}

impl fmt::Debug for DriverSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverSession")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("capabilities", &self.capabilities)
            .field("open", &self.is_open())
            .finish()
    }
}
