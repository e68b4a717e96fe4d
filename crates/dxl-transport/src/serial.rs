//! 串口总线后端
//!
//! 直接在半双工、单主机的串口总线上收发协议 1.0 帧。每次 `execute` 写出一个
//! 指令包，然后阻塞读取对应的状态包（广播目标除外）。同一时刻总线上只能有一条
//! 指令在途，因此所有方法都要求 `&mut self`。

use crate::{Reply, Transport, TransportError};
use dxl_protocol::packet::{HEADER, PREAMBLE_LEN};
use dxl_protocol::{ActuatorId, Instruction, InstructionPacket, ProtocolError, StatusPacket};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 默认应答超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// 串口链路
///
/// 在 `Read + Write` 之上增加一个丢弃接收缓冲的钩子，
/// 用于在发送新指令前清掉上一次残留的字节。
pub trait BusLink: Read + Write + Send {
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "serial")]
impl BusLink for Box<dyn serialport::SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// 应答策略
///
/// 发往广播 ID 的指令所有舵机都会执行，但没有任何舵机应答；
/// 其他目标必须应答一个状态包。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPolicy {
    /// 写完即返回
    NoReply,
    /// 阻塞读取一个状态包
    StatusPacket,
}

impl ReplyPolicy {
    pub fn for_target(target: ActuatorId) -> Self {
        if target.is_broadcast() {
            ReplyPolicy::NoReply
        } else {
            ReplyPolicy::StatusPacket
        }
    }
}

/// 串口总线驱动
pub struct SerialBus<L: BusLink> {
    link: Option<L>,
    name: String,
    timeout: Duration,
}

#[cfg(feature = "serial")]
impl SerialBus<Box<dyn serialport::SerialPort>> {
    /// 打开串口
    ///
    /// 打开失败在构造时立即返回 `TransportError::Connection`，不会推迟到第一次读写。
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let link = serialport::new(port, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| {
                TransportError::Connection(format!("failed to open {}: {}", port, e))
            })?;

        info!("Serial bus opened: {} @ {}", port, baud_rate);
        Ok(Self::with_link(
            link,
            format!("{} @ {}", port, baud_rate),
            timeout,
        ))
    }
}

/// 列出可用串口
#[cfg(feature = "serial")]
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    let ports = serialport::available_ports()
        .map_err(|e| TransportError::Connection(format!("failed to enumerate ports: {}", e)))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

impl<L: BusLink> SerialBus<L> {
    /// 使用已打开的链路构造
    pub fn with_link(link: L, name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            link: Some(link),
            name: name.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// 发送一个指令包并按应答策略等待状态包
    pub fn transact(&mut self, packet: &InstructionPacket) -> Result<Reply, TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::Closed)?;

        link.discard_input()?;
        let frame = packet.encode();
        trace!("TX {:02X?}", frame);
        link.write_all(&frame)?;
        link.flush()?;

        match ReplyPolicy::for_target(packet.id()) {
            ReplyPolicy::NoReply => Ok(Reply::default()),
            ReplyPolicy::StatusPacket => {
                let status = read_status_packet(link, self.timeout)?;
                status
                    .expect_id(packet.id())
                    .map_err(TransportError::FrameCorrupt)?;
                if !status.error.is_ok() {
                    warn!("Actuator {} reported {}", packet.id(), status.error);
                }
                Ok(Reply::new(status.error, status.params))
            },
        }
    }
}

impl<L: BusLink> Transport for SerialBus<L> {
    fn execute(
        &mut self,
        target: ActuatorId,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<Reply, TransportError> {
        debug!("{} -> {} {:?}", instruction, target, params);
        let packet = InstructionPacket::new(target, instruction, params.to_vec())?;
        self.transact(&packet)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.link.take().is_some() {
            info!("Serial bus closed: {}", self.name);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// 在截止时间前读满 `buf`
fn read_full<L: BusLink>(link: &mut L, buf: &mut [u8], deadline: Instant) -> Result<(), TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        if Instant::now() >= deadline {
            return Err(TransportError::Timeout);
        }
        match link.read(&mut buf[filled..]) {
            Ok(0) => std::thread::yield_now(),
            Ok(n) => filled += n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            },
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(())
}

/// 读取一个状态包
///
/// 跳过帧头之前的噪声字节，按 LEN 字段读取剩余部分，再整体校验。
/// 校验失败返回 `FrameCorrupt`，本层不重试。
fn read_status_packet<L: BusLink>(
    link: &mut L,
    timeout: Duration,
) -> Result<StatusPacket, TransportError> {
    let deadline = Instant::now() + timeout;
    let mut byte = [0u8; 1];

    // 同步到 FF FF
    let mut prev = 0u8;
    loop {
        read_full(link, &mut byte, deadline)?;
        if prev == HEADER[0] && byte[0] == HEADER[1] {
            break;
        }
        prev = byte[0];
    }

    // 连续的 0xFF 仍属于帧头
    let mut id = HEADER[1];
    while id == HEADER[1] {
        read_full(link, &mut byte, deadline)?;
        id = byte[0];
    }

    read_full(link, &mut byte, deadline)?;
    let len = byte[0];
    if len < 2 {
        return Err(TransportError::FrameCorrupt(ProtocolError::InvalidLength {
            expected: PREAMBLE_LEN + 2,
            actual: PREAMBLE_LEN + len as usize,
        }));
    }

    let mut frame = Vec::with_capacity(StatusPacket::frame_len(len));
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.push(len);
    frame.resize(StatusPacket::frame_len(len), 0);
    read_full(link, &mut frame[PREAMBLE_LEN..], deadline)?;
    trace!("RX {:02X?}", frame);

    StatusPacket::decode(&frame).map_err(TransportError::FrameCorrupt)
}
