//! 驱动层测试基础设施
//!
//! - [`FakeServoBus`]：内存串口链路，按协议 1.0 解析指令包并模拟舵机应答
//! - [`FakeProxy`]：请求/应答通道，模拟持有总线的远端进程

#![allow(dead_code)]

use dxl_driver::{Capabilities, DriverSession, TransportKind};
use dxl_protocol::packet::PREAMBLE_LEN;
use dxl_protocol::{ActuatorId, Instruction, InstructionPacket, StatusError, StatusPacket, proxy};
use dxl_transport::{BusLink, QueueProxy, RequestChannel, SerialBus, TransportError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 测试用应答超时
pub const TEST_TIMEOUT: Duration = Duration::from_millis(20);

pub fn id(raw: u8) -> ActuatorId {
    ActuatorId::new(raw).unwrap()
}

/// 模拟的舵机群：寄存器内存 + 暂存写入
#[derive(Default)]
pub struct ServoBank {
    pub online: HashSet<u8>,
    pub registers: HashMap<(u8, u8), u8>,
    pub pending: HashMap<u8, (u8, Vec<u8>)>,
    /// 所有应答附带的错误字节
    pub error_byte: u8,
}

impl ServoBank {
    pub fn with_online(ids: &[u8]) -> Self {
        Self {
            online: ids.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn register(&self, id: u8, address: u8) -> u8 {
        self.registers.get(&(id, address)).copied().unwrap_or(0)
    }

    fn store(&mut self, id: u8, address: u8, values: &[u8]) {
        for (offset, value) in values.iter().enumerate() {
            self.registers.insert((id, address + offset as u8), *value);
        }
    }

    fn targets(&self, id: u8) -> Vec<u8> {
        if id == ActuatorId::BROADCAST.raw() {
            self.online.iter().copied().collect()
        } else if self.online.contains(&id) {
            vec![id]
        } else {
            Vec::new()
        }
    }

    /// 执行一条指令，返回应答数据（`None` 表示没有舵机应答）
    pub fn apply(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Option<Vec<u8>> {
        let targets = self.targets(id);
        match instruction {
            Instruction::Ping => {},
            Instruction::ReadData => {
                let (address, length) = (params[0], params[1]);
                let data = (0..length).map(|i| self.register(id, address + i)).collect();
                return self.online.contains(&id).then_some(data);
            },
            Instruction::WriteData => {
                for target in &targets {
                    self.store(*target, params[0], &params[1..]);
                }
            },
            Instruction::RegWrite => {
                for target in &targets {
                    self.pending.insert(*target, (params[0], params[1..].to_vec()));
                }
            },
            Instruction::Action => {
                for target in &targets {
                    if let Some((address, values)) = self.pending.remove(target) {
                        self.store(*target, address, &values);
                    }
                }
            },
            Instruction::Reset => {
                for target in &targets {
                    self.registers.retain(|(owner, _), _| owner != target);
                }
            },
            Instruction::SyncWrite => {
                let (address, width) = (params[0], params[1] as usize);
                for chunk in params[2..].chunks(width + 1) {
                    if self.online.contains(&chunk[0]) {
                        self.store(chunk[0], address, &chunk[1..]);
                    }
                }
            },
        }
        self.online.contains(&id).then(Vec::new)
    }
}

// ============================================================
// 串口总线
// ============================================================

#[derive(Default)]
pub struct BusState {
    pub bank: ServoBank,
    pub tx: Vec<u8>,
    pub frames: Vec<Vec<u8>>,
    pub rx: VecDeque<u8>,
    /// 下一个应答的校验和取反
    pub corrupt_next: bool,
}

/// 内存串口链路，写入的指令包立即由模拟舵机处理
#[derive(Clone, Default)]
pub struct FakeServoBus {
    pub state: Arc<Mutex<BusState>>,
}

impl FakeServoBus {
    pub fn new(online: &[u8]) -> Self {
        let bus = Self::default();
        bus.state.lock().unwrap().bank = ServoBank::with_online(online);
        bus
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn register(&self, id: u8, address: u8) -> u8 {
        self.state.lock().unwrap().bank.register(id, address)
    }

    pub fn set_error_byte(&self, byte: u8) {
        self.state.lock().unwrap().bank.error_byte = byte;
    }

    pub fn corrupt_next_reply(&self) {
        self.state.lock().unwrap().corrupt_next = true;
    }

    /// 用这条链路构造一个串口会话
    pub fn session(&self) -> DriverSession {
        let bus = SerialBus::with_link(self.clone(), "fake @ 1000000", TEST_TIMEOUT);
        DriverSession::from_transport(
            TransportKind::Serial,
            bus,
            Capabilities {
                interpolation: false,
                direct: true,
            },
        )
    }
}

impl BusState {
    fn process_tx(&mut self) {
        while self.tx.len() >= PREAMBLE_LEN {
            let frame_len = PREAMBLE_LEN + self.tx[3] as usize;
            if self.tx.len() < frame_len {
                return;
            }
            let frame: Vec<u8> = self.tx.drain(..frame_len).collect();
            self.frames.push(frame.clone());

            let packet = InstructionPacket::decode(&frame).unwrap();
            let raw_id = packet.id().raw();
            if let Some(data) = self.bank.apply(raw_id, packet.instruction(), packet.params()) {
                let status =
                    StatusPacket::new(packet.id(), StatusError::from_byte(self.bank.error_byte), data);
                let mut bytes = status.encode().unwrap();
                if self.corrupt_next {
                    self.corrupt_next = false;
                    let last = bytes.len() - 1;
                    bytes[last] = !bytes[last];
                }
                self.rx.extend(bytes);
            }
        }
    }
}

impl Read for FakeServoBus {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.rx.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(state.rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.rx.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for FakeServoBus {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.tx.extend_from_slice(buf);
        state.process_tx();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl BusLink for FakeServoBus {
    fn discard_input(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().rx.clear();
        Ok(())
    }
}

// ============================================================
// 消息队列代理
// ============================================================

#[derive(Default)]
pub struct ProxyState {
    pub bank: ServoBank,
    /// 解码后的请求，按到达顺序
    pub requests: Vec<Vec<i64>>,
    /// 下一次读取应答少返回一个字节
    pub truncate_next_read: bool,
    pub closed: usize,
}

/// 模拟远端总线进程的请求/应答通道
#[derive(Clone, Default)]
pub struct FakeProxy {
    pub state: Arc<Mutex<ProxyState>>,
}

impl FakeProxy {
    pub fn new(online: &[u8]) -> Self {
        let proxy = Self::default();
        proxy.state.lock().unwrap().bank = ServoBank::with_online(online);
        proxy
    }

    pub fn requests(&self) -> Vec<Vec<i64>> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn register(&self, id: u8, address: u8) -> u8 {
        self.state.lock().unwrap().bank.register(id, address)
    }

    pub fn set_error_byte(&self, byte: u8) {
        self.state.lock().unwrap().bank.error_byte = byte;
    }

    pub fn session(&self) -> DriverSession {
        DriverSession::from_transport(
            TransportKind::QueueProxy,
            QueueProxy::new(self.clone()),
            Capabilities {
                interpolation: true,
                direct: false,
            },
        )
    }
}

impl RequestChannel for FakeProxy {
    fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let request = proxy::decode_sequence(payload)?;
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        let bytes: Vec<u8> = request.iter().map(|&v| v as u8).collect();
        let instruction = Instruction::from_code(bytes[0])?;
        let reply = match instruction {
            // [0x03, id, addr, len, values..]
            Instruction::WriteData => {
                let mut params = vec![bytes[2]];
                params.extend_from_slice(&bytes[4..]);
                state.bank.apply(bytes[1], instruction, &params)
            },
            // [0x83, addr, id0, v.., id1, v..]：远端按寄存器表得知宽度，这里按 2 字节处理
            Instruction::SyncWrite => {
                let mut params = vec![bytes[1], 2];
                params.extend_from_slice(&bytes[2..]);
                state.bank.apply(ActuatorId::BROADCAST.raw(), instruction, &params);
                Some(Vec::new())
            },
            _ => state.bank.apply(bytes[1], instruction, &bytes[2..]),
        };

        let Some(mut data) = reply else {
            return Err(TransportError::Timeout);
        };
        if instruction == Instruction::ReadData && state.truncate_next_read {
            state.truncate_next_read = false;
            data.pop();
        }
        let status = StatusError::from_byte(state.bank.error_byte);
        Ok(proxy::encode_reply(status, &data)?)
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed += 1;
    }

    fn describe(&self) -> String {
        "tcp://fake:5000".to_string()
    }
}
