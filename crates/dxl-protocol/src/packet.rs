//! 串口总线帧（Dynamixel 协议 1.0）
//!
//! ```text
//! 指令包: FF FF | ID | LEN | INST | P0 .. Pn | CHK
//! 状态包: FF FF | ID | LEN | ERR  | P0 .. Pn | CHK
//!
//! LEN = n + 2
//! CHK = !(ID + LEN + INST/ERR + P0 + .. + Pn) & 0xFF
//! ```
//!
//! 帧格式由舵机厂商定义，必须逐字节一致才能与硬件互通。

use crate::{ActuatorId, Instruction, ProtocolError, RegisterAddress, StatusError, SyncWriteBatch};

/// 帧头
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// 单帧最大参数字节数（LEN 字段为 1 字节，LEN = n + 2）
pub const MAX_PARAMS: usize = 253;

/// 帧头 + ID + LEN 的字节数
pub const PREAMBLE_LEN: usize = 4;

/// 计算校验和（输入为 ID 至最后一个参数）
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn check_param_len(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_PARAMS {
        return Err(ProtocolError::PacketTooLong {
            params: len,
            max: MAX_PARAMS,
        });
    }
    Ok(())
}

/// 编码一个完整帧，`code` 为指令码（指令包）或错误字节（状态包）
fn encode_frame(id: u8, code: u8, params: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PREAMBLE_LEN + 2 + params.len());
    buf.extend_from_slice(&HEADER);
    buf.push(id);
    buf.push((params.len() + 2) as u8);
    buf.push(code);
    buf.extend_from_slice(params);
    buf.push(checksum(&buf[2..]));
    buf
}

/// 解码并校验一个完整帧，返回 (ID, INST/ERR, 参数)
fn decode_frame(bytes: &[u8]) -> Result<(u8, u8, &[u8]), ProtocolError> {
    if bytes.len() < PREAMBLE_LEN + 2 {
        return Err(ProtocolError::InvalidLength {
            expected: PREAMBLE_LEN + 2,
            actual: bytes.len(),
        });
    }
    if bytes[..2] != HEADER {
        return Err(ProtocolError::InvalidHeader([bytes[0], bytes[1]]));
    }

    let len = bytes[3] as usize;
    if len < 2 || bytes.len() != PREAMBLE_LEN + len {
        return Err(ProtocolError::InvalidLength {
            expected: PREAMBLE_LEN + len.max(2),
            actual: bytes.len(),
        });
    }

    let last = bytes.len() - 1;
    let expected = checksum(&bytes[2..last]);
    if bytes[last] != expected {
        return Err(ProtocolError::InvalidChecksum {
            expected,
            actual: bytes[last],
        });
    }

    Ok((bytes[2], bytes[4], &bytes[5..last]))
}

/// 指令包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPacket {
    id: ActuatorId,
    instruction: Instruction,
    params: Vec<u8>,
}

impl InstructionPacket {
    /// 通用构造器
    pub fn new(
        id: ActuatorId,
        instruction: Instruction,
        params: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let params = params.into();
        check_param_len(params.len())?;
        Ok(Self {
            id,
            instruction,
            params,
        })
    }

    /// PING
    pub fn ping(id: ActuatorId) -> Self {
        Self {
            id,
            instruction: Instruction::Ping,
            params: Vec::new(),
        }
    }

    /// READ_DATA: `[address, length]`
    pub fn read(id: ActuatorId, address: RegisterAddress, length: u8) -> Self {
        Self {
            id,
            instruction: Instruction::ReadData,
            params: vec![address, length],
        }
    }

    /// WRITE_DATA: `[address, values..]`
    pub fn write(
        id: ActuatorId,
        address: RegisterAddress,
        values: &[u8],
    ) -> Result<Self, ProtocolError> {
        let mut params = Vec::with_capacity(values.len() + 1);
        params.push(address);
        params.extend_from_slice(values);
        Self::new(id, Instruction::WriteData, params)
    }

    /// REG_WRITE: `[address, values..]`
    pub fn reg_write(
        id: ActuatorId,
        address: RegisterAddress,
        values: &[u8],
    ) -> Result<Self, ProtocolError> {
        let mut params = Vec::with_capacity(values.len() + 1);
        params.push(address);
        params.extend_from_slice(values);
        Self::new(id, Instruction::RegWrite, params)
    }

    /// ACTION
    pub fn action(id: ActuatorId) -> Self {
        Self {
            id,
            instruction: Instruction::Action,
            params: Vec::new(),
        }
    }

    /// RESET
    pub fn reset(id: ActuatorId) -> Self {
        Self {
            id,
            instruction: Instruction::Reset,
            params: Vec::new(),
        }
    }

    /// SYNC_WRITE（发往广播 ID）: `[address, width, id0, v.., id1, v.., ..]`
    pub fn sync_write(
        address: RegisterAddress,
        batch: &SyncWriteBatch,
    ) -> Result<Self, ProtocolError> {
        Self::new(
            ActuatorId::BROADCAST,
            Instruction::SyncWrite,
            batch.native_params(address),
        )
    }

    pub fn id(&self) -> ActuatorId {
        self.id
    }

    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// 编码为线上字节
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.id.raw(), self.instruction.code(), &self.params)
    }

    /// 从线上字节解码（总线另一端/测试用）
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (id, code, params) = decode_frame(bytes)?;
        Ok(Self {
            id: ActuatorId::new(id)?,
            instruction: Instruction::from_code(code)?,
            params: params.to_vec(),
        })
    }
}

/// 状态包（舵机应答）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub error: StatusError,
    pub params: Vec<u8>,
}

impl StatusPacket {
    pub fn new(id: ActuatorId, error: StatusError, params: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.raw(),
            error,
            params: params.into(),
        }
    }

    /// 根据 LEN 字节计算完整帧长度
    pub fn frame_len(len_byte: u8) -> usize {
        PREAMBLE_LEN + len_byte as usize
    }

    /// 编码为线上字节
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        check_param_len(self.params.len())?;
        Ok(encode_frame(self.id, self.error.to_byte(), &self.params))
    }

    /// 解码并校验帧头、长度、校验和
    ///
    /// ID 是否与请求目标一致由调用方校验（见 [`StatusPacket::expect_id`]）。
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (id, error, params) = decode_frame(bytes)?;
        Ok(Self {
            id,
            error: StatusError::from_byte(error),
            params: params.to_vec(),
        })
    }

    /// 校验应答 ID
    pub fn expect_id(&self, expected: ActuatorId) -> Result<(), ProtocolError> {
        if self.id != expected.raw() {
            return Err(ProtocolError::IdMismatch {
                expected: expected.raw(),
                actual: self.id,
            });
        }
        Ok(())
    }
}
