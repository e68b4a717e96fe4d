//! 消息队列代理协议
//!
//! 请求和应答都是单个 msgpack 整数数组，无 schema 协商：
//!
//! ```text
//! execute   : [instruction, target, p0, p1, ..]
//! setReg    : [0x03, target, address, len, v0, v1, ..]
//! getReg    : [0x02, target, address, length]
//! syncWrite : [0x83, address, id0, v.., id1, v.., ..]
//!
//! reply     : [error_status, d0, d1, ..]
//! ```
//!
//! 整数使用 msgpack 最紧凑编码，与持有总线的远端进程逐字节兼容。

use crate::{ActuatorId, Instruction, ProtocolError, RegisterAddress, StatusError, SyncWriteBatch};

/// 解码后的代理应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReply {
    pub status: StatusError,
    pub data: Vec<u8>,
}

fn pack(sequence: &[u32]) -> Result<Vec<u8>, ProtocolError> {
    rmp_serde::to_vec(sequence).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// 解码任意整数数组（应答或请求）
pub fn decode_sequence(bytes: &[u8]) -> Result<Vec<i64>, ProtocolError> {
    rmp_serde::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

fn to_byte(field: &str, value: i64) -> Result<u8, ProtocolError> {
    u8::try_from(value).map_err(|_| ProtocolError::InvalidValue {
        field: field.to_string(),
        value,
    })
}

/// 通用指令：`[instruction, target, params..]`
pub fn encode_execute(
    target: ActuatorId,
    instruction: Instruction,
    params: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let mut sequence = Vec::with_capacity(params.len() + 2);
    sequence.push(instruction.code() as u32);
    sequence.push(target.raw() as u32);
    sequence.extend(params.iter().map(|&p| p as u32));
    pack(&sequence)
}

/// 写寄存器：`[WRITE_DATA, target, address, len, values..]`
pub fn encode_write(
    target: ActuatorId,
    address: RegisterAddress,
    values: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let mut sequence = Vec::with_capacity(values.len() + 4);
    sequence.push(Instruction::WriteData.code() as u32);
    sequence.push(target.raw() as u32);
    sequence.push(address as u32);
    sequence.push(values.len() as u32);
    sequence.extend(values.iter().map(|&v| v as u32));
    pack(&sequence)
}

/// 读寄存器：`[READ_DATA, target, address, length]`
pub fn encode_read(
    target: ActuatorId,
    address: RegisterAddress,
    length: u8,
) -> Result<Vec<u8>, ProtocolError> {
    pack(&[
        Instruction::ReadData.code() as u32,
        target.raw() as u32,
        address as u32,
        length as u32,
    ])
}

/// 批量写：`[SYNC_WRITE, address, id0, v.., id1, v.., ..]`
///
/// 展平顺序与串口总线 SYNC_WRITE 参数一致，远端进程可原样转发。
pub fn encode_sync_write(
    address: RegisterAddress,
    batch: &SyncWriteBatch,
) -> Result<Vec<u8>, ProtocolError> {
    let flat = batch.flatten();
    let mut sequence = Vec::with_capacity(flat.len() + 2);
    sequence.push(Instruction::SyncWrite.code() as u32);
    sequence.push(address as u32);
    sequence.extend(flat.iter().map(|&b| b as u32));
    pack(&sequence)
}

/// 编码应答（远端进程 / 测试用）
pub fn encode_reply(status: StatusError, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut sequence = Vec::with_capacity(data.len() + 1);
    sequence.push(status.to_byte() as u32);
    sequence.extend(data.iter().map(|&d| d as u32));
    pack(&sequence)
}

/// 解码应答：首元素为错误状态，其余为数据字节
pub fn decode_reply(bytes: &[u8]) -> Result<ProxyReply, ProtocolError> {
    let sequence = decode_sequence(bytes)?;
    let Some((&status, data)) = sequence.split_first() else {
        return Err(ProtocolError::Decode("empty reply".to_string()));
    };

    let status = StatusError::from_byte(to_byte("error_status", status)?);
    let data = data
        .iter()
        .map(|&d| to_byte("data", d))
        .collect::<Result<Vec<u8>, _>>()?;

    Ok(ProxyReply { status, data })
}
