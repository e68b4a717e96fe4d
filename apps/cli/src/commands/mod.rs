//! 命令定义和实现

pub mod ping;
pub mod ports;
pub mod register;
pub mod servo;
pub mod sync_write;

pub use ping::{PingCommand, ScanCommand};
pub use ports::list_ports;
pub use register::{ReadCommand, WriteCommand};
pub use servo::{RelaxCommand, ResetCommand};
pub use sync_write::SyncWriteCommand;

use anyhow::{Result, anyhow, bail};
use dxl_driver::ActuatorId;
use dxl_protocol::control_table::{self, Register};

/// 解析舵机 ID（0..=253，或 "all"/"broadcast" 表示广播）
pub fn parse_id(s: &str) -> Result<ActuatorId> {
    if matches!(s, "all" | "broadcast") {
        return Ok(ActuatorId::BROADCAST);
    }
    let raw = parse_number(s)?;
    let raw = u8::try_from(raw).map_err(|_| anyhow!("舵机 ID 超出范围: {}", s))?;
    Ok(ActuatorId::new(raw)?)
}

/// 解析寄存器：控制表名称（如 goal_position）或数字地址（宽度按 1 字节）
pub fn parse_register(s: &str) -> Result<Register> {
    if let Some(register) = control_table::lookup(s) {
        return Ok(register);
    }
    let address = parse_number(s).map_err(|_| anyhow!("未知寄存器: {}", s))?;
    let address = u8::try_from(address).map_err(|_| anyhow!("寄存器地址超出范围: {}", s))?;
    Ok(control_table::ALL
        .iter()
        .copied()
        .find(|r| r.address == address)
        .unwrap_or(Register::new(address, 1, "raw")))
}

/// 解析十进制或 0x 前缀的十六进制整数
pub fn parse_number(s: &str) -> Result<u32> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(value)
}

/// 按寄存器宽度编码为小端字节
pub fn encode_value(register: Register, value: u32) -> Result<Vec<u8>> {
    match register.width {
        1 => {
            let byte = u8::try_from(value)
                .map_err(|_| anyhow!("{} 是单字节寄存器，值 {} 超出范围", register.name, value))?;
            Ok(vec![byte])
        },
        2 => {
            let word = u16::try_from(value)
                .map_err(|_| anyhow!("{} 是双字节寄存器，值 {} 超出范围", register.name, value))?;
            Ok(dxl_protocol::u16_to_bytes_le(word).to_vec())
        },
        width => bail!("不支持的寄存器宽度: {}", width),
    }
}
