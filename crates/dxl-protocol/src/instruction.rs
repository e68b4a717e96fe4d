//! 指令集定义
//!
//! 所有传输后端共享同一套指令编码，上层代码因此与传输方式无关。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 协议 1.0 指令
///
/// | 指令 | 参数 | 语义 |
/// |---|---|---|
/// | `Ping` | 无 | 存活探测 |
/// | `ReadData` | (地址, 长度) | 读取寄存器 |
/// | `WriteData` | (地址, 数据) | 立即写入 |
/// | `RegWrite` | (地址, 数据) | 暂存写入，等待 `Action` |
/// | `Action` | 无 | 提交所有暂存写入 |
/// | `Reset` | 无 | 恢复出厂控制表 |
/// | `SyncWrite` | (地址, 批量数据) | 一次事务写多个舵机 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Instruction {
    Ping = 0x01,
    ReadData = 0x02,
    WriteData = 0x03,
    RegWrite = 0x04,
    Action = 0x05,
    Reset = 0x06,
    SyncWrite = 0x83,
}

impl Instruction {
    /// 指令码
    pub fn code(self) -> u8 {
        self.into()
    }

    /// 从指令码解析
    pub fn from_code(code: u8) -> Result<Self, ProtocolError> {
        Self::try_from(code).map_err(|_| ProtocolError::InvalidValue {
            field: "Instruction".to_string(),
            value: code as i64,
        })
    }

    /// 日志中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            Instruction::Ping => "PING",
            Instruction::ReadData => "READ_DATA",
            Instruction::WriteData => "WRITE_DATA",
            Instruction::RegWrite => "REG_WRITE",
            Instruction::Action => "ACTION",
            Instruction::Reset => "RESET",
            Instruction::SyncWrite => "SYNC_WRITE",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.code())
    }
}
