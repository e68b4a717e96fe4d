//! 舵机状态错误位
//!
//! 状态包第 5 字节（ERR）由舵机固件填写，驱动层只透传，不做重新解释。

use bilge::prelude::*;
use std::fmt;

/// 状态包错误字节（位域）
///
/// - Bit 0: 输入电压超出范围
/// - Bit 1: 目标位置超出角度限位
/// - Bit 2: 过热
/// - Bit 3: 指令参数超出范围
/// - Bit 4: 指令包校验和错误
/// - Bit 5: 负载超过最大扭矩
/// - Bit 6: 未定义指令 / 未 REG_WRITE 就 ACTION
/// - Bit 7: 保留
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusError {
    pub input_voltage: bool, // Bit 0
    pub angle_limit: bool,   // Bit 1
    pub overheating: bool,   // Bit 2
    pub range: bool,         // Bit 3
    pub checksum: bool,      // Bit 4
    pub overload: bool,      // Bit 5
    pub instruction: bool,   // Bit 6
    pub reserved: bool,      // Bit 7
}

impl StatusError {
    /// 从原始错误字节构造
    pub fn from_byte(byte: u8) -> Self {
        Self::from(u8::new(byte))
    }

    /// 原始错误字节
    pub fn to_byte(self) -> u8 {
        u8::from(self)
    }

    /// 无错误位
    pub fn is_ok(self) -> bool {
        self.to_byte() == 0
    }

    /// 已置位的错误名称
    pub fn flag_names(self) -> Vec<&'static str> {
        const NAMES: [&str; 8] = [
            "input voltage",
            "angle limit",
            "overheating",
            "range",
            "checksum",
            "overload",
            "instruction",
            "reserved",
        ];
        let byte = self.to_byte();
        NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| byte & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "ok");
        }
        write!(f, "0x{:02X} [{}]", self.to_byte(), self.flag_names().join(", "))
    }
}
