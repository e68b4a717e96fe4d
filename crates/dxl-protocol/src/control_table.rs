//! AX-12 控制表
//!
//! 寄存器地址与宽度由舵机固件定义，这里只给出常用地址，驱动层把寄存器内容
//! 当作不透明字节处理。双字节寄存器为小端（`_L` 在前）。

use crate::RegisterAddress;

/// 控制表中的一个寄存器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub address: RegisterAddress,
    pub width: u8,
    pub name: &'static str,
}

impl Register {
    pub const fn new(address: RegisterAddress, width: u8, name: &'static str) -> Self {
        Self {
            address,
            width,
            name,
        }
    }
}

// ============================================================================
// EEPROM 区域（掉电保存）
// ============================================================================

pub const MODEL_NUMBER: Register = Register::new(0, 2, "model_number");
pub const VERSION: Register = Register::new(2, 1, "version");
pub const ID: Register = Register::new(3, 1, "id");
pub const BAUD_RATE: Register = Register::new(4, 1, "baud_rate");
pub const RETURN_DELAY_TIME: Register = Register::new(5, 1, "return_delay_time");
pub const CW_ANGLE_LIMIT: Register = Register::new(6, 2, "cw_angle_limit");
pub const CCW_ANGLE_LIMIT: Register = Register::new(8, 2, "ccw_angle_limit");
pub const LIMIT_TEMPERATURE: Register = Register::new(11, 1, "limit_temperature");
pub const DOWN_LIMIT_VOLTAGE: Register = Register::new(12, 1, "down_limit_voltage");
pub const UP_LIMIT_VOLTAGE: Register = Register::new(13, 1, "up_limit_voltage");
pub const MAX_TORQUE: Register = Register::new(14, 2, "max_torque");
pub const RETURN_LEVEL: Register = Register::new(16, 1, "return_level");
pub const ALARM_LED: Register = Register::new(17, 1, "alarm_led");
pub const ALARM_SHUTDOWN: Register = Register::new(18, 1, "alarm_shutdown");

// ============================================================================
// RAM 区域
// ============================================================================

pub const TORQUE_ENABLE: Register = Register::new(24, 1, "torque_enable");
pub const LED: Register = Register::new(25, 1, "led");
pub const CW_COMPLIANCE_MARGIN: Register = Register::new(26, 1, "cw_compliance_margin");
pub const CCW_COMPLIANCE_MARGIN: Register = Register::new(27, 1, "ccw_compliance_margin");
pub const CW_COMPLIANCE_SLOPE: Register = Register::new(28, 1, "cw_compliance_slope");
pub const CCW_COMPLIANCE_SLOPE: Register = Register::new(29, 1, "ccw_compliance_slope");
pub const GOAL_POSITION: Register = Register::new(30, 2, "goal_position");
pub const MOVING_SPEED: Register = Register::new(32, 2, "moving_speed");
pub const TORQUE_LIMIT: Register = Register::new(34, 2, "torque_limit");
pub const PRESENT_POSITION: Register = Register::new(36, 2, "present_position");
pub const PRESENT_SPEED: Register = Register::new(38, 2, "present_speed");
pub const PRESENT_LOAD: Register = Register::new(40, 2, "present_load");
pub const PRESENT_VOLTAGE: Register = Register::new(42, 1, "present_voltage");
pub const PRESENT_TEMPERATURE: Register = Register::new(43, 1, "present_temperature");
pub const REGISTERED_INSTRUCTION: Register = Register::new(44, 1, "registered_instruction");
pub const MOVING: Register = Register::new(46, 1, "moving");
pub const LOCK: Register = Register::new(47, 1, "lock");
pub const PUNCH: Register = Register::new(48, 2, "punch");

/// 按名称查找的寄存器表
pub const ALL: &[Register] = &[
    MODEL_NUMBER,
    VERSION,
    ID,
    BAUD_RATE,
    RETURN_DELAY_TIME,
    CW_ANGLE_LIMIT,
    CCW_ANGLE_LIMIT,
    LIMIT_TEMPERATURE,
    DOWN_LIMIT_VOLTAGE,
    UP_LIMIT_VOLTAGE,
    MAX_TORQUE,
    RETURN_LEVEL,
    ALARM_LED,
    ALARM_SHUTDOWN,
    TORQUE_ENABLE,
    LED,
    CW_COMPLIANCE_MARGIN,
    CCW_COMPLIANCE_MARGIN,
    CW_COMPLIANCE_SLOPE,
    CCW_COMPLIANCE_SLOPE,
    GOAL_POSITION,
    MOVING_SPEED,
    TORQUE_LIMIT,
    PRESENT_POSITION,
    PRESENT_SPEED,
    PRESENT_LOAD,
    PRESENT_VOLTAGE,
    PRESENT_TEMPERATURE,
    REGISTERED_INSTRUCTION,
    MOVING,
    LOCK,
    PUNCH,
];

/// 按名称查找寄存器（CLI 使用）
pub fn lookup(name: &str) -> Option<Register> {
    let name = name.to_ascii_lowercase().replace('-', "_");
    ALL.iter().copied().find(|r| r.name == name)
}
