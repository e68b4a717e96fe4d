//! 寄存器读写命令

use super::{encode_value, parse_id, parse_register};
use crate::connection::ConnectionArgs;
use anyhow::{Result, bail};
use clap::Args;
use dxl_driver::ActuatorId;
use dxl_protocol::control_table::Register;

/// 读取寄存器
#[derive(Args, Debug)]
pub struct ReadCommand {
    /// 舵机 ID
    #[arg(value_parser = parse_id)]
    pub id: ActuatorId,

    /// 寄存器名称或地址
    #[arg(value_parser = parse_register)]
    pub register: Register,

    /// 读取字节数（默认取寄存器宽度）
    #[arg(short, long)]
    pub length: Option<u8>,
}

impl ReadCommand {
    pub fn length(&self) -> u8 {
        self.length.unwrap_or(self.register.width)
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        if self.id.is_broadcast() {
            bail!("广播 ID 不会应答，无法读取");
        }
        let session = connection.open()?;
        let data = session.get_reg(self.id, self.register.address, self.length())?;

        match data.as_slice() {
            [byte] => println!("{}[{}] = {}", self.register.name, self.id, byte),
            [lo, hi] => println!(
                "{}[{}] = {}",
                self.register.name,
                self.id,
                dxl_protocol::bytes_to_u16_le([*lo, *hi])
            ),
            bytes => println!("{}[{}] = {:02X?}", self.register.name, self.id, bytes),
        }
        session.close()?;
        Ok(())
    }
}

/// 写入寄存器
#[derive(Args, Debug)]
pub struct WriteCommand {
    /// 舵机 ID（all 表示广播）
    #[arg(value_parser = parse_id)]
    pub id: ActuatorId,

    /// 寄存器名称或地址
    #[arg(value_parser = parse_register)]
    pub register: Register,

    /// 写入值，按寄存器宽度小端编码
    pub value: u32,
}

impl WriteCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let values = encode_value(self.register, self.value)?;
        let session = connection.open()?;
        let status = session.set_reg(self.id, self.register.address, &values)?;
        println!(
            "✅ {}[{}] <- {} ({})",
            self.register.name, self.id, self.value, status
        );
        session.close()?;
        Ok(())
    }
}
