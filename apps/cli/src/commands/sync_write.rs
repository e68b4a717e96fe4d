//! 批量写入命令

use super::{encode_value, parse_id, parse_number, parse_register};
use crate::connection::ConnectionArgs;
use anyhow::{Context, Result};
use clap::Args;
use dxl_driver::{ActuatorId, SyncWriteBatch};
use dxl_protocol::control_table::Register;

/// 一次事务写多个舵机的同一寄存器
#[derive(Args, Debug)]
pub struct SyncWriteCommand {
    /// 寄存器名称或地址
    #[arg(value_parser = parse_register)]
    pub register: Register,

    /// 舵机与写入值，格式 ID:VALUE（可重复）
    #[arg(short, long = "entry", value_parser = parse_entry, required = true)]
    pub entries: Vec<(ActuatorId, u32)>,
}

/// 解析 `ID:VALUE`
pub fn parse_entry(s: &str) -> Result<(ActuatorId, u32)> {
    let (id, value) = s
        .split_once(':')
        .with_context(|| format!("格式应为 ID:VALUE，得到 {}", s))?;
    Ok((parse_id(id)?, parse_number(value)?))
}

impl SyncWriteCommand {
    /// 按寄存器宽度编码并校验批量数据
    pub fn batch(&self) -> Result<SyncWriteBatch> {
        let entries = self
            .entries
            .iter()
            .map(|(id, value)| Ok((*id, encode_value(self.register, *value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(SyncWriteBatch::new(entries)?)
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let batch = self.batch()?;
        let session = connection.open()?;
        let status = session.sync_write_batch(self.register.address, &batch)?;
        println!(
            "✅ {} <- {} 个舵机 ({})",
            self.register.name,
            batch.len(),
            status
        );
        session.close()?;
        Ok(())
    }
}
