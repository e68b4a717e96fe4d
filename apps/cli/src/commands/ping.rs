//! 存活探测命令

use super::parse_id;
use crate::connection::ConnectionArgs;
use anyhow::{Result, bail};
use clap::Args;
use dxl_driver::ActuatorId;

/// PING 单个舵机
#[derive(Args, Debug)]
pub struct PingCommand {
    /// 舵机 ID
    #[arg(value_parser = parse_id)]
    pub id: ActuatorId,
}

impl PingCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.open()?;
        if session.ping(self.id)? {
            println!("✅ 舵机 {} 在线", self.id);
        } else {
            println!("❌ 舵机 {} 无应答 ({})", self.id, session.last_error());
        }
        session.close()?;
        Ok(())
    }
}

/// 扫描一段 ID，报告在线与缺失的舵机
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// 起始 ID
    #[arg(long, default_value_t = 1)]
    pub from: u8,

    /// 结束 ID（含）
    #[arg(long, default_value_t = 18)]
    pub to: u8,
}

impl ScanCommand {
    pub fn ids(&self) -> Result<Vec<ActuatorId>> {
        if self.from > self.to || self.to > ActuatorId::MAX_UNICAST {
            bail!("无效的扫描范围: {}..={}", self.from, self.to);
        }
        (self.from..=self.to)
            .map(|raw| Ok(ActuatorId::new(raw)?))
            .collect()
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let ids = self.ids()?;
        let session = connection.open()?;

        println!("⏳ 扫描 {}..={} ...", self.from, self.to);
        let found = session.scan(ids.iter().copied())?;
        let missing: Vec<_> = ids.into_iter().filter(|id| !found.contains(id)).collect();

        println!("✅ 在线: {:?}", found.iter().map(|id| id.raw()).collect::<Vec<_>>());
        if !missing.is_empty() {
            println!("⚠️  缺失: {:?}", missing.iter().map(|id| id.raw()).collect::<Vec<_>>());
        }
        session.close()?;
        Ok(())
    }
}
