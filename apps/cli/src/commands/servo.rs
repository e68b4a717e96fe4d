//! 舵机维护命令

use super::parse_id;
use crate::connection::ConnectionArgs;
use anyhow::{Result, bail};
use clap::Args;
use dxl_driver::ActuatorId;

/// 关闭扭矩，使舵机可手动摆动
#[derive(Args, Debug)]
pub struct RelaxCommand {
    /// 舵机 ID 列表
    #[arg(value_parser = parse_id, required = true, num_args = 1..)]
    pub ids: Vec<ActuatorId>,
}

impl RelaxCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.open()?;
        let status = session.relax(self.ids.iter().copied())?;
        println!("✅ 已释放 {} 个舵机 ({})", self.ids.len(), status);
        session.close()?;
        Ok(())
    }
}

/// 恢复控制表出厂值
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// 舵机 ID
    #[arg(value_parser = parse_id)]
    pub id: ActuatorId,

    /// 确认执行（出厂值会把 ID 改回 1、波特率改回 1M）
    #[arg(long)]
    pub yes: bool,
}

impl ResetCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        if !self.yes {
            bail!("RESET 会清除舵机 {} 的全部配置，请加 --yes 确认", self.id);
        }
        let session = connection.open()?;
        let status = session.reset(self.id)?;
        println!("✅ 舵机 {} 已复位 ({})", self.id, status);
        session.close()?;
        Ok(())
    }
}
