//! SYNC_WRITE 批量写入
//!
//! 一次总线事务向多个舵机的同一寄存器区间写入各自的数据，
//! 相比逐个 REG_WRITE + ACTION 少 N 条消息。

use crate::{ActuatorId, ProtocolError, RegisterAddress};
use std::collections::HashSet;

/// 批量写入数据
///
/// 不变量（构造时校验）：
/// - 至少包含一个舵机
/// - 所有数据元组宽度相同且非零（即写入的寄存器宽度）
/// - 不包含广播 ID，ID 不重复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWriteBatch {
    width: usize,
    entries: Vec<(ActuatorId, Vec<u8>)>,
}

impl SyncWriteBatch {
    /// 构造并校验批量数据
    pub fn new<I, V>(entries: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = (ActuatorId, V)>,
        V: Into<Vec<u8>>,
    {
        let entries: Vec<(ActuatorId, Vec<u8>)> =
            entries.into_iter().map(|(id, values)| (id, values.into())).collect();

        let Some((_, first)) = entries.first() else {
            return Err(ProtocolError::MalformedBatch("batch is empty".to_string()));
        };
        let width = first.len();
        if width == 0 || width > u8::MAX as usize {
            return Err(ProtocolError::MalformedBatch(format!(
                "register width must be 1..=255, got {}",
                width
            )));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for (id, values) in &entries {
            if values.len() != width {
                return Err(ProtocolError::MalformedBatch(format!(
                    "actuator {} has {} values, expected {}",
                    id,
                    values.len(),
                    width
                )));
            }
            if id.is_broadcast() {
                return Err(ProtocolError::MalformedBatch(
                    "broadcast id cannot be a batch member".to_string(),
                ));
            }
            if !seen.insert(*id) {
                return Err(ProtocolError::MalformedBatch(format!(
                    "actuator {} appears more than once",
                    id
                )));
            }
        }

        Ok(Self { width, entries })
    }

    /// 每个舵机写入的字节数
    pub fn width(&self) -> usize {
        self.width
    }

    /// 舵机数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 总是 `false`（空批量无法构造）
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(ActuatorId, Vec<u8>)] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = ActuatorId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// 展平为 `[id0, v.., id1, v.., ..]`，长度为 `len() * (1 + width())`
    pub fn flatten(&self) -> Vec<u8> {
        let mut flat = Vec::with_capacity(self.len() * (1 + self.width));
        for (id, values) in &self.entries {
            flat.push(id.raw());
            flat.extend_from_slice(values);
        }
        flat
    }

    /// 串口总线 SYNC_WRITE 参数：`[address, width, id0, v.., ..]`
    pub fn native_params(&self, address: RegisterAddress) -> Vec<u8> {
        let mut params = Vec::with_capacity(2 + self.len() * (1 + self.width));
        params.push(address);
        params.push(self.width as u8);
        params.extend(self.flatten());
        params
    }
}
