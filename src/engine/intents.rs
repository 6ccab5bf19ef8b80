// ==========================================
// 日间活动排班系统 - 人工意图叠加引擎
// ==========================================
// 职责: 把窗口覆盖目标日期的人工意图叠加到当日实例上
// 红线: 未知意图类型记告警跳过, 永不致命;
//       所有写入按自然键幂等
// ==========================================

use crate::domain::calendar::OrgClock;
use crate::domain::overlay::IntentDetails;
use crate::domain::resources::StaffShift;
use crate::engine::{EngineError, EngineResult};
use crate::repository::{
    AllocationRepository, InstanceRepository, IntentRepository, RepositoryResult, ShiftRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(test)]
mod tests;

// ==========================================
// IntentApplySummary - 意图叠加汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentApplySummary {
    pub intents_seen: usize,
    pub participants_added: usize,
    pub participants_removed: usize,
    pub instances_modified: usize, // MODIFY_TIME / CHANGE_VENUE
    pub staff_assigned: usize,
    pub skipped_unknown: usize,     // 未知类型或负载缺字段
    pub skipped_no_instance: usize, // 当日没有对应实例
}

// ==========================================
// IntentApplier - 人工意图叠加引擎
// ==========================================
pub struct IntentApplier {
    conn: Arc<Mutex<Connection>>,
    clock: OrgClock,
}

impl IntentApplier {
    pub fn new(conn: Arc<Mutex<Connection>>, clock: OrgClock) -> Self {
        Self { conn, clock }
    }

    /// 叠加单个日期的意图 (手工入口, 独立事务)
    pub fn apply_for_date(&self, date: NaiveDate) -> EngineResult<IntentApplySummary> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::LockError(e.to_string()))?;
        let tx = conn.transaction().map_err(EngineError::from)?;

        let now_ts = self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string();
        let summary = Self::apply_for_date_tx(&tx, date, &now_ts)?;

        tx.commit().map_err(EngineError::from)?;
        Ok(summary)
    }

    /// 事务内实现 (每日滚动直接调用)
    ///
    /// 前置: 重织已保证当日实例存在 (顺序红线)
    pub fn apply_for_date_tx(
        conn: &Connection,
        date: NaiveDate,
        now_ts: &str,
    ) -> RepositoryResult<IntentApplySummary> {
        let intents = IntentRepository::list_for_date_tx(conn, date)?;
        let mut summary = IntentApplySummary {
            intents_seen: intents.len(),
            ..Default::default()
        };

        for intent in &intents {
            let details = match intent.details() {
                Some(d) => d,
                None => {
                    warn!(
                        intent_id = %intent.intent_id,
                        intent_type = %intent.intent_type,
                        "未知意图类型或负载缺字段, 跳过"
                    );
                    summary.skipped_unknown += 1;
                    continue;
                }
            };

            let instance =
                match InstanceRepository::find_by_rule_date_tx(conn, &intent.rule_id, date)? {
                    Some(inst) => inst,
                    None => {
                        debug!(
                            intent_id = %intent.intent_id,
                            rule_id = %intent.rule_id,
                            %date,
                            "当日无对应实例, 意图跳过"
                        );
                        summary.skipped_no_instance += 1;
                        continue;
                    }
                };

            match details {
                IntentDetails::AddParticipant { participant_id } => {
                    // check-then-insert 幂等
                    if !AllocationRepository::exists_tx(conn, &instance.instance_id, &participant_id)? {
                        AllocationRepository::insert_tx(conn, &instance.instance_id, &participant_id)?;
                        summary.participants_added += 1;
                    }
                }
                IntentDetails::RemoveParticipant { participant_id } => {
                    let removed = AllocationRepository::delete_one_tx(
                        conn,
                        &instance.instance_id,
                        &participant_id,
                    )?;
                    summary.participants_removed += removed;
                }
                IntentDetails::ModifyTime {
                    start_time,
                    end_time,
                } => {
                    InstanceRepository::patch_resolved_tx(
                        conn,
                        &instance.instance_id,
                        start_time,
                        end_time,
                        None,
                        Some(&intent.intent_id),
                        now_ts,
                    )?;
                    summary.instances_modified += 1;
                }
                IntentDetails::ChangeVenue { venue } => {
                    InstanceRepository::patch_resolved_tx(
                        conn,
                        &instance.instance_id,
                        None,
                        None,
                        Some(&venue),
                        Some(&intent.intent_id),
                        now_ts,
                    )?;
                    summary.instances_modified += 1;
                }
                IntentDetails::AssignStaff {
                    staff_id,
                    role,
                    start_time,
                    end_time,
                } => {
                    // 键 (instance, staff), 冲突覆写角色/时间
                    let shift = StaffShift {
                        shift_id: Uuid::new_v4().to_string(),
                        instance_id: instance.instance_id.clone(),
                        staff_id,
                        shift_date: date,
                        role,
                        start_time: start_time.unwrap_or(instance.start_time),
                        end_time: end_time.unwrap_or(instance.end_time),
                    };
                    ShiftRepository::upsert_tx(conn, &shift)?;
                    summary.staff_assigned += 1;
                }
            }
        }

        Ok(summary)
    }
}
