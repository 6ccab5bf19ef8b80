// ==========================================
// 日间活动排班系统 - 单日例外叠加引擎
// ==========================================
// 职责: 把日期恰好匹配的取消/覆写叠加到当日实例上
// 红线: 未知例外类型记告警跳过, 永不致命;
//       取消必须盖上例外ID痕迹
// ==========================================

use crate::domain::calendar::OrgClock;
use crate::domain::overlay::ExceptionDetails;
use crate::engine::{EngineError, EngineResult};
use crate::repository::{
    AllocationRepository, ExceptionRepository, InstanceRepository, RepositoryResult,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};


// ==========================================
// ExceptionApplySummary - 例外叠加汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionApplySummary {
    pub exceptions_seen: usize,
    pub participants_cancelled: usize,
    pub instances_cancelled: usize,
    pub instances_patched: usize, // ONE_OFF_CHANGE
    pub skipped_unknown: usize,
    pub skipped_no_instance: usize,
}

// ==========================================
// ExceptionApplier - 单日例外叠加引擎
// ==========================================
pub struct ExceptionApplier {
    conn: Arc<Mutex<Connection>>,
    clock: OrgClock,
}

impl ExceptionApplier {
    pub fn new(conn: Arc<Mutex<Connection>>, clock: OrgClock) -> Self {
        Self { conn, clock }
    }

    /// 叠加单个日期的例外 (手工入口, 独立事务)
    pub fn apply_for_date(&self, date: NaiveDate) -> EngineResult<ExceptionApplySummary> {
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
    pub fn apply_for_date_tx(
        conn: &Connection,
        date: NaiveDate,
        now_ts: &str,
    ) -> RepositoryResult<ExceptionApplySummary> {
        let exceptions = ExceptionRepository::list_for_date_tx(conn, date)?;
        let mut summary = ExceptionApplySummary {
            exceptions_seen: exceptions.len(),
            ..Default::default()
        };

        for exception in &exceptions {
            let details = match exception.details() {
                Some(d) => d,
                None => {
                    warn!(
                        exception_id = %exception.exception_id,
                        exception_type = %exception.exception_type,
                        "未知例外类型或负载缺字段, 跳过"
                    );
                    summary.skipped_unknown += 1;
                    continue;
                }
            };

            let instance =
                match InstanceRepository::find_by_rule_date_tx(conn, &exception.rule_id, date)? {
                    Some(inst) => inst,
                    None => {
                        debug!(
                            exception_id = %exception.exception_id,
                            rule_id = %exception.rule_id,
                            %date,
                            "当日无对应实例, 例外跳过"
                        );
                        summary.skipped_no_instance += 1;
                        continue;
                    }
                };

            match details {
                ExceptionDetails::ParticipantCancellation { participant_id } => {
                    let cancelled = AllocationRepository::cancel_one_tx(
                        conn,
                        &instance.instance_id,
                        &participant_id,
                        &exception.exception_id,
                    )?;
                    summary.participants_cancelled += cancelled;
                }
                ExceptionDetails::ProgramCancellation { reason } => {
                    InstanceRepository::cancel_tx(
                        conn,
                        &instance.instance_id,
                        &exception.exception_id,
                        reason.as_deref(),
                        now_ts,
                    )?;
                    summary.instances_cancelled += 1;
                }
                ExceptionDetails::OneOffChange {
                    start_time,
                    end_time,
                    venue,
                } => {
                    // 只覆写负载中出现的字段子集, 不盖意图痕迹
                    InstanceRepository::patch_resolved_tx(
                        conn,
                        &instance.instance_id,
                        start_time,
                        end_time,
                        venue.as_deref(),
                        None,
                        now_ts,
                    )?;
                    summary.instances_patched += 1;
                }
            }
        }

        Ok(summary)
    }
}
