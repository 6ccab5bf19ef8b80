// ==========================================
// 日间活动排班系统 - 每日窗口滚动引擎
// ==========================================
// 职责: 每日把窗口向前推进一天 (尾部物化 + 头部清理)
// 红线: 单一事务 - 要么全部生效要么全部回滚;
//       配置校验在任何写入之前, 配置错误直接中止;
//       无论成败必须落一条 DAILY_ROLL 审计
// ==========================================
// 顺序: 读配置 → 重织窗口尾日 → 意图 → 例外 → 资源分配 → 清理过期 → 审计 → 提交
// ==========================================

use crate::config::SettingsStore;
use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::calendar::OrgClock;
use crate::domain::types::AuditStatus;
use crate::engine::assigner::{AssignSummary, ResourceAssigner};
use crate::engine::exceptions::{ExceptionApplier, ExceptionApplySummary};
use crate::engine::intents::{IntentApplier, IntentApplySummary};
use crate::engine::rethread::InstanceSynchronizer;
use crate::engine::{EngineError, EngineResult};
use crate::repository::{AuditRepository, InstanceRepository};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info};


// ==========================================
// RollSummary - 单次滚动汇总 (整体作为审计详情落库)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollSummary {
    pub roll_date: NaiveDate,   // 滚动执行日 ("今天")
    pub window_end: NaiveDate,  // 本次物化的窗口尾日
    pub window_days: i64,
    pub instances_created: usize,
    pub instances_upserted: usize,
    pub cards_written: usize,
    pub intents: IntentApplySummary,
    pub exceptions: ExceptionApplySummary,
    pub assignments: AssignSummary,
    pub instances_purged: usize, // 清理的过期实例数
}

// ==========================================
// WindowRoller - 每日窗口滚动引擎
// ==========================================
pub struct WindowRoller {
    conn: Arc<Mutex<Connection>>,
    settings: SettingsStore,
    clock: OrgClock,
}

impl WindowRoller {
    pub fn new(conn: Arc<Mutex<Connection>>, settings: SettingsStore, clock: OrgClock) -> Self {
        Self {
            conn,
            settings,
            clock,
        }
    }

    /// 每日定时入口: 以机构时区的"今天"为基准执行一次滚动
    ///
    /// 手工触发走的也是这条路径, 行为完全一致
    pub fn run_daily_roll(&self) -> EngineResult<RollSummary> {
        self.run_roll_for(self.clock.today())
    }

    /// 以指定基准日执行一次滚动
    ///
    /// 失败时事务整体回滚, 再单独落一条 ERROR 审计后返回错误;
    /// 进程不崩溃, 次日照常重试
    pub fn run_roll_for(&self, today: NaiveDate) -> EngineResult<RollSummary> {
        match self.execute_roll(today) {
            Ok(summary) => {
                info!(
                    roll_date = %summary.roll_date,
                    window_end = %summary.window_end,
                    instances_upserted = summary.instances_upserted,
                    instances_purged = summary.instances_purged,
                    "每日滚动成功"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(%today, error = %e, "每日滚动失败, 事务已回滚");
                self.write_error_audit(today, &e);
                Err(e)
            }
        }
    }

    fn execute_roll(&self, today: NaiveDate) -> EngineResult<RollSummary> {
        // 配置校验先行: 窗口宽度缺失/越界在这里中止, 数据库尚未有任何写入
        let settings = self.settings.load_snapshot()?;
        let window_end = today + Duration::days(settings.window_days);
        let now_ts = self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::LockError(e.to_string()))?;
        let tx = conn.transaction().map_err(EngineError::from)?;

        // 1. 尾部物化: 窗口新纳入的那一天
        let day = InstanceSynchronizer::rethread_date_tx(&tx, window_end, None, &now_ts)?;

        // 2-3. 叠加层: 先意图后例外 (例外语义优先, 所以最后写)
        let intents = IntentApplier::apply_for_date_tx(&tx, window_end, &now_ts)?;
        let exceptions = ExceptionApplier::apply_for_date_tx(&tx, window_end, &now_ts)?;

        // 4. 资源分配
        let assignments = ResourceAssigner::assign_for_date_tx(&tx, window_end, &settings, &now_ts)?;

        // 5. 头部清理: 严格早于今天的实例 (级联带走卡片/班次/车次/分配)
        let instances_purged = InstanceRepository::purge_before_tx(&tx, today)?;

        let summary = RollSummary {
            roll_date: today,
            window_end,
            window_days: settings.window_days,
            instances_created: day.instances_created,
            instances_upserted: day.instances_upserted,
            cards_written: day.cards_written,
            intents,
            exceptions,
            assignments,
            instances_purged,
        };

        // 6. 成功审计与业务写入同事务提交
        let entry = AuditLogEntry::new(AuditAction::DailyRoll, AuditStatus::Success)
            .with_details(&summary)
            .with_created_ts(self.clock.now());
        AuditRepository::append_tx(&tx, &entry)?;

        tx.commit().map_err(EngineError::from)?;
        Ok(summary)
    }

    /// 失败留痕: 业务事务已回滚, 单独提交一条 ERROR 审计
    fn write_error_audit(&self, today: NaiveDate, err: &EngineError) {
        let entry = AuditLogEntry::new(AuditAction::DailyRoll, AuditStatus::Error)
            .with_details(&serde_json::json!({
                "roll_date": today.format("%Y-%m-%d").to_string(),
                "error": err.to_string(),
            }))
            .with_created_ts(self.clock.now());

        match self.conn.lock() {
            Ok(conn) => {
                if let Err(audit_err) = AuditRepository::append_tx(&conn, &entry) {
                    error!(error = %audit_err, "失败审计写入也失败了");
                }
            }
            Err(e) => error!(error = %e, "失败审计写入时锁获取失败"),
        }
    }
}
