// ==========================================
// 日间活动排班系统 - 实例重织引擎
// ==========================================
// 职责: 把日期区间内"当日开班"的规则物化为排班实例与卡片
// 红线: 幂等 - 对未变更的区间重跑两遍, 结果无可观测差异;
//       一个日期失败只回滚该日期, 继续处理后续日期;
//       futureOnly 钳制后永不改写"明天之前"的日子
// ==========================================

use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::calendar::OrgClock;
use crate::domain::instance::InstanceCard;
use crate::domain::types::AuditStatus;
use crate::engine::recurrence::RecurrenceEvaluator;
use crate::engine::{EngineError, EngineResult};
use crate::repository::{
    AuditRepository, CardRepository, InstanceRepository, RepositoryResult, RuleRepository,
};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;


// ==========================================
// RethreadSummary - 重织汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RethreadSummary {
    pub dates_processed: usize,   // 成功提交的日期数
    pub dates_failed: usize,      // 回滚跳过的日期数
    pub rules_touched: usize,     // 触达的规则数 (去重)
    pub instances_created: usize, // 新建实例数
    pub instances_upserted: usize, // upsert 总数 (新建+更新)
    pub cards_written: usize,     // 重建卡片数
}

/// 单日重织结果 (事务内)
#[derive(Debug, Clone, Default)]
pub struct DayRethread {
    pub rule_ids: Vec<String>,
    pub instances_created: usize,
    pub instances_upserted: usize,
    pub cards_written: usize,
}

// ==========================================
// InstanceSynchronizer - 实例重织引擎
// ==========================================
pub struct InstanceSynchronizer {
    conn: Arc<Mutex<Connection>>,
    clock: OrgClock,
}

impl InstanceSynchronizer {
    pub fn new(conn: Arc<Mutex<Connection>>, clock: OrgClock) -> Self {
        Self { conn, clock }
    }

    /// 重织一段日期区间 (手工入口)
    ///
    /// 每个日期独立事务: 单日失败回滚该日并继续, 计入 dates_failed。
    ///
    /// # 参数
    /// - `rule_id`: 只重织指定规则 (None 为全部启用规则)
    /// - `future_only`: 把 date_from 钳制到"明天", 已交付的日子不动
    pub fn rethread(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
        rule_id: Option<&str>,
        future_only: bool,
    ) -> EngineResult<RethreadSummary> {
        let mut from = date_from;
        if future_only {
            let tomorrow = self.clock.tomorrow();
            if from < tomorrow {
                debug!(%from, %tomorrow, "futureOnly 钳制起始日期");
                from = tomorrow;
            }
        }

        let mut summary = RethreadSummary::default();
        let mut touched: HashSet<String> = HashSet::new();

        let mut date = from;
        while date <= date_to {
            match self.rethread_single_date(date, rule_id) {
                Ok(day) => {
                    summary.dates_processed += 1;
                    summary.instances_created += day.instances_created;
                    summary.instances_upserted += day.instances_upserted;
                    summary.cards_written += day.cards_written;
                    touched.extend(day.rule_ids);
                }
                Err(e) => {
                    // 单日失败不中断整段区间
                    warn!(%date, error = %e, "重织单日失败, 已回滚该日期");
                    summary.dates_failed += 1;
                }
            }
            date += Duration::days(1);
        }

        summary.rules_touched = touched.len();
        info!(
            dates_processed = summary.dates_processed,
            dates_failed = summary.dates_failed,
            instances_upserted = summary.instances_upserted,
            cards_written = summary.cards_written,
            "重织完成"
        );

        // 手工重织留痕: 有失败日期落 WARNING
        let status = if summary.dates_failed == 0 {
            AuditStatus::Success
        } else {
            AuditStatus::Warning
        };
        let entry = AuditLogEntry::new(AuditAction::ManualRethread, status)
            .with_details(&summary)
            .with_created_ts(self.clock.now());
        match self.conn.lock() {
            Ok(guard) => {
                if let Err(e) = AuditRepository::append_tx(&guard, &entry) {
                    warn!(error = %e, "重织审计写入失败");
                }
            }
            Err(e) => warn!(error = %e, "重织审计写入时锁获取失败"),
        }

        Ok(summary)
    }

    /// 单日重织, 独立事务
    fn rethread_single_date(
        &self,
        date: NaiveDate,
        rule_id: Option<&str>,
    ) -> EngineResult<DayRethread> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::LockError(e.to_string()))?;
        let tx = conn.transaction().map_err(EngineError::from)?;

        let now_ts = self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string();
        let day = Self::rethread_date_tx(&tx, date, rule_id, &now_ts)?;

        tx.commit().map_err(EngineError::from)?;
        Ok(day)
    }

    /// 单日重织的事务内实现 (每日滚动在自己的大事务里直接调用)
    ///
    /// 对当日开班的每条规则:
    /// 1. 按 (rule_id, date) 幂等 upsert 实例 (冲突只更新解析后的时间/场地)
    /// 2. 删除该实例全部卡片, 按规则当前子时段全量重建,
    ///    卡片起止为绝对时刻 date + slot.time
    pub fn rethread_date_tx(
        conn: &Connection,
        date: NaiveDate,
        rule_id: Option<&str>,
        now_ts: &str,
    ) -> RepositoryResult<DayRethread> {
        let rules = match rule_id {
            Some(id) => RuleRepository::find_by_id_tx(conn, id)?
                .into_iter()
                .filter(|r| r.active)
                .collect(),
            None => RuleRepository::list_active_tx(conn)?,
        };

        let mut day = DayRethread::default();

        for rule in &rules {
            if !RecurrenceEvaluator::is_active(rule, date) {
                continue;
            }

            let (instance_id, inserted) = InstanceRepository::upsert_tx(conn, rule, date, now_ts)?;
            day.instances_upserted += 1;
            if inserted {
                day.instances_created += 1;
            }

            // 卡片全量重建: 先删后插, 不残留旧时段配置
            CardRepository::delete_by_instance_tx(conn, &instance_id)?;
            let slots = RuleRepository::slots_for_rule_tx(conn, &rule.rule_id)?;
            let cards: Vec<InstanceCard> = slots
                .iter()
                .map(|slot| InstanceCard {
                    card_id: Uuid::new_v4().to_string(),
                    instance_id: instance_id.clone(),
                    seq_no: slot.seq_no,
                    card_type: slot.slot_type,
                    start_at: date.and_time(slot.start_time),
                    end_at: date.and_time(slot.end_time),
                    route_run_no: slot.route_run_no,
                    label: slot.label.clone(),
                })
                .collect();
            day.cards_written += CardRepository::insert_many_tx(conn, &cards)?;

            day.rule_ids.push(rule.rule_id.clone());
        }

        Ok(day)
    }
}
