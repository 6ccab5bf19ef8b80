// ==========================================
// 日间活动排班系统 - 排班核对引擎
// ==========================================
// 职责: 独立复核当日排班与滚动健康度
// 红线: 对排班数据只读, 发现问题只留痕不修复;
//       核对自身的结论以审计日志形式落库
// ==========================================

use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::calendar::OrgClock;
use crate::domain::types::AuditStatus;
use crate::engine::recurrence::RecurrenceEvaluator;
use crate::engine::{EngineError, EngineResult};
use crate::repository::{AuditRepository, InstanceRepository, RuleRepository};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};


/// 滚动记录的新鲜度上限 (小时)
const ROLL_FRESHNESS_HOURS: i64 = 24;

// ==========================================
// VerifyReport - 核对报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub verify_date: NaiveDate,
    pub expected_instances: usize, // 按规则计算今天应开班的数量
    pub actual_instances: i64,     // 库中今天的实例数 (含取消)
    pub last_roll_status: Option<String>,
    pub last_roll_ts: Option<String>,
    pub findings: Vec<String>, // 空 = 核对通过
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

// ==========================================
// ScheduleVerifier - 排班核对引擎
// ==========================================
pub struct ScheduleVerifier {
    conn: Arc<Mutex<Connection>>,
    clock: OrgClock,
}

impl ScheduleVerifier {
    pub fn new(conn: Arc<Mutex<Connection>>, clock: OrgClock) -> Self {
        Self { conn, clock }
    }

    /// 每日定时入口: 核对机构时区的"今天"
    pub fn run_verification(&self) -> EngineResult<VerifyReport> {
        self.run_verification_for(self.clock.today())
    }

    /// 核对指定日期的排班与最近一次滚动的健康度
    pub fn run_verification_for(&self, today: NaiveDate) -> EngineResult<VerifyReport> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::LockError(e.to_string()))?;

        let mut findings: Vec<String> = Vec::new();

        // 1. 当日实例数应与"今天开班"的规则数一致
        let rules = RuleRepository::list_active_tx(&conn)?;
        let expected = rules
            .iter()
            .filter(|r| RecurrenceEvaluator::is_active(r, today))
            .count();
        let actual = InstanceRepository::list_by_date_tx(&conn, today)?.len() as i64;
        if actual != expected as i64 {
            findings.push(format!(
                "当日实例数不符: 预期 {} 实际 {}",
                expected, actual
            ));
        }

        // 2. 最近一次每日滚动必须成功且未过期
        let last_roll =
            AuditRepository::latest_by_action_tx(&conn, AuditAction::DailyRoll.as_str())?;
        let (last_roll_status, last_roll_ts) = match &last_roll {
            Some(entry) => {
                if entry.status != AuditStatus::Success {
                    findings.push(format!(
                        "最近一次每日滚动状态为 {}",
                        entry.status.to_db_str()
                    ));
                }
                let age = self.clock.now() - entry.created_ts;
                if age >= Duration::hours(ROLL_FRESHNESS_HOURS) {
                    findings.push(format!(
                        "最近一次每日滚动已超过 {} 小时",
                        ROLL_FRESHNESS_HOURS
                    ));
                }
                (
                    Some(entry.status.to_db_str().to_string()),
                    Some(entry.created_ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                )
            }
            None => {
                findings.push("未找到每日滚动审计记录".to_string());
                (None, None)
            }
        };

        let report = VerifyReport {
            verify_date: today,
            expected_instances: expected,
            actual_instances: actual,
            last_roll_status,
            last_roll_ts,
            findings,
        };

        // 3. 结论留痕: 有发现落 WARNING, 干净落 SUCCESS; 不触碰排班数据
        let status = if report.is_clean() {
            AuditStatus::Success
        } else {
            AuditStatus::Warning
        };
        let entry = AuditLogEntry::new(AuditAction::ScheduleVerify, status)
            .with_details(&report)
            .with_created_ts(self.clock.now());
        AuditRepository::append_tx(&conn, &entry)?;

        if report.is_clean() {
            info!(%today, expected, actual, "排班核对通过");
        } else {
            warn!(%today, findings = ?report.findings, "排班核对发现问题");
        }
        Ok(report)
    }
}
