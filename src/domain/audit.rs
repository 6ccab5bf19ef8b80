// ==========================================
// 日间活动排班系统 - 审计日志领域模型
// ==========================================
// 红线: 只追加, 永不修改或删除;
//       每次日滚动无论成败都必须留痕
// ==========================================

use crate::domain::types::AuditStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// AuditAction - 审计动作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    DailyRoll,      // 每日窗口滚动
    ManualRethread, // 手工重织一段日期
    ScheduleVerify, // 独立核对
}

impl AuditAction {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::DailyRoll => "DAILY_ROLL",
            AuditAction::ManualRethread => "MANUAL_RETHREAD",
            AuditAction::ScheduleVerify => "SCHEDULE_VERIFY",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DAILY_ROLL" => Some(AuditAction::DailyRoll),
            "MANUAL_RETHREAD" => Some(AuditAction::ManualRethread),
            "SCHEDULE_VERIFY" => Some(AuditAction::ScheduleVerify),
            _ => None,
        }
    }
}

// ==========================================
// AuditLogEntry - 审计日志
// ==========================================
// 对齐: audit_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub audit_id: String,
    pub action: String, // 存储为字符串
    pub details_json: Option<JsonValue>,
    pub status: AuditStatus,
    pub created_ts: NaiveDateTime,
}

impl AuditLogEntry {
    /// 创建新的审计日志
    pub fn new(action: AuditAction, status: AuditStatus) -> Self {
        Self {
            audit_id: uuid::Uuid::new_v4().to_string(),
            action: action.as_str().to_string(),
            details_json: None,
            status,
            created_ts: chrono::Utc::now().naive_utc(),
        }
    }

    /// 设置详情负载 (转换为JSON)
    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details_json = serde_json::to_value(details).ok();
        self
    }

    /// 设置时间戳 (机构时区的本地时刻)
    pub fn with_created_ts(mut self, ts: NaiveDateTime) -> Self {
        self.created_ts = ts;
        self
    }
}
