// ==========================================
// 日间活动排班系统 - 活动规则领域模型
// ==========================================
// 规则是声明式的循环模板, 由管理侧维护;
// 引擎只读取, 展开为具体日期的排班实例
// ==========================================

use crate::domain::types::{RecurrencePattern, SlotType, WeekParity};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ProgramRule - 活动规则
// ==========================================
// 对齐: program_rule 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRule {
    pub rule_id: String,
    pub name: String,
    pub recurrence_pattern: RecurrencePattern,
    pub anchor_date: Option<NaiveDate>,   // 锚点日期 (单次/隔周/每月必需或优先)
    pub day_of_week: i32,                 // 0=周一 .. 6=周日
    pub week_parity: Option<WeekParity>,  // 隔周无锚点时的 ISO 周奇偶回退
    pub default_start_time: NaiveTime,
    pub default_end_time: NaiveTime,
    pub default_venue: Option<String>,
    pub requires_transport: bool,
    pub active: bool,
}

// ==========================================
// RuleSlot - 规则子时段
// ==========================================
// 对齐: rule_slot 表
// 子时段是实例卡片的模板, 随每次 resync 全量重建到卡片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSlot {
    pub slot_id: String,
    pub rule_id: String,
    pub seq_no: i32,
    pub slot_type: SlotType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub route_run_no: Option<i32>,
    pub label: String,
}
