// ==========================================
// 日间活动排班系统 - 排班实例领域模型
// ==========================================
// 实例 = 一条规则在一个日期上的落地
// 红线: (rule_id, instance_date) 全库唯一;
//       卡片随 resync 全量重建, 不允许残留旧时段配置
// ==========================================

use crate::domain::types::{InstanceStatus, SlotType};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduleInstance - 排班实例
// ==========================================
// 对齐: schedule_instance 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInstance {
    pub instance_id: String,
    pub rule_id: String,
    pub instance_date: NaiveDate,
    pub start_time: NaiveTime,   // 解析后的开始时间 (规则默认值或被叠加层覆写)
    pub end_time: NaiveTime,
    pub venue: Option<String>,
    pub status: InstanceStatus,
    pub status_reason: Option<String>,
    pub modified_by_intent_id: Option<String>,     // 最后一次覆写它的人工意图
    pub cancelled_by_exception_id: Option<String>, // 取消它的单日例外
    pub created_ts: NaiveDateTime,
    pub updated_ts: NaiveDateTime,
}

// ==========================================
// InstanceCard - 实例卡片
// ==========================================
// 对齐: instance_card 表
// 卡片的起止时刻是绝对时刻: instance_date + slot 时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceCard {
    pub card_id: String,
    pub instance_id: String,
    pub seq_no: i32,
    pub card_type: SlotType,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub route_run_no: Option<i32>,
    pub label: String,
}
