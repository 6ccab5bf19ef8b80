// ==========================================
// 日间活动排班系统 - 领域类型定义
// ==========================================
// 红线: 全部取值与数据库一致 (SCREAMING_SNAKE_CASE)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 循环模式 (Recurrence Pattern)
// ==========================================
// 规则在日历上的展开方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrencePattern {
    OneOff,      // 单次
    Weekly,      // 每周
    Fortnightly, // 隔周
    Monthly,     // 每月
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl RecurrencePattern {
    /// 从字符串解析循环模式
    ///
    /// 红线: 未知/缺失模式按 WEEKLY 处理, 不报错
    pub fn parse_or_weekly(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ONE_OFF" => RecurrencePattern::OneOff,
            "WEEKLY" => RecurrencePattern::Weekly,
            "FORTNIGHTLY" => RecurrencePattern::Fortnightly,
            "MONTHLY" => RecurrencePattern::Monthly,
            _ => RecurrencePattern::Weekly,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RecurrencePattern::OneOff => "ONE_OFF",
            RecurrencePattern::Weekly => "WEEKLY",
            RecurrencePattern::Fortnightly => "FORTNIGHTLY",
            RecurrencePattern::Monthly => "MONTHLY",
        }
    }
}

// ==========================================
// 周奇偶 (Week Parity)
// ==========================================
// 隔周规则在没有锚点日期时的回退相位 (按 ISO 周号)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekParity {
    Odd,  // 奇数周
    Even, // 偶数周
}

impl WeekParity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ODD" => Some(WeekParity::Odd),
            "EVEN" => Some(WeekParity::Even),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WeekParity::Odd => "ODD",
            WeekParity::Even => "EVEN",
        }
    }
}

// ==========================================
// 实例状态 (Instance Status)
// ==========================================
// 状态只向 CONFIRMED 或 NEEDS_ATTENTION 推进,
// 不允许被后续的部分运行静默回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Generated,      // 已生成 (待分配资源)
    Confirmed,      // 资源齐备
    NeedsAttention, // 资源缺口, 需人工跟进
    Cancelled,      // 已取消
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl InstanceStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GENERATED" => InstanceStatus::Generated,
            "CONFIRMED" => InstanceStatus::Confirmed,
            "NEEDS_ATTENTION" => InstanceStatus::NeedsAttention,
            "CANCELLED" => InstanceStatus::Cancelled,
            _ => InstanceStatus::Generated, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InstanceStatus::Generated => "GENERATED",
            InstanceStatus::Confirmed => "CONFIRMED",
            InstanceStatus::NeedsAttention => "NEEDS_ATTENTION",
            InstanceStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 时段类型 (Slot Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotType {
    Pickup,   // 接
    Activity, // 活动
    Meal,     // 用餐
    Dropoff,  // 送
    Other,    // 其他
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl SlotType {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PICKUP" => SlotType::Pickup,
            "ACTIVITY" => SlotType::Activity,
            "MEAL" => SlotType::Meal,
            "DROPOFF" => SlotType::Dropoff,
            _ => SlotType::Other,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SlotType::Pickup => "PICKUP",
            SlotType::Activity => "ACTIVITY",
            SlotType::Meal => "MEAL",
            SlotType::Dropoff => "DROPOFF",
            SlotType::Other => "OTHER",
        }
    }
}

// ==========================================
// 员工角色 (Staff Role)
// ==========================================
// 每个实例按参与者人数配置一名带队 + 若干支援
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Lead,    // 带队
    Support, // 支援
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StaffRole {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LEAD" => StaffRole::Lead,
            _ => StaffRole::Support,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            StaffRole::Lead => "LEAD",
            StaffRole::Support => "SUPPORT",
        }
    }
}

// ==========================================
// 参与者分配状态 (Allocation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Active,    // 有效
    Cancelled, // 已取消 (由单日例外标记)
}

impl AllocationStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CANCELLED" => AllocationStatus::Cancelled,
            _ => AllocationStatus::Active,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AllocationStatus::Active => "ACTIVE",
            AllocationStatus::Cancelled => "CANCELLED",
        }
    }
}

// ==========================================
// 审计状态 (Audit Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Warning,
    Error,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AuditStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SUCCESS" => AuditStatus::Success,
            "WARNING" => AuditStatus::Warning,
            _ => AuditStatus::Error,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Warning => "WARNING",
            AuditStatus::Error => "ERROR",
        }
    }
}
