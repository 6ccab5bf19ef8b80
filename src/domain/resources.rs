// ==========================================
// 日间活动排班系统 - 资源领域模型
// ==========================================
// 目录实体 (参与者/员工/车辆) 由外部协作方维护, 引擎只读;
// 派生记录 (分配/班次/车次) 由引擎写入
// ==========================================

use crate::domain::types::{AllocationStatus, StaffRole};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// 目录实体 (只读)
// ==========================================

/// 员工 (staff 表)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub staff_id: String,
    pub full_name: String,
    pub active: bool,
    pub can_lead: bool,
    pub last_assigned_date: Option<NaiveDate>, // 公平轮换的排序键
}

/// 车辆 (vehicle 表)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub label: String,
    pub capacity: i32,
    pub active: bool,
}

// ==========================================
// 派生记录 (引擎写入)
// ==========================================

/// 参与者分配 (participant_allocation 表)
/// 键: (instance_id, participant_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantAllocation {
    pub allocation_id: String,
    pub instance_id: String,
    pub participant_id: String,
    pub status: AllocationStatus,
    pub cancelled_by_exception_id: Option<String>,
}

/// 员工班次 (staff_shift 表)
/// 键: (instance_id, staff_id); 冲突时覆写角色/时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffShift {
    pub shift_id: String,
    pub instance_id: String,
    pub staff_id: String,
    pub shift_date: NaiveDate,
    pub role: StaffRole,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// 车辆班次 (vehicle_run 表)
/// 键: (instance_id, vehicle_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRun {
    pub run_id: String,
    pub instance_id: String,
    pub vehicle_id: String,
    pub run_date: NaiveDate,
    pub passenger_count: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
