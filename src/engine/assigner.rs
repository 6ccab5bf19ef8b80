// ==========================================
// 日间活动排班系统 - 资源分配引擎
// ==========================================
// 职责: 为当日 GENERATED 实例贪心分配带队/支援员工与车辆
// 红线: 缺口不抛错, 落为 NEEDS_ATTENTION + 可读 reason;
//       候选顺序固定 (公平轮换 + ID 兜底), 结果确定;
//       不回溯, 不跨实例全局寻优
// ==========================================
// 配比: 需要员工数 = 1 + ceil(max(0, n - divisor) / divisor)
// ==========================================

use crate::config::RosterSettings;
use crate::domain::calendar::OrgClock;
use crate::domain::instance::ScheduleInstance;
use crate::domain::resources::{StaffShift, VehicleRun};
use crate::domain::rule::ProgramRule;
use crate::domain::types::{InstanceStatus, StaffRole};
use crate::engine::{EngineError, EngineResult};
use crate::repository::{
    AllocationRepository, InstanceRepository, RepositoryResult, RuleRepository, ShiftRepository,
    StaffRepository, VehicleRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

#[cfg(test)]
mod tests;

// ==========================================
// AssignSummary - 分配汇总
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignSummary {
    pub instances_considered: usize, // GENERATED 且有有效参与者
    pub leads_assigned: usize,
    pub supports_assigned: usize,
    pub vehicle_runs_created: usize,
    pub instances_confirmed: usize,
    pub instances_flagged: usize, // 落为 NEEDS_ATTENTION
}

// ==========================================
// ResourceAssigner - 资源分配引擎
// ==========================================
pub struct ResourceAssigner {
    conn: Arc<Mutex<Connection>>,
    clock: OrgClock,
}

impl ResourceAssigner {
    pub fn new(conn: Arc<Mutex<Connection>>, clock: OrgClock) -> Self {
        Self { conn, clock }
    }

    /// 为单个日期分配资源 (手工入口, 独立事务)
    pub fn assign_for_date(
        &self,
        date: NaiveDate,
        settings: &RosterSettings,
    ) -> EngineResult<AssignSummary> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::LockError(e.to_string()))?;
        let tx = conn.transaction().map_err(EngineError::from)?;

        let now_ts = self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string();
        let summary = Self::assign_for_date_tx(&tx, date, settings, &now_ts)?;

        tx.commit().map_err(EngineError::from)?;
        Ok(summary)
    }

    /// 事务内实现 (每日滚动直接调用)
    ///
    /// 只处理 GENERATED 实例: 已 CONFIRMED/NEEDS_ATTENTION/CANCELLED 的不再触碰,
    /// 保证状态不被后续运行静默回退
    pub fn assign_for_date_tx(
        conn: &Connection,
        date: NaiveDate,
        settings: &RosterSettings,
        now_ts: &str,
    ) -> RepositoryResult<AssignSummary> {
        let instances = InstanceRepository::list_by_date_tx(conn, date)?;
        let mut summary = AssignSummary::default();

        for instance in &instances {
            if instance.status != InstanceStatus::Generated {
                continue;
            }

            let participant_count =
                AllocationRepository::count_active_tx(conn, &instance.instance_id)?;
            if participant_count == 0 {
                debug!(instance_id = %instance.instance_id, "无有效参与者, 跳过分配");
                continue;
            }

            let rule = RuleRepository::find_by_id_tx(conn, &instance.rule_id)?;
            summary.instances_considered += 1;

            Self::assign_instance(
                conn,
                instance,
                rule.as_ref(),
                participant_count,
                settings,
                date,
                now_ts,
                &mut summary,
            )?;
        }

        info!(
            instances_considered = summary.instances_considered,
            instances_confirmed = summary.instances_confirmed,
            instances_flagged = summary.instances_flagged,
            "资源分配完成"
        );
        Ok(summary)
    }

    /// 单实例分配: 带队 → 支援 → 车辆, 缺口累积到 reason
    #[allow(clippy::too_many_arguments)]
    fn assign_instance(
        conn: &Connection,
        instance: &ScheduleInstance,
        rule: Option<&ProgramRule>,
        participant_count: i64,
        settings: &RosterSettings,
        date: NaiveDate,
        now_ts: &str,
        summary: &mut AssignSummary,
    ) -> RepositoryResult<()> {
        let mut shortages: Vec<String> = Vec::new();

        let divisor = settings.staffing_ratio_divisor.max(1);
        let extra = if participant_count > divisor {
            (participant_count - divisor + divisor - 1) / divisor
        } else {
            0
        };
        let support_needed = extra as usize;

        // 已有班次 (可能来自 ASSIGN_STAFF 意图或上一次重试) 计入需求
        let existing = ShiftRepository::list_by_instance_tx(conn, &instance.instance_id)?;
        let mut assigned_ids: HashSet<String> =
            existing.iter().map(|s| s.staff_id.clone()).collect();
        let has_lead = existing.iter().any(|s| s.role == StaffRole::Lead);
        let mut support_have = existing
            .iter()
            .filter(|s| s.role == StaffRole::Support)
            .count();

        // 当日时间段已被占用的员工
        let busy = ShiftRepository::overlapping_staff_ids_tx(
            conn,
            date,
            instance.start_time,
            instance.end_time,
        )?;

        // ===== 带队 =====
        if !has_lead {
            let candidates = StaffRepository::list_candidates_tx(conn, true)?;
            let pick = candidates
                .iter()
                .find(|c| !busy.contains(&c.staff_id) && !assigned_ids.contains(&c.staff_id));

            match pick {
                Some(staff) => {
                    Self::record_shift(conn, instance, &staff.staff_id, StaffRole::Lead, date)?;
                    assigned_ids.insert(staff.staff_id.clone());
                    summary.leads_assigned += 1;
                }
                None => {
                    shortages.push("缺少可带队员工".to_string());
                }
            }
        }

        // ===== 支援 =====
        if support_have < support_needed {
            let candidates = StaffRepository::list_candidates_tx(conn, false)?;
            for staff in &candidates {
                if support_have >= support_needed {
                    break;
                }
                if busy.contains(&staff.staff_id) || assigned_ids.contains(&staff.staff_id) {
                    continue;
                }
                Self::record_shift(conn, instance, &staff.staff_id, StaffRole::Support, date)?;
                assigned_ids.insert(staff.staff_id.clone());
                support_have += 1;
                summary.supports_assigned += 1;
            }

            if support_have < support_needed {
                shortages.push(format!(
                    "支援员工不足: 需要 {} 名, 实际 {} 名",
                    support_needed, support_have
                ));
            }
        }

        // ===== 车辆 (仅限要求接送的规则) =====
        let requires_transport = rule.map(|r| r.requires_transport).unwrap_or(false);
        if requires_transport
            && participant_count >= settings.vehicle_trigger_threshold
            && !VehicleRepository::has_run_tx(conn, &instance.instance_id)?
        {
            let vehicles = VehicleRepository::list_active_by_capacity_tx(conn)?;
            let busy_vehicles = VehicleRepository::overlapping_vehicle_ids_tx(
                conn,
                date,
                instance.start_time,
                instance.end_time,
            )?;

            // 容量升序: 选刚好装得下的最小车
            let pick = vehicles.iter().find(|v| {
                i64::from(v.capacity) >= participant_count && !busy_vehicles.contains(&v.vehicle_id)
            });

            match pick {
                Some(vehicle) => {
                    let run = VehicleRun {
                        run_id: Uuid::new_v4().to_string(),
                        instance_id: instance.instance_id.clone(),
                        vehicle_id: vehicle.vehicle_id.clone(),
                        run_date: date,
                        passenger_count: participant_count as i32,
                        start_time: instance.start_time,
                        end_time: instance.end_time,
                    };
                    VehicleRepository::insert_run_tx(conn, &run)?;
                    summary.vehicle_runs_created += 1;
                }
                None => {
                    shortages.push(format!("无可用车辆: 需要载客 {} 人", participant_count));
                }
            }
        }

        // ===== 状态推进 =====
        // 任一缺口 → NEEDS_ATTENTION; 全部满足且仍为 GENERATED → CONFIRMED。
        // 本轮一旦标记缺口, 后面的满足步骤不会再抹掉它 (缺口累积后一次性落状态)
        if !shortages.is_empty() {
            InstanceRepository::set_status_tx(
                conn,
                &instance.instance_id,
                InstanceStatus::NeedsAttention,
                Some(&shortages.join("; ")),
                now_ts,
            )?;
            summary.instances_flagged += 1;
        } else {
            InstanceRepository::set_status_tx(
                conn,
                &instance.instance_id,
                InstanceStatus::Confirmed,
                None,
                now_ts,
            )?;
            summary.instances_confirmed += 1;
        }

        Ok(())
    }

    /// 落一条班次并推进公平轮换游标
    fn record_shift(
        conn: &Connection,
        instance: &ScheduleInstance,
        staff_id: &str,
        role: StaffRole,
        date: NaiveDate,
    ) -> RepositoryResult<()> {
        let shift = StaffShift {
            shift_id: Uuid::new_v4().to_string(),
            instance_id: instance.instance_id.clone(),
            staff_id: staff_id.to_string(),
            shift_date: date,
            role,
            start_time: instance.start_time,
            end_time: instance.end_time,
        };
        ShiftRepository::upsert_tx(conn, &shift)?;
        StaffRepository::touch_last_assigned_tx(conn, staff_id, date)?;
        Ok(())
    }
}
