// ==========================================
// 引擎层测试播种工具
// ==========================================

use crate::domain::resources::{StaffMember, Vehicle};
use crate::domain::rule::{ProgramRule, RuleSlot};
use crate::domain::types::{RecurrencePattern, SlotType};
use crate::engine::rethread::InstanceSynchronizer;
use crate::repository::{
    AllocationRepository, InstanceRepository, ParticipantRepository, RuleRepository,
    StaffRepository, VehicleRepository,
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 测试用的固定"现在"
pub(crate) const NOW_TS: &str = "2025-06-01 12:00:00";

pub(crate) fn test_conn() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()))
}

pub(crate) fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn hms(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 每周规则: 09:00-15:00, 主活动室, 不要求接送
pub(crate) fn weekly_rule(rule_id: &str, day_of_week: i32) -> ProgramRule {
    ProgramRule {
        rule_id: rule_id.to_string(),
        name: format!("活动-{}", rule_id),
        recurrence_pattern: RecurrencePattern::Weekly,
        anchor_date: None,
        day_of_week,
        week_parity: None,
        default_start_time: hms(9, 0),
        default_end_time: hms(15, 0),
        default_venue: Some("主活动室".to_string()),
        requires_transport: false,
        active: true,
    }
}

pub(crate) fn seed_rule(conn: &Arc<Mutex<Connection>>, rule: &ProgramRule) {
    RuleRepository::new(conn.clone()).insert(rule).unwrap();
}

pub(crate) fn seed_slot(
    conn: &Arc<Mutex<Connection>>,
    rule_id: &str,
    seq_no: i32,
    slot_type: SlotType,
    start: NaiveTime,
    end: NaiveTime,
) {
    RuleRepository::new(conn.clone())
        .insert_slot(&RuleSlot {
            slot_id: format!("{}-slot{}", rule_id, seq_no),
            rule_id: rule_id.to_string(),
            seq_no,
            slot_type,
            start_time: start,
            end_time: end,
            route_run_no: None,
            label: format!("时段{}", seq_no),
        })
        .unwrap();
}

pub(crate) fn seed_staff(conn: &Arc<Mutex<Connection>>, staff_id: &str, can_lead: bool) {
    StaffRepository::new(conn.clone())
        .insert(&StaffMember {
            staff_id: staff_id.to_string(),
            full_name: format!("员工-{}", staff_id),
            active: true,
            can_lead,
            last_assigned_date: None,
        })
        .unwrap();
}

pub(crate) fn seed_vehicle(conn: &Arc<Mutex<Connection>>, vehicle_id: &str, capacity: i32) {
    VehicleRepository::new(conn.clone())
        .insert(&Vehicle {
            vehicle_id: vehicle_id.to_string(),
            label: format!("车辆-{}", vehicle_id),
            capacity,
            active: true,
        })
        .unwrap();
}

pub(crate) fn seed_participant(conn: &Arc<Mutex<Connection>>, participant_id: &str) {
    ParticipantRepository::new(conn.clone())
        .insert(participant_id, &format!("参与者-{}", participant_id))
        .unwrap();
}

/// 物化单日实例并返回 instance_id (前提: 规则当日开班)
pub(crate) fn materialize(
    conn: &Arc<Mutex<Connection>>,
    rule_id: &str,
    date: NaiveDate,
) -> String {
    let guard = conn.lock().unwrap();
    InstanceSynchronizer::rethread_date_tx(&guard, date, Some(rule_id), NOW_TS).unwrap();
    InstanceRepository::find_id_tx(&guard, rule_id, date)
        .unwrap()
        .expect("规则当日应开班")
}

/// 播种参与者目录并全部分配到实例
pub(crate) fn allocate_participants(
    conn: &Arc<Mutex<Connection>>,
    instance_id: &str,
    count: usize,
) {
    for i in 1..=count {
        let pid = format!("p{:02}", i);
        seed_participant(conn, &pid);
        let guard = conn.lock().unwrap();
        AllocationRepository::insert_tx(&guard, instance_id, &pid).unwrap();
    }
}
