use super::ResourceAssigner;
use crate::config::RosterSettings;
use crate::domain::calendar::OrgClock;
use crate::domain::types::{InstanceStatus, StaffRole};
use crate::engine::testutil::{
    allocate_participants, hms, materialize, seed_rule, seed_staff, seed_vehicle, test_conn,
    weekly_rule, ymd,
};
use crate::repository::{InstanceRepository, ShiftRepository, VehicleRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// 2025-06-02 是周一
fn monday() -> NaiveDate {
    ymd(2025, 6, 2)
}

fn settings() -> RosterSettings {
    RosterSettings {
        window_days: 14,
        staffing_ratio_divisor: 5,
        vehicle_trigger_threshold: 1,
        tz_offset_minutes: 600,
        roll_time: hms(2, 0),
        verify_time: hms(18, 0),
    }
}

fn make_assigner(conn: &Arc<Mutex<Connection>>) -> ResourceAssigner {
    ResourceAssigner::new(conn.clone(), OrgClock::default())
}

fn instance_status(conn: &Arc<Mutex<Connection>>, rule_id: &str) -> (InstanceStatus, Option<String>) {
    let instance = InstanceRepository::new(conn.clone())
        .find_by_rule_date(rule_id, monday())
        .unwrap()
        .unwrap();
    (instance.status, instance.status_reason)
}

#[test]
fn test_twelve_participants_full_assignment() {
    let conn = test_conn();
    let mut rule = weekly_rule("r1", 0);
    rule.requires_transport = true;
    seed_rule(&conn, &rule);
    let instance_id = materialize(&conn, "r1", monday());

    // 12 人, 除数 5: 1 带队 + ceil(7/5)=2 支援
    allocate_participants(&conn, &instance_id, 12);
    for i in 1..=2 {
        seed_staff(&conn, &format!("lead{}", i), true);
    }
    for i in 1..=3 {
        seed_staff(&conn, &format!("sup{}", i), false);
    }
    seed_vehicle(&conn, "v1", 15);

    let summary = make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(summary.leads_assigned, 1);
    assert_eq!(summary.supports_assigned, 2);
    assert_eq!(summary.vehicle_runs_created, 1);
    assert_eq!(summary.instances_confirmed, 1);

    let shifts = ShiftRepository::new(conn.clone())
        .list_by_instance(&instance_id)
        .unwrap();
    assert_eq!(shifts.len(), 3);
    assert_eq!(
        shifts.iter().filter(|s| s.role == StaffRole::Lead).count(),
        1
    );

    let runs = VehicleRepository::new(conn.clone())
        .list_runs_by_instance(&instance_id)
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].passenger_count, 12);

    let (status, reason) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::Confirmed);
    assert_eq!(reason, None);
}

#[test]
fn test_no_vehicle_flags_attention_but_staff_still_assigned() {
    let conn = test_conn();
    let mut rule = weekly_rule("r1", 0);
    rule.requires_transport = true;
    seed_rule(&conn, &rule);
    let instance_id = materialize(&conn, "r1", monday());

    allocate_participants(&conn, &instance_id, 12);
    seed_staff(&conn, "lead1", true);
    seed_staff(&conn, "sup1", false);
    seed_staff(&conn, "sup2", false);
    // 不播种任何车辆

    let summary = make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(summary.instances_flagged, 1);

    // 员工照常分配, 缺口只针对车辆
    let shifts = ShiftRepository::new(conn.clone())
        .list_by_instance(&instance_id)
        .unwrap();
    assert_eq!(shifts.len(), 3);

    let (status, reason) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::NeedsAttention);
    let reason = reason.unwrap();
    assert!(reason.contains("车辆"), "原因应提到车辆: {}", reason);
    assert!(reason.contains("12"), "原因应提到载客需求: {}", reason);
}

#[test]
fn test_small_group_needs_lead_only() {
    let conn = test_conn();
    seed_rule(&conn, &weekly_rule("r1", 0));
    let instance_id = materialize(&conn, "r1", monday());

    // 4 人 ≤ 除数 5: 只要 1 名带队
    allocate_participants(&conn, &instance_id, 4);
    seed_staff(&conn, "lead1", true);

    let summary = make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(summary.leads_assigned, 1);
    assert_eq!(summary.supports_assigned, 0);

    let (status, _) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::Confirmed);
}

#[test]
fn test_fairness_rotation_prefers_least_recently_assigned() {
    let conn = test_conn();
    // 两条不重叠的规则
    let mut r1 = weekly_rule("r1", 0);
    r1.default_start_time = hms(9, 0);
    r1.default_end_time = hms(10, 0);
    let mut r2 = weekly_rule("r2", 0);
    r2.default_start_time = hms(11, 0);
    r2.default_end_time = hms(12, 0);
    seed_rule(&conn, &r1);
    seed_rule(&conn, &r2);
    let i1 = materialize(&conn, "r1", monday());
    let i2 = materialize(&conn, "r2", monday());
    allocate_participants(&conn, &i1, 1);
    {
        let guard = conn.lock().unwrap();
        crate::repository::AllocationRepository::insert_tx(&guard, &i2, "p01").unwrap();
    }

    seed_staff(&conn, "s1", true);
    seed_staff(&conn, "s2", true);

    make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();

    // 第一个实例按 staff_id 兜底选 s1, 推进其游标后第二个实例轮到 s2
    let repo = ShiftRepository::new(conn.clone());
    let first = repo.list_by_instance(&i1).unwrap();
    let second = repo.list_by_instance(&i2).unwrap();
    assert_eq!(first[0].staff_id, "s1");
    assert_eq!(second[0].staff_id, "s2");
}

#[test]
fn test_overlapping_shift_excludes_staff() {
    let conn = test_conn();
    seed_rule(&conn, &weekly_rule("r1", 0));
    seed_rule(&conn, &weekly_rule("r2", 0)); // 时间完全相同
    let i1 = materialize(&conn, "r1", monday());
    let i2 = materialize(&conn, "r2", monday());
    allocate_participants(&conn, &i1, 1);
    {
        let guard = conn.lock().unwrap();
        crate::repository::AllocationRepository::insert_tx(&guard, &i2, "p01").unwrap();
    }

    // 只有一名可带队员工
    seed_staff(&conn, "s1", true);

    let summary = make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(summary.leads_assigned, 1);
    assert_eq!(summary.instances_flagged, 1);

    // 第二个实例落为 NEEDS_ATTENTION
    let (status, reason) = instance_status(&conn, "r2");
    assert_eq!(status, InstanceStatus::NeedsAttention);
    assert!(reason.unwrap().contains("带队"));
}

#[test]
fn test_empty_instance_stays_generated() {
    let conn = test_conn();
    seed_rule(&conn, &weekly_rule("r1", 0));
    materialize(&conn, "r1", monday());
    seed_staff(&conn, "s1", true);

    let summary = make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(summary.instances_considered, 0);

    let (status, _) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::Generated);
}

#[test]
fn test_needs_attention_is_sticky_across_runs() {
    let conn = test_conn();
    seed_rule(&conn, &weekly_rule("r1", 0));
    let instance_id = materialize(&conn, "r1", monday());
    allocate_participants(&conn, &instance_id, 3);

    // 第一轮: 无员工, 落为 NEEDS_ATTENTION
    let assigner = make_assigner(&conn);
    assigner.assign_for_date(monday(), &settings()).unwrap();
    let (status, _) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::NeedsAttention);

    // 第二轮: 员工到位, 但已标记的实例不再被处理, 留给人工确认
    seed_staff(&conn, "s1", true);
    let second = assigner.assign_for_date(monday(), &settings()).unwrap();
    assert_eq!(second.instances_considered, 0);
    let (status, _) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::NeedsAttention);
}

#[test]
fn test_vehicle_threshold_not_met_is_not_a_shortage() {
    let conn = test_conn();
    let mut rule = weekly_rule("r1", 0);
    rule.requires_transport = true;
    seed_rule(&conn, &rule);
    let instance_id = materialize(&conn, "r1", monday());
    allocate_participants(&conn, &instance_id, 3);
    seed_staff(&conn, "s1", true);

    let mut cfg = settings();
    cfg.vehicle_trigger_threshold = 5;

    let summary = make_assigner(&conn).assign_for_date(monday(), &cfg).unwrap();
    assert_eq!(summary.vehicle_runs_created, 0);

    // 人数未到阈值: 不派车也不算缺口
    let (status, _) = instance_status(&conn, "r1");
    assert_eq!(status, InstanceStatus::Confirmed);
}

#[test]
fn test_smallest_adequate_vehicle_chosen() {
    let conn = test_conn();
    let mut rule = weekly_rule("r1", 0);
    rule.requires_transport = true;
    seed_rule(&conn, &rule);
    let instance_id = materialize(&conn, "r1", monday());
    allocate_participants(&conn, &instance_id, 6);
    seed_staff(&conn, "s1", true);
    seed_staff(&conn, "s2", false);
    seed_vehicle(&conn, "v-small", 4); // 装不下
    seed_vehicle(&conn, "v-mid", 8);
    seed_vehicle(&conn, "v-big", 20);

    make_assigner(&conn).assign_for_date(monday(), &settings()).unwrap();

    let runs = VehicleRepository::new(conn.clone())
        .list_runs_by_instance(&instance_id)
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].vehicle_id, "v-mid");
}
