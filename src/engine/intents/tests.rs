use super::IntentApplier;
use crate::domain::calendar::OrgClock;
use crate::domain::overlay::OperatorIntent;
use crate::domain::types::StaffRole;
use crate::engine::testutil::{
    hms, materialize, seed_participant, seed_rule, seed_staff, test_conn, weekly_rule, ymd,
};
use crate::repository::{AllocationRepository, InstanceRepository, IntentRepository, ShiftRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex};

// 2025-06-02 是周一
fn monday() -> NaiveDate {
    ymd(2025, 6, 2)
}

fn seed_intent(
    conn: &Arc<Mutex<Connection>>,
    intent_id: &str,
    intent_type: &str,
    payload: JsonValue,
) -> String {
    IntentRepository::new(conn.clone())
        .insert(&OperatorIntent {
            intent_id: intent_id.to_string(),
            rule_id: "r1".to_string(),
            intent_type: intent_type.to_string(),
            start_date: ymd(2025, 6, 1),
            end_date: ymd(2025, 6, 30),
            payload_json: Some(payload),
            created_ts: ymd(2025, 6, 1).and_time(hms(8, 0)),
        })
        .unwrap()
}

fn setup() -> (Arc<Mutex<Connection>>, String, IntentApplier) {
    let conn = test_conn();
    seed_rule(&conn, &weekly_rule("r1", 0));
    let instance_id = materialize(&conn, "r1", monday());
    let applier = IntentApplier::new(conn.clone(), OrgClock::default());
    (conn, instance_id, applier)
}

#[test]
fn test_add_participant_is_idempotent() {
    let (conn, instance_id, applier) = setup();
    seed_participant(&conn, "p1");
    seed_intent(&conn, "i1", "ADD_PARTICIPANT", json!({"participant_id": "p1"}));

    let summary = applier.apply_for_date(monday()).unwrap();
    assert_eq!(summary.participants_added, 1);

    // 同一意图窗口次日再应用: 分配已存在, 不重复插入
    let again = applier.apply_for_date(monday()).unwrap();
    assert_eq!(again.participants_added, 0);

    let guard = conn.lock().unwrap();
    assert_eq!(
        AllocationRepository::count_active_tx(&guard, &instance_id).unwrap(),
        1
    );
}

#[test]
fn test_remove_participant() {
    let (conn, instance_id, applier) = setup();
    seed_participant(&conn, "p1");
    {
        let guard = conn.lock().unwrap();
        AllocationRepository::insert_tx(&guard, &instance_id, "p1").unwrap();
    }
    seed_intent(&conn, "i1", "REMOVE_PARTICIPANT", json!({"participant_id": "p1"}));

    let summary = applier.apply_for_date(monday()).unwrap();
    assert_eq!(summary.participants_removed, 1);

    let guard = conn.lock().unwrap();
    assert_eq!(
        AllocationRepository::count_active_tx(&guard, &instance_id).unwrap(),
        0
    );
}

#[test]
fn test_modify_time_stamps_intent() {
    let (conn, _instance_id, applier) = setup();
    seed_intent(
        &conn,
        "i1",
        "MODIFY_TIME",
        json!({"start_time": "10:00:00", "end_time": "14:00:00"}),
    );

    let summary = applier.apply_for_date(monday()).unwrap();
    assert_eq!(summary.instances_modified, 1);

    let instance = InstanceRepository::new(conn.clone())
        .find_by_rule_date("r1", monday())
        .unwrap()
        .unwrap();
    assert_eq!(instance.start_time, hms(10, 0));
    assert_eq!(instance.end_time, hms(14, 0));
    assert_eq!(instance.modified_by_intent_id.as_deref(), Some("i1"));
    // 场地不在负载里, 保持规则默认值
    assert_eq!(instance.venue.as_deref(), Some("主活动室"));
}

#[test]
fn test_change_venue() {
    let (conn, _instance_id, applier) = setup();
    seed_intent(&conn, "i1", "CHANGE_VENUE", json!({"venue": "社区中心"}));

    applier.apply_for_date(monday()).unwrap();

    let instance = InstanceRepository::new(conn.clone())
        .find_by_rule_date("r1", monday())
        .unwrap()
        .unwrap();
    assert_eq!(instance.venue.as_deref(), Some("社区中心"));
    assert_eq!(instance.start_time, hms(9, 0));
}

#[test]
fn test_assign_staff_defaults_to_instance_times() {
    let (conn, instance_id, applier) = setup();
    seed_staff(&conn, "s1", true);
    seed_intent(
        &conn,
        "i1",
        "ASSIGN_STAFF",
        json!({"staff_id": "s1", "role": "LEAD"}),
    );

    let summary = applier.apply_for_date(monday()).unwrap();
    assert_eq!(summary.staff_assigned, 1);

    let shifts = ShiftRepository::new(conn.clone())
        .list_by_instance(&instance_id)
        .unwrap();
    assert_eq!(shifts.len(), 1);
    assert_eq!(shifts[0].role, StaffRole::Lead);
    assert_eq!(shifts[0].start_time, hms(9, 0));
    assert_eq!(shifts[0].end_time, hms(15, 0));
}

#[test]
fn test_unknown_intent_type_skipped() {
    let (conn, _instance_id, applier) = setup();
    seed_intent(&conn, "i1", "SWAP_VENUE", json!({"venue": "北馆"}));

    let summary = applier.apply_for_date(monday()).unwrap();
    assert_eq!(summary.intents_seen, 1);
    assert_eq!(summary.skipped_unknown, 1);
    assert_eq!(summary.instances_modified, 0);
}

#[test]
fn test_intent_without_instance_skipped() {
    let (conn, _instance_id, applier) = setup();
    seed_participant(&conn, "p1");
    seed_intent(&conn, "i1", "ADD_PARTICIPANT", json!({"participant_id": "p1"}));

    // 周三没有实例 (规则只在周一开班)
    let summary = applier.apply_for_date(ymd(2025, 6, 4)).unwrap();
    assert_eq!(summary.skipped_no_instance, 1);
    assert_eq!(summary.participants_added, 0);
}
