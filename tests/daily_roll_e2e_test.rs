// ==========================================
// 每日滚动端到端测试
// ==========================================
// 场景: 规则播种 → 意图/例外 → 窗口滚动 → 资源分配 → 审计
// 基准日 2025-06-02 (周一), 窗口 7 天 → 尾日 2025-06-09 (周一)
// ==========================================

mod test_helpers;

use chrono::Duration;
use day_program_roster::config::SettingsStore;
use day_program_roster::domain::audit::AuditAction;
use day_program_roster::domain::calendar::OrgClock;
use day_program_roster::domain::overlay::OperatorIntent;
use day_program_roster::domain::types::{AuditStatus, InstanceStatus, RecurrencePattern, SlotType, StaffRole};
use day_program_roster::engine::{InstanceSynchronizer, WindowRoller};
use day_program_roster::repository::{
    AuditRepository, CardRepository, InstanceRepository, IntentRepository, ShiftRepository,
    VehicleRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use test_helpers::*;

fn make_roller(conn: &Arc<Mutex<Connection>>) -> WindowRoller {
    let settings = SettingsStore::from_connection(conn.clone()).unwrap();
    WindowRoller::new(conn.clone(), settings, OrgClock::default())
}

/// 完整业务流: 两条规则 + 意图加人 + 员工车辆分配 + 过期清理 + 审计
#[test]
fn test_full_daily_roll_flow() {
    let (_tmp, conn) = create_test_db();
    set_window_days(&conn, 7);

    let today = ymd(2025, 6, 2);
    let window_end = ymd(2025, 6, 9);

    // 周一美术活动, 要求接送, 带两个子时段
    seed_rule(&conn, &RuleBuilder::new("r-art").transport().build());
    seed_slot(&conn, "r-art", 1, SlotType::Pickup, hms(8, 30), hms(9, 0));
    seed_slot(&conn, "r-art", 2, SlotType::Activity, hms(9, 0), hms(15, 0));
    // 隔周周二游泳, 锚点 2025-06-03: 06-09 不开班
    seed_rule(
        &conn,
        &RuleBuilder::new("r-swim")
            .pattern(RecurrencePattern::Fortnightly)
            .day_of_week(1)
            .anchor(ymd(2025, 6, 3))
            .build(),
    );

    // 6 名参与者经意图加入美术活动
    let pids: Vec<String> = (1..=6).map(|i| format!("p{:02}", i)).collect();
    seed_participants(&conn, &pids.iter().map(String::as_str).collect::<Vec<_>>());
    let intent_repo = IntentRepository::new(conn.clone());
    for (i, pid) in pids.iter().enumerate() {
        intent_repo
            .insert(&OperatorIntent {
                intent_id: format!("i{:02}", i + 1),
                rule_id: "r-art".to_string(),
                intent_type: "ADD_PARTICIPANT".to_string(),
                start_date: ymd(2025, 6, 1),
                end_date: ymd(2025, 6, 30),
                payload_json: Some(json!({"participant_id": pid})),
                created_ts: ymd(2025, 6, 1).and_time(hms(8, 0)),
            })
            .unwrap();
    }

    seed_staff(&conn, "lead1", true);
    seed_staff(&conn, "sup1", false);
    seed_vehicle(&conn, "bus-a", 8);

    // 上周一的过期实例, 滚动应清走
    {
        let guard = conn.lock().unwrap();
        InstanceSynchronizer::rethread_date_tx(&guard, today - Duration::days(7), None, "2025-05-26 02:00:00")
            .unwrap();
    }

    let summary = make_roller(&conn).run_roll_for(today).unwrap();
    assert_eq!(summary.window_end, window_end);
    assert_eq!(summary.instances_created, 1); // 只有 r-art 在 06-09 开班
    assert_eq!(summary.cards_written, 2);
    assert_eq!(summary.intents.participants_added, 6);
    assert_eq!(summary.instances_purged, 1);

    let instance_repo = InstanceRepository::new(conn.clone());
    let art = instance_repo
        .find_by_rule_date("r-art", window_end)
        .unwrap()
        .unwrap();
    assert_eq!(art.status, InstanceStatus::Confirmed);
    assert!(instance_repo
        .find_by_rule_date("r-swim", window_end)
        .unwrap()
        .is_none());
    assert!(instance_repo
        .find_by_rule_date("r-art", today - Duration::days(7))
        .unwrap()
        .is_none());

    // 6 人 / 除数 5: 1 带队 + 1 支援
    let shifts = ShiftRepository::new(conn.clone())
        .list_by_instance(&art.instance_id)
        .unwrap();
    assert_eq!(shifts.len(), 2);
    assert_eq!(shifts.iter().filter(|s| s.role == StaffRole::Lead).count(), 1);

    let runs = VehicleRepository::new(conn.clone())
        .list_runs_by_instance(&art.instance_id)
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].vehicle_id, "bus-a");
    assert_eq!(runs[0].passenger_count, 6);

    // 卡片是绝对时刻
    let cards = CardRepository::new(conn.clone())
        .list_by_instance(&art.instance_id)
        .unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].start_at, window_end.and_time(hms(8, 30)));

    let audit = AuditRepository::new(conn.clone())
        .latest_by_action(AuditAction::DailyRoll.as_str())
        .unwrap()
        .unwrap();
    assert_eq!(audit.status, AuditStatus::Success);
}

/// 滚动重复执行不产生重复数据
#[test]
fn test_roll_repeat_has_no_observable_diff() {
    let (_tmp, conn) = create_test_db();
    set_window_days(&conn, 7);
    seed_rule(&conn, &RuleBuilder::new("r1").build());
    seed_staff(&conn, "lead1", true);

    let today = ymd(2025, 6, 2);
    let roller = make_roller(&conn);
    roller.run_roll_for(today).unwrap();
    roller.run_roll_for(today).unwrap();

    let repo = InstanceRepository::new(conn.clone());
    assert_eq!(repo.count_by_date(ymd(2025, 6, 9)).unwrap(), 1);
}

/// 连续两天滚动: 窗口逐日推进
#[test]
fn test_window_advances_day_by_day() {
    let (_tmp, conn) = create_test_db();
    set_window_days(&conn, 7);
    // 每周二规则
    seed_rule(&conn, &RuleBuilder::new("r1").day_of_week(1).build());

    let roller = make_roller(&conn);
    roller.run_roll_for(ymd(2025, 6, 2)).unwrap(); // 尾日 06-09 周一, 不开班
    let repo = InstanceRepository::new(conn.clone());
    assert_eq!(repo.count_by_date(ymd(2025, 6, 10)).unwrap(), 0);

    roller.run_roll_for(ymd(2025, 6, 3)).unwrap(); // 尾日 06-10 周二, 开班
    assert_eq!(repo.count_by_date(ymd(2025, 6, 10)).unwrap(), 1);
}

/// 窗口宽度缺失: 滚动中止且库中无写入
#[test]
fn test_roll_without_window_config_fails_closed() {
    let (_tmp, conn) = create_test_db();
    seed_rule(&conn, &RuleBuilder::new("r1").build());

    assert!(make_roller(&conn).run_roll_for(ymd(2025, 6, 2)).is_err());

    let guard = conn.lock().unwrap();
    let count: i64 = guard
        .query_row("SELECT COUNT(*) FROM schedule_instance", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
