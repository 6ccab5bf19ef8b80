// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、测试数据构建与播种
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use day_program_roster::config::{config_keys, SettingsStore};
use day_program_roster::db;
use day_program_roster::domain::resources::{StaffMember, Vehicle};
use day_program_roster::domain::rule::{ProgramRule, RuleSlot};
use day_program_roster::domain::types::{RecurrencePattern, SlotType, WeekParity};
use day_program_roster::repository::{
    ParticipantRepository, RuleRepository, StaffRepository, VehicleRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件 (需要保持存活)
/// - 共享连接
pub fn create_test_db() -> (NamedTempFile, Arc<Mutex<Connection>>) {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path).unwrap();
    db::init_schema(&conn).unwrap();

    (temp_file, Arc::new(Mutex::new(conn)))
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hms(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 写入全局配置
pub fn set_config(conn: &Arc<Mutex<Connection>>, key: &str, value: &str) {
    SettingsStore::from_connection(conn.clone())
        .unwrap()
        .set_config_value(key, value)
        .unwrap();
}

/// 写入滚动窗口宽度 (大多数测试只需要这一项)
pub fn set_window_days(conn: &Arc<Mutex<Connection>>, days: i64) {
    set_config(conn, config_keys::WINDOW_DAYS, &days.to_string());
}

// ==========================================
// ProgramRule 构建器
// ==========================================

pub struct RuleBuilder {
    rule: ProgramRule,
}

impl RuleBuilder {
    /// 默认: 每周周一 09:00-15:00, 主活动室, 不要求接送
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule: ProgramRule {
                rule_id: rule_id.to_string(),
                name: format!("活动-{}", rule_id),
                recurrence_pattern: RecurrencePattern::Weekly,
                anchor_date: None,
                day_of_week: 0,
                week_parity: None,
                default_start_time: hms(9, 0),
                default_end_time: hms(15, 0),
                default_venue: Some("主活动室".to_string()),
                requires_transport: false,
                active: true,
            },
        }
    }

    pub fn pattern(mut self, pattern: RecurrencePattern) -> Self {
        self.rule.recurrence_pattern = pattern;
        self
    }

    pub fn anchor(mut self, date: NaiveDate) -> Self {
        self.rule.anchor_date = Some(date);
        self
    }

    pub fn day_of_week(mut self, dow: i32) -> Self {
        self.rule.day_of_week = dow;
        self
    }

    pub fn parity(mut self, parity: WeekParity) -> Self {
        self.rule.week_parity = Some(parity);
        self
    }

    pub fn times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.rule.default_start_time = start;
        self.rule.default_end_time = end;
        self
    }

    pub fn venue(mut self, venue: &str) -> Self {
        self.rule.default_venue = Some(venue.to_string());
        self
    }

    pub fn transport(mut self) -> Self {
        self.rule.requires_transport = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.rule.active = false;
        self
    }

    pub fn build(self) -> ProgramRule {
        self.rule
    }
}

// ==========================================
// 播种函数
// ==========================================

pub fn seed_rule(conn: &Arc<Mutex<Connection>>, rule: &ProgramRule) {
    RuleRepository::new(conn.clone()).insert(rule).unwrap();
}

pub fn seed_slot(
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

pub fn seed_staff(conn: &Arc<Mutex<Connection>>, staff_id: &str, can_lead: bool) {
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

pub fn seed_vehicle(conn: &Arc<Mutex<Connection>>, vehicle_id: &str, capacity: i32) {
    VehicleRepository::new(conn.clone())
        .insert(&Vehicle {
            vehicle_id: vehicle_id.to_string(),
            label: format!("车辆-{}", vehicle_id),
            capacity,
            active: true,
        })
        .unwrap();
}

pub fn seed_participants(conn: &Arc<Mutex<Connection>>, ids: &[&str]) {
    let repo = ParticipantRepository::new(conn.clone());
    for id in ids {
        repo.insert(id, &format!("参与者-{}", id)).unwrap();
    }
}
