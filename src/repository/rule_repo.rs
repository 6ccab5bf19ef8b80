// ==========================================
// 日间活动排班系统 - 活动规则仓储
// ==========================================
// 红线: Repository 不做业务逻辑, 只做数据映射
// 规则/子时段由管理侧 CRUD, 引擎侧只读;
// 写入方法供管理接口与测试播种使用
// ==========================================

use crate::domain::rule::{ProgramRule, RuleSlot};
use crate::domain::types::{RecurrencePattern, SlotType, WeekParity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct RuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RuleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作 (管理侧/测试播种)
    // ==========================================

    /// 插入活动规则
    pub fn insert(&self, rule: &ProgramRule) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, rule)
    }

    pub fn insert_tx(conn: &Connection, rule: &ProgramRule) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO program_rule (
                rule_id, name, recurrence_pattern, anchor_date, day_of_week,
                week_parity, default_start_time, default_end_time, default_venue,
                requires_transport, active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                rule.rule_id,
                rule.name,
                rule.recurrence_pattern.to_db_str(),
                rule.anchor_date.map(|d| d.format("%Y-%m-%d").to_string()),
                rule.day_of_week,
                rule.week_parity.map(|p| p.to_db_str()),
                rule.default_start_time.format("%H:%M:%S").to_string(),
                rule.default_end_time.format("%H:%M:%S").to_string(),
                rule.default_venue,
                if rule.requires_transport { 1 } else { 0 },
                if rule.active { 1 } else { 0 },
            ],
        )?;
        Ok(rule.rule_id.clone())
    }

    /// 插入规则子时段
    pub fn insert_slot(&self, slot: &RuleSlot) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO rule_slot (
                slot_id, rule_id, seq_no, slot_type, start_time, end_time,
                route_run_no, label
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                slot.slot_id,
                slot.rule_id,
                slot.seq_no,
                slot.slot_type.to_db_str(),
                slot.start_time.format("%H:%M:%S").to_string(),
                slot.end_time.format("%H:%M:%S").to_string(),
                slot.route_run_no,
                slot.label,
            ],
        )?;
        Ok(slot.slot_id.clone())
    }

    /// 删除规则的全部子时段 (管理侧改配置后重建)
    pub fn delete_slots(&self, rule_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM rule_slot WHERE rule_id = ?1",
            params![rule_id],
        )?;
        Ok(rows)
    }

    /// 启用/停用规则
    pub fn set_active(&self, rule_id: &str, active: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE program_rule SET active = ?2 WHERE rule_id = ?1",
            params![rule_id, if active { 1 } else { 0 }],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询全部启用规则 (引擎展开用)
    pub fn list_active(&self) -> RepositoryResult<Vec<ProgramRule>> {
        let conn = self.get_conn()?;
        Self::list_active_tx(&conn)
    }

    pub fn list_active_tx(conn: &Connection) -> RepositoryResult<Vec<ProgramRule>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, name, recurrence_pattern, anchor_date, day_of_week,
                   week_parity, default_start_time, default_end_time, default_venue,
                   requires_transport, active
            FROM program_rule
            WHERE active = 1
            ORDER BY rule_id
            "#,
        )?;

        let rules = stmt
            .query_map([], Self::map_rule_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rules)
    }

    /// 按 rule_id 查询单条规则 (不限启用状态)
    pub fn find_by_id_tx(conn: &Connection, rule_id: &str) -> RepositoryResult<Option<ProgramRule>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, name, recurrence_pattern, anchor_date, day_of_week,
                   week_parity, default_start_time, default_end_time, default_venue,
                   requires_transport, active
            FROM program_rule
            WHERE rule_id = ?
            "#,
        )?;

        match stmt.query_row(params![rule_id], Self::map_rule_row) {
            Ok(rule) => Ok(Some(rule)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询规则的子时段 (按 seq_no 升序)
    pub fn slots_for_rule_tx(conn: &Connection, rule_id: &str) -> RepositoryResult<Vec<RuleSlot>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT slot_id, rule_id, seq_no, slot_type, start_time, end_time,
                   route_run_no, label
            FROM rule_slot
            WHERE rule_id = ?
            ORDER BY seq_no
            "#,
        )?;

        let slots = stmt
            .query_map(params![rule_id], Self::map_slot_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(slots)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_rule_row(row: &Row) -> SqliteResult<ProgramRule> {
        let pattern_str: String = row.get(2)?;
        let anchor_str: Option<String> = row.get(3)?;
        let parity_str: Option<String> = row.get(5)?;
        let start_str: String = row.get(6)?;
        let end_str: String = row.get(7)?;

        Ok(ProgramRule {
            rule_id: row.get(0)?,
            name: row.get(1)?,
            recurrence_pattern: RecurrencePattern::parse_or_weekly(&pattern_str),
            anchor_date: anchor_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            day_of_week: row.get(4)?,
            week_parity: parity_str.and_then(|s| WeekParity::from_str(&s)),
            default_start_time: parse_time(&start_str, 6)?,
            default_end_time: parse_time(&end_str, 7)?,
            default_venue: row.get(8)?,
            requires_transport: row.get::<_, i64>(9)? != 0,
            active: row.get::<_, i64>(10)? != 0,
        })
    }

    fn map_slot_row(row: &Row) -> SqliteResult<RuleSlot> {
        let type_str: String = row.get(3)?;
        let start_str: String = row.get(4)?;
        let end_str: String = row.get(5)?;

        Ok(RuleSlot {
            slot_id: row.get(0)?,
            rule_id: row.get(1)?,
            seq_no: row.get(2)?,
            slot_type: SlotType::from_str(&type_str),
            start_time: parse_time(&start_str, 4)?,
            end_time: parse_time(&end_str, 5)?,
            route_run_no: row.get(6)?,
            label: row.get(7)?,
        })
    }
}

/// 解析 %H:%M:%S 时间列
pub(crate) fn parse_time(s: &str, col: usize) -> SqliteResult<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 解析 %Y-%m-%d 日期列
pub(crate) fn parse_date(s: &str, col: usize) -> SqliteResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 解析 %Y-%m-%d %H:%M:%S 时间戳列
pub(crate) fn parse_datetime(s: &str, col: usize) -> SqliteResult<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}
