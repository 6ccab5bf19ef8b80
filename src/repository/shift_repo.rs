// ==========================================
// 日间活动排班系统 - 员工班次仓储
// ==========================================
// 键: (instance_id, staff_id); 冲突时覆写角色/时间
// ==========================================

use crate::domain::resources::StaffShift;
use crate::domain::types::StaffRole;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::{parse_date, parse_time};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct ShiftRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShiftRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 按 (instance_id, staff_id) 幂等 upsert 班次
    pub fn upsert_tx(conn: &Connection, shift: &StaffShift) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO staff_shift (
                shift_id, instance_id, staff_id, shift_date, role, start_time, end_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (instance_id, staff_id) DO UPDATE SET
                role = excluded.role,
                start_time = excluded.start_time,
                end_time = excluded.end_time
            "#,
            params![
                shift.shift_id,
                shift.instance_id,
                shift.staff_id,
                shift.shift_date.format("%Y-%m-%d").to_string(),
                shift.role.to_db_str(),
                shift.start_time.format("%H:%M:%S").to_string(),
                shift.end_time.format("%H:%M:%S").to_string(),
            ],
        )?;
        Ok(shift.shift_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询实例的全部班次
    pub fn list_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<StaffShift>> {
        let conn = self.get_conn()?;
        Self::list_by_instance_tx(&conn, instance_id)
    }

    pub fn list_by_instance_tx(
        conn: &Connection,
        instance_id: &str,
    ) -> RepositoryResult<Vec<StaffShift>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT shift_id, instance_id, staff_id, shift_date, role, start_time, end_time
            FROM staff_shift
            WHERE instance_id = ?
            ORDER BY role, staff_id
            "#,
        )?;

        let shifts = stmt
            .query_map(params![instance_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(shifts)
    }

    /// 当日与给定时间段重叠的员工ID集合
    ///
    /// 重叠判定: existing.start < end 且 existing.end > start
    pub fn overlapping_staff_ids_tx(
        conn: &Connection,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> RepositoryResult<HashSet<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT staff_id
            FROM staff_shift
            WHERE shift_date = ?1 AND start_time < ?3 AND end_time > ?2
            "#,
        )?;

        let ids = stmt
            .query_map(
                params![
                    date.format("%Y-%m-%d").to_string(),
                    start.format("%H:%M:%S").to_string(),
                    end.format("%H:%M:%S").to_string(),
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<SqliteResult<HashSet<_>>>()?;
        Ok(ids)
    }

    fn map_row(row: &Row) -> SqliteResult<StaffShift> {
        let date_str: String = row.get(3)?;
        let role_str: String = row.get(4)?;
        let start_str: String = row.get(5)?;
        let end_str: String = row.get(6)?;

        Ok(StaffShift {
            shift_id: row.get(0)?,
            instance_id: row.get(1)?,
            staff_id: row.get(2)?,
            shift_date: parse_date(&date_str, 3)?,
            role: StaffRole::from_str(&role_str),
            start_time: parse_time(&start_str, 5)?,
            end_time: parse_time(&end_str, 6)?,
        })
    }
}
