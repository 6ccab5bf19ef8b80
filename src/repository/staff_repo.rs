// ==========================================
// 日间活动排班系统 - 员工目录仓储
// ==========================================
// 员工目录由外部协作方维护; 引擎只读候选列表,
// 唯一的回写是公平轮换用的 last_assigned_date
// ==========================================

use crate::domain::resources::StaffMember;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct StaffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StaffRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入员工 (管理侧/测试播种)
    pub fn insert(&self, staff: &StaffMember) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO staff (staff_id, full_name, active, can_lead, last_assigned_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                staff.staff_id,
                staff.full_name,
                if staff.active { 1 } else { 0 },
                if staff.can_lead { 1 } else { 0 },
                staff.last_assigned_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(staff.staff_id.clone())
    }

    /// 查询分配候选列表
    ///
    /// 排序即公平轮换: last_assigned_date 升序 (NULL 最先), 再按 staff_id 保证确定性
    ///
    /// # 参数
    /// - `lead_only`: 只要可带队的员工
    pub fn list_candidates_tx(
        conn: &Connection,
        lead_only: bool,
    ) -> RepositoryResult<Vec<StaffMember>> {
        let sql = if lead_only {
            r#"
            SELECT staff_id, full_name, active, can_lead, last_assigned_date
            FROM staff
            WHERE active = 1 AND can_lead = 1
            ORDER BY last_assigned_date IS NOT NULL, last_assigned_date, staff_id
            "#
        } else {
            r#"
            SELECT staff_id, full_name, active, can_lead, last_assigned_date
            FROM staff
            WHERE active = 1
            ORDER BY last_assigned_date IS NOT NULL, last_assigned_date, staff_id
            "#
        };

        let mut stmt = conn.prepare(sql)?;
        let staff = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(staff)
    }

    /// 推进员工的公平轮换游标
    pub fn touch_last_assigned_tx(
        conn: &Connection,
        staff_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "UPDATE staff SET last_assigned_date = ?2 WHERE staff_id = ?1",
            params![staff_id, date.format("%Y-%m-%d").to_string()],
        )?;
        Ok(rows)
    }

    fn map_row(row: &Row) -> SqliteResult<StaffMember> {
        let last_str: Option<String> = row.get(4)?;
        Ok(StaffMember {
            staff_id: row.get(0)?,
            full_name: row.get(1)?,
            active: row.get::<_, i64>(2)? != 0,
            can_lead: row.get::<_, i64>(3)? != 0,
            last_assigned_date: last_str
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}
