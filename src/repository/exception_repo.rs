// ==========================================
// 日间活动排班系统 - 单日例外仓储
// ==========================================
// 例外精确绑定到 (规则, 单个日期)
// ==========================================

use crate::domain::overlay::TemporalException;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::{parse_date, parse_datetime};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ExceptionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExceptionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入例外 (操作台/测试播种)
    pub fn insert(&self, exception: &TemporalException) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO temporal_exception (
                exception_id, rule_id, exception_type, exception_date,
                payload_json, created_ts
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                exception.exception_id,
                exception.rule_id,
                exception.exception_type,
                exception.exception_date.format("%Y-%m-%d").to_string(),
                exception.payload_json.as_ref().map(|v| v.to_string()),
                exception.created_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(exception.exception_id.clone())
    }

    /// 查询日期恰好相等的全部例外
    pub fn list_for_date_tx(
        conn: &Connection,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<TemporalException>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT exception_id, rule_id, exception_type, exception_date,
                   payload_json, created_ts
            FROM temporal_exception
            WHERE exception_date = ?1
            ORDER BY created_ts, exception_id
            "#,
        )?;

        let exceptions = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(exceptions)
    }

    fn map_row(row: &Row) -> SqliteResult<TemporalException> {
        let date_str: String = row.get(3)?;
        let payload_str: Option<String> = row.get(4)?;
        let created_str: String = row.get(5)?;

        Ok(TemporalException {
            exception_id: row.get(0)?,
            rule_id: row.get(1)?,
            exception_type: row.get(2)?,
            exception_date: parse_date(&date_str, 3)?,
            payload_json: payload_str.and_then(|s| serde_json::from_str(&s).ok()),
            created_ts: parse_datetime(&created_str, 5)?,
        })
    }
}
