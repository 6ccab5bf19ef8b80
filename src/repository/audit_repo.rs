// ==========================================
// 日间活动排班系统 - 审计日志仓储
// ==========================================
// 红线: 只追加; 不提供 update/delete
// ==========================================

use crate::domain::audit::AuditLogEntry;
use crate::domain::types::AuditStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::parse_datetime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};


pub struct AuditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加审计日志 (独立提交)
    pub fn append(&self, entry: &AuditLogEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::append_tx(&conn, entry)
    }

    /// 追加审计日志 (引擎事务内)
    pub fn append_tx(conn: &Connection, entry: &AuditLogEntry) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO audit_log (audit_id, action, details_json, status, created_ts)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                entry.audit_id,
                entry.action,
                entry.details_json.as_ref().map(|v| v.to_string()),
                entry.status.to_db_str(),
                entry.created_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(entry.audit_id.clone())
    }

    /// 查询某动作的最近一条日志 (核对用)
    pub fn latest_by_action(&self, action: &str) -> RepositoryResult<Option<AuditLogEntry>> {
        let conn = self.get_conn()?;
        Self::latest_by_action_tx(&conn, action)
    }

    pub fn latest_by_action_tx(
        conn: &Connection,
        action: &str,
    ) -> RepositoryResult<Option<AuditLogEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT audit_id, action, details_json, status, created_ts
            FROM audit_log
            WHERE action = ?
            ORDER BY created_ts DESC, audit_id DESC
            LIMIT 1
            "#,
        )?;

        match stmt.query_row(params![action], Self::map_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询最近 N 条日志 (运维排查用)
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<AuditLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT audit_id, action, details_json, status, created_ts
            FROM audit_log
            ORDER BY created_ts DESC, audit_id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    fn map_row(row: &Row) -> SqliteResult<AuditLogEntry> {
        let details_str: Option<String> = row.get(2)?;
        let status_str: String = row.get(3)?;
        let created_str: String = row.get(4)?;

        Ok(AuditLogEntry {
            audit_id: row.get(0)?,
            action: row.get(1)?,
            details_json: details_str.and_then(|s| serde_json::from_str(&s).ok()),
            status: AuditStatus::from_str(&status_str),
            created_ts: parse_datetime(&created_str, 4)?,
        })
    }
}
