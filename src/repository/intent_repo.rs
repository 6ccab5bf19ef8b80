// ==========================================
// 日间活动排班系统 - 人工意图仓储
// ==========================================
// 意图按 [start_date, end_date] 闭区间生效
// ==========================================

use crate::domain::overlay::OperatorIntent;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::{parse_date, parse_datetime};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct IntentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl IntentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入意图 (操作台/测试播种)
    pub fn insert(&self, intent: &OperatorIntent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO operator_intent (
                intent_id, rule_id, intent_type, start_date, end_date,
                payload_json, created_ts
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                intent.intent_id,
                intent.rule_id,
                intent.intent_type,
                intent.start_date.format("%Y-%m-%d").to_string(),
                intent.end_date.format("%Y-%m-%d").to_string(),
                intent.payload_json.as_ref().map(|v| v.to_string()),
                intent.created_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(intent.intent_id.clone())
    }

    /// 查询窗口覆盖指定日期的全部意图 (按创建时间升序, 先到先应用)
    pub fn list_for_date_tx(
        conn: &Connection,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<OperatorIntent>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT intent_id, rule_id, intent_type, start_date, end_date,
                   payload_json, created_ts
            FROM operator_intent
            WHERE start_date <= ?1 AND end_date >= ?1
            ORDER BY created_ts, intent_id
            "#,
        )?;

        let intents = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(intents)
    }

    fn map_row(row: &Row) -> SqliteResult<OperatorIntent> {
        let start_str: String = row.get(3)?;
        let end_str: String = row.get(4)?;
        let payload_str: Option<String> = row.get(5)?;
        let created_str: String = row.get(6)?;

        Ok(OperatorIntent {
            intent_id: row.get(0)?,
            rule_id: row.get(1)?,
            intent_type: row.get(2)?,
            start_date: parse_date(&start_str, 3)?,
            end_date: parse_date(&end_str, 4)?,
            payload_json: payload_str.and_then(|s| serde_json::from_str(&s).ok()),
            created_ts: parse_datetime(&created_str, 6)?,
        })
    }
}
