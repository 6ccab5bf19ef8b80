// ==========================================
// 日间活动排班系统 - 排班实例仓储
// ==========================================
// 红线: 实例的创建/更新只走 (rule_id, instance_date) 幂等 upsert;
//       清理永不触碰"今天及以后"的实例
// ==========================================

use crate::domain::instance::ScheduleInstance;
use crate::domain::rule::ProgramRule;
use crate::domain::types::InstanceStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::{parse_date, parse_datetime, parse_time};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct InstanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InstanceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作 (引擎事务内)
    // ==========================================

    /// 幂等 upsert 实例
    ///
    /// 冲突 (同规则同日期) 时只更新解析后的时间/场地, 状态与人工痕迹保持不动。
    ///
    /// # 返回
    /// - `Ok((instance_id, inserted))`: 实例ID与"本次是否新建"
    pub fn upsert_tx(
        conn: &Connection,
        rule: &ProgramRule,
        date: NaiveDate,
        now_ts: &str,
    ) -> RepositoryResult<(String, bool)> {
        let existing = Self::find_id_tx(conn, &rule.rule_id, date)?;

        match existing {
            Some(instance_id) => {
                conn.execute(
                    r#"
                    UPDATE schedule_instance
                    SET start_time = ?2, end_time = ?3, venue = ?4, updated_ts = ?5
                    WHERE instance_id = ?1
                    "#,
                    params![
                        instance_id,
                        rule.default_start_time.format("%H:%M:%S").to_string(),
                        rule.default_end_time.format("%H:%M:%S").to_string(),
                        rule.default_venue,
                        now_ts,
                    ],
                )?;
                Ok((instance_id, false))
            }
            None => {
                let instance_id = Uuid::new_v4().to_string();
                conn.execute(
                    r#"
                    INSERT INTO schedule_instance (
                        instance_id, rule_id, instance_date, start_time, end_time,
                        venue, status, created_ts, updated_ts
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        instance_id,
                        rule.rule_id,
                        date.format("%Y-%m-%d").to_string(),
                        rule.default_start_time.format("%H:%M:%S").to_string(),
                        rule.default_end_time.format("%H:%M:%S").to_string(),
                        rule.default_venue,
                        InstanceStatus::Generated.to_db_str(),
                        now_ts,
                        now_ts,
                    ],
                )?;
                Ok((instance_id, true))
            }
        }
    }

    /// 更新实例状态与原因
    pub fn set_status_tx(
        conn: &Connection,
        instance_id: &str,
        status: InstanceStatus,
        reason: Option<&str>,
        now_ts: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE schedule_instance
            SET status = ?2, status_reason = ?3, updated_ts = ?4
            WHERE instance_id = ?1
            "#,
            params![instance_id, status.to_db_str(), reason, now_ts],
        )?;
        Ok(rows)
    }

    /// 叠加层覆写解析字段 (只改传入的子集), 并盖上意图痕迹
    pub fn patch_resolved_tx(
        conn: &Connection,
        instance_id: &str,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        venue: Option<&str>,
        intent_id: Option<&str>,
        now_ts: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE schedule_instance
            SET start_time = COALESCE(?2, start_time),
                end_time   = COALESCE(?3, end_time),
                venue      = COALESCE(?4, venue),
                modified_by_intent_id = COALESCE(?5, modified_by_intent_id),
                updated_ts = ?6
            WHERE instance_id = ?1
            "#,
            params![
                instance_id,
                start_time.map(|t| t.format("%H:%M:%S").to_string()),
                end_time.map(|t| t.format("%H:%M:%S").to_string()),
                venue,
                intent_id,
                now_ts,
            ],
        )?;
        Ok(rows)
    }

    /// 整实例取消 (单日例外), 盖上例外痕迹
    pub fn cancel_tx(
        conn: &Connection,
        instance_id: &str,
        exception_id: &str,
        reason: Option<&str>,
        now_ts: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE schedule_instance
            SET status = ?2, status_reason = ?3,
                cancelled_by_exception_id = ?4, updated_ts = ?5
            WHERE instance_id = ?1
            "#,
            params![
                instance_id,
                InstanceStatus::Cancelled.to_db_str(),
                reason,
                exception_id,
                now_ts,
            ],
        )?;
        Ok(rows)
    }

    /// 清理窗口外的过期实例
    ///
    /// 红线: 严格小于 today; 今天及以后的实例永不删除
    pub fn purge_before_tx(conn: &Connection, today: NaiveDate) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM schedule_instance WHERE instance_date < ?1",
            params![today.format("%Y-%m-%d").to_string()],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 (规则, 日期) 查询实例ID
    pub fn find_id_tx(
        conn: &Connection,
        rule_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<String>> {
        let result = conn.query_row(
            "SELECT instance_id FROM schedule_instance WHERE rule_id = ?1 AND instance_date = ?2",
            params![rule_id, date.format("%Y-%m-%d").to_string()],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 (规则, 日期) 查询完整实例
    pub fn find_by_rule_date(
        &self,
        rule_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<ScheduleInstance>> {
        let conn = self.get_conn()?;
        Self::find_by_rule_date_tx(&conn, rule_id, date)
    }

    pub fn find_by_rule_date_tx(
        conn: &Connection,
        rule_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<ScheduleInstance>> {
        let mut stmt = conn.prepare(&format!("{} WHERE rule_id = ? AND instance_date = ?", SELECT_INSTANCE))?;
        match stmt.query_row(
            params![rule_id, date.format("%Y-%m-%d").to_string()],
            Self::map_row,
        ) {
            Ok(inst) => Ok(Some(inst)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某日期的全部实例
    pub fn list_by_date(&self, date: NaiveDate) -> RepositoryResult<Vec<ScheduleInstance>> {
        let conn = self.get_conn()?;
        Self::list_by_date_tx(&conn, date)
    }

    pub fn list_by_date_tx(
        conn: &Connection,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleInstance>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE instance_date = ? ORDER BY rule_id",
            SELECT_INSTANCE
        ))?;
        let instances = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(instances)
    }

    /// 某日期的实例计数 (核对用)
    pub fn count_by_date(&self, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM schedule_instance WHERE instance_date = ?1",
            params![date.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row) -> SqliteResult<ScheduleInstance> {
        let date_str: String = row.get(2)?;
        let start_str: String = row.get(3)?;
        let end_str: String = row.get(4)?;
        let status_str: String = row.get(6)?;
        let created_str: String = row.get(10)?;
        let updated_str: String = row.get(11)?;

        Ok(ScheduleInstance {
            instance_id: row.get(0)?,
            rule_id: row.get(1)?,
            instance_date: parse_date(&date_str, 2)?,
            start_time: parse_time(&start_str, 3)?,
            end_time: parse_time(&end_str, 4)?,
            venue: row.get(5)?,
            status: InstanceStatus::from_str(&status_str),
            status_reason: row.get(7)?,
            modified_by_intent_id: row.get(8)?,
            cancelled_by_exception_id: row.get(9)?,
            created_ts: parse_datetime(&created_str, 10)?,
            updated_ts: parse_datetime(&updated_str, 11)?,
        })
    }
}

const SELECT_INSTANCE: &str = r#"
    SELECT instance_id, rule_id, instance_date, start_time, end_time, venue,
           status, status_reason, modified_by_intent_id, cancelled_by_exception_id,
           created_ts, updated_ts
    FROM schedule_instance
"#;
