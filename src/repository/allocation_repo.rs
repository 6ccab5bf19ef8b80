// ==========================================
// 日间活动排班系统 - 参与者分配仓储
// ==========================================
// 键: (instance_id, participant_id)
// 取消由单日例外标记, 不物理删除 (留痕)
// ==========================================

use crate::domain::resources::ParticipantAllocation;
use crate::domain::types::AllocationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct AllocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AllocationRepository {
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

    /// 插入分配 (调用方负责先查重, check-then-insert 幂等)
    pub fn insert_tx(
        conn: &Connection,
        instance_id: &str,
        participant_id: &str,
    ) -> RepositoryResult<String> {
        let allocation_id = Uuid::new_v4().to_string();
        conn.execute(
            r#"
            INSERT INTO participant_allocation (
                allocation_id, instance_id, participant_id, status
            ) VALUES (?, ?, ?, ?)
            "#,
            params![
                allocation_id,
                instance_id,
                participant_id,
                AllocationStatus::Active.to_db_str(),
            ],
        )?;
        Ok(allocation_id)
    }

    pub fn insert(&self, instance_id: &str, participant_id: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, instance_id, participant_id)
    }

    /// 删除首个匹配的分配 (REMOVE_PARTICIPANT 意图)
    pub fn delete_one_tx(
        conn: &Connection,
        instance_id: &str,
        participant_id: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            DELETE FROM participant_allocation
            WHERE allocation_id IN (
                SELECT allocation_id FROM participant_allocation
                WHERE instance_id = ?1 AND participant_id = ?2
                LIMIT 1
            )
            "#,
            params![instance_id, participant_id],
        )?;
        Ok(rows)
    }

    /// 标记一条分配为 CANCELLED 并盖上例外痕迹 (PARTICIPANT_CANCELLATION 例外)
    pub fn cancel_one_tx(
        conn: &Connection,
        instance_id: &str,
        participant_id: &str,
        exception_id: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            UPDATE participant_allocation
            SET status = ?3, cancelled_by_exception_id = ?4
            WHERE allocation_id IN (
                SELECT allocation_id FROM participant_allocation
                WHERE instance_id = ?1 AND participant_id = ?2 AND status = ?5
                LIMIT 1
            )
            "#,
            params![
                instance_id,
                participant_id,
                AllocationStatus::Cancelled.to_db_str(),
                exception_id,
                AllocationStatus::Active.to_db_str(),
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 分配是否已存在 (不分状态)
    pub fn exists_tx(
        conn: &Connection,
        instance_id: &str,
        participant_id: &str,
    ) -> RepositoryResult<bool> {
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM participant_allocation
            WHERE instance_id = ?1 AND participant_id = ?2
            "#,
            params![instance_id, participant_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 实例的有效分配计数 (资源分配的输入)
    pub fn count_active_tx(conn: &Connection, instance_id: &str) -> RepositoryResult<i64> {
        let count = conn.query_row(
            r#"
            SELECT COUNT(*) FROM participant_allocation
            WHERE instance_id = ?1 AND status = ?2
            "#,
            params![instance_id, AllocationStatus::Active.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 查询实例的全部分配
    pub fn list_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<ParticipantAllocation>> {
        let conn = self.get_conn()?;
        Self::list_by_instance_tx(&conn, instance_id)
    }

    pub fn list_by_instance_tx(
        conn: &Connection,
        instance_id: &str,
    ) -> RepositoryResult<Vec<ParticipantAllocation>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT allocation_id, instance_id, participant_id, status,
                   cancelled_by_exception_id
            FROM participant_allocation
            WHERE instance_id = ?
            ORDER BY participant_id
            "#,
        )?;

        let allocations = stmt
            .query_map(params![instance_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(allocations)
    }

    fn map_row(row: &Row) -> SqliteResult<ParticipantAllocation> {
        let status_str: String = row.get(3)?;
        Ok(ParticipantAllocation {
            allocation_id: row.get(0)?,
            instance_id: row.get(1)?,
            participant_id: row.get(2)?,
            status: AllocationStatus::from_str(&status_str),
            cancelled_by_exception_id: row.get(4)?,
        })
    }
}
