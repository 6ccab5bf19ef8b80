// ==========================================
// 日间活动排班系统 - 参与者目录仓储
// ==========================================
// 外部协作方维护的目录, 引擎只在外键播种时写入
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::params;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct ParticipantRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ParticipantRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入参与者 (管理侧/测试播种)
    pub fn insert(&self, participant_id: &str, full_name: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO participant (participant_id, full_name, active) VALUES (?, ?, 1)",
            params![participant_id, full_name],
        )?;
        Ok(participant_id.to_string())
    }
}
