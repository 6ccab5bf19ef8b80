// ==========================================
// 日间活动排班系统 - 实例卡片仓储
// ==========================================
// 红线: 卡片只支持"先删后插"的全量重建;
//       不提供单卡更新, 避免残留旧时段配置
// ==========================================

use crate::domain::instance::InstanceCard;
use crate::domain::types::SlotType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::parse_datetime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct CardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CardRepository {
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

    /// 删除实例的全部卡片 (重建前置步骤)
    pub fn delete_by_instance_tx(conn: &Connection, instance_id: &str) -> RepositoryResult<usize> {
        let rows = conn.execute(
            "DELETE FROM instance_card WHERE instance_id = ?1",
            params![instance_id],
        )?;
        Ok(rows)
    }

    /// 批量插入卡片
    pub fn insert_many_tx(conn: &Connection, cards: &[InstanceCard]) -> RepositoryResult<usize> {
        if cards.is_empty() {
            return Ok(0);
        }

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO instance_card (
                card_id, instance_id, seq_no, card_type, start_at, end_at,
                route_run_no, label
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )?;

        for card in cards {
            stmt.execute(params![
                card.card_id,
                card.instance_id,
                card.seq_no,
                card.card_type.to_db_str(),
                card.start_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                card.end_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                card.route_run_no,
                card.label,
            ])?;
        }
        Ok(cards.len())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询实例的卡片 (按 seq_no 升序)
    pub fn list_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<InstanceCard>> {
        let conn = self.get_conn()?;
        Self::list_by_instance_tx(&conn, instance_id)
    }

    pub fn list_by_instance_tx(
        conn: &Connection,
        instance_id: &str,
    ) -> RepositoryResult<Vec<InstanceCard>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT card_id, instance_id, seq_no, card_type, start_at, end_at,
                   route_run_no, label
            FROM instance_card
            WHERE instance_id = ?
            ORDER BY seq_no
            "#,
        )?;

        let cards = stmt
            .query_map(params![instance_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(cards)
    }

    fn map_row(row: &Row) -> SqliteResult<InstanceCard> {
        let type_str: String = row.get(3)?;
        let start_str: String = row.get(4)?;
        let end_str: String = row.get(5)?;

        Ok(InstanceCard {
            card_id: row.get(0)?,
            instance_id: row.get(1)?,
            seq_no: row.get(2)?,
            card_type: SlotType::from_str(&type_str),
            start_at: parse_datetime(&start_str, 4)?,
            end_at: parse_datetime(&end_str, 5)?,
            route_run_no: row.get(6)?,
            label: row.get(7)?,
        })
    }
}
