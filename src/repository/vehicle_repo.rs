// ==========================================
// 日间活动排班系统 - 车辆仓储
// ==========================================
// 车辆目录只读; 车次 (vehicle_run) 由引擎写入,
// 键: (instance_id, vehicle_id)
// ==========================================

use crate::domain::resources::{Vehicle, VehicleRun};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::rule_repo::{parse_date, parse_time};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct VehicleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VehicleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入车辆 (管理侧/测试播种)
    pub fn insert(&self, vehicle: &Vehicle) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO vehicle (vehicle_id, label, capacity, active) VALUES (?, ?, ?, ?)",
            params![
                vehicle.vehicle_id,
                vehicle.label,
                vehicle.capacity,
                if vehicle.active { 1 } else { 0 },
            ],
        )?;
        Ok(vehicle.vehicle_id.clone())
    }

    /// 启用车辆按容量升序 (贪心选"刚好够大"的那辆)
    pub fn list_active_by_capacity_tx(conn: &Connection) -> RepositoryResult<Vec<Vehicle>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT vehicle_id, label, capacity, active
            FROM vehicle
            WHERE active = 1
            ORDER BY capacity, vehicle_id
            "#,
        )?;

        let vehicles = stmt
            .query_map([], Self::map_vehicle_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(vehicles)
    }

    /// 当日与给定时间段重叠的车辆ID集合
    pub fn overlapping_vehicle_ids_tx(
        conn: &Connection,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> RepositoryResult<HashSet<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT vehicle_id
            FROM vehicle_run
            WHERE run_date = ?1 AND start_time < ?3 AND end_time > ?2
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

    /// 实例是否已有车次
    pub fn has_run_tx(conn: &Connection, instance_id: &str) -> RepositoryResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vehicle_run WHERE instance_id = ?1",
            params![instance_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 插入车次
    pub fn insert_run_tx(conn: &Connection, run: &VehicleRun) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO vehicle_run (
                run_id, instance_id, vehicle_id, run_date, passenger_count,
                start_time, end_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                run.run_id,
                run.instance_id,
                run.vehicle_id,
                run.run_date.format("%Y-%m-%d").to_string(),
                run.passenger_count,
                run.start_time.format("%H:%M:%S").to_string(),
                run.end_time.format("%H:%M:%S").to_string(),
            ],
        )?;
        Ok(run.run_id.clone())
    }

    /// 查询实例的车次
    pub fn list_runs_by_instance(&self, instance_id: &str) -> RepositoryResult<Vec<VehicleRun>> {
        let conn = self.get_conn()?;
        Self::list_runs_by_instance_tx(&conn, instance_id)
    }

    pub fn list_runs_by_instance_tx(
        conn: &Connection,
        instance_id: &str,
    ) -> RepositoryResult<Vec<VehicleRun>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, instance_id, vehicle_id, run_date, passenger_count,
                   start_time, end_time
            FROM vehicle_run
            WHERE instance_id = ?
            ORDER BY vehicle_id
            "#,
        )?;

        let runs = stmt
            .query_map(params![instance_id], Self::map_run_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(runs)
    }

    fn map_vehicle_row(row: &Row) -> SqliteResult<Vehicle> {
        Ok(Vehicle {
            vehicle_id: row.get(0)?,
            label: row.get(1)?,
            capacity: row.get(2)?,
            active: row.get::<_, i64>(3)? != 0,
        })
    }

    fn map_run_row(row: &Row) -> SqliteResult<VehicleRun> {
        let date_str: String = row.get(3)?;
        let start_str: String = row.get(5)?;
        let end_str: String = row.get(6)?;

        Ok(VehicleRun {
            run_id: row.get(0)?,
            instance_id: row.get(1)?,
            vehicle_id: row.get(2)?,
            run_date: parse_date(&date_str, 3)?,
            passenger_count: row.get(4)?,
            start_time: parse_time(&start_str, 5)?,
            end_time: parse_time(&end_str, 6)?,
        })
    }
}
