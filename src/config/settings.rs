// ==========================================
// 日间活动排班系统 - 设置管理器
// ==========================================
// 职责: 设置加载、查询、校验
// 存储: config_kv 表 (key-value + scope)
// 红线: 窗口宽度缺失或越界是致命配置错误,
//       必须在任何写入之前中止当日滚动
// ==========================================

use crate::db::configure_sqlite_connection;
use crate::domain::calendar::DEFAULT_TZ_OFFSET_MINUTES;
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// 设置键全集
pub mod config_keys {
    /// 滚动窗口宽度 (天), 必填
    pub const WINDOW_DAYS: &str = "window_days";
    /// 人员配比除数: 1 名带队 + 每满 N 人再加 1 名支援
    pub const STAFFING_RATIO_DIVISOR: &str = "staffing_ratio_divisor";
    /// 车辆触发阈值: 参与者达到 N 人才分配车辆
    pub const VEHICLE_TRIGGER_THRESHOLD: &str = "vehicle_trigger_threshold";
    /// 机构时区偏移 (分钟)
    pub const TZ_OFFSET_MINUTES: &str = "tz_offset_minutes";
    /// 每日滚动触发时刻 (HH:MM:SS)
    pub const ROLL_TIME: &str = "roll_time";
    /// 每日核对触发时刻 (HH:MM:SS)
    pub const VERIFY_TIME: &str = "verify_time";
}

/// 窗口宽度允许区间 (天)
pub const WINDOW_DAYS_MIN: i64 = 7;
pub const WINDOW_DAYS_MAX: i64 = 90;

// ==========================================
// 设置层错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("配置缺失: {0}")]
    Missing(&'static str),

    #[error("窗口宽度越界: {value} (允许 {min}..={max})")]
    WindowDaysOutOfRange { value: i64, min: i64, max: i64 },

    #[error("配置值非法 (key={key}): {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    QueryError(#[from] rusqlite::Error),
}

// ==========================================
// RosterSettings - 一次滚动使用的设置快照
// ==========================================
// 调用链显式传递, 不依赖进程级全局状态
#[derive(Debug, Clone)]
pub struct RosterSettings {
    pub window_days: i64,
    pub staffing_ratio_divisor: i64,
    pub vehicle_trigger_threshold: i64,
    pub tz_offset_minutes: i32,
    pub roll_time: NaiveTime,
    pub verify_time: NaiveTime,
}

// ==========================================
// SettingsStore - 设置管理器
// ==========================================
pub struct SettingsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsStore {
    /// 从已有连接创建 SettingsStore
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, SettingsError> {
        {
            let guard = conn
                .lock()
                .map_err(|e| SettingsError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值 (管理侧/测试播种)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SettingsError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_ts)
            VALUES ('global', ?1, ?2, ?3)
            ON CONFLICT (scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_ts = excluded.updated_ts
            "#,
            params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    fn get_i64_or(&self, key: &'static str, default: i64) -> Result<i64, SettingsError> {
        match self.get_config_value(key)? {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| SettingsError::InvalidValue {
                key,
                value: raw,
            }),
            None => Ok(default),
        }
    }

    fn get_time_or(&self, key: &'static str, default: &str) -> Result<NaiveTime, SettingsError> {
        let raw = self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string());
        NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
            .map_err(|_| SettingsError::InvalidValue { key, value: raw })
    }

    /// 机构时区偏移 (分钟), 未配置用默认机构时区
    pub fn tz_offset_minutes(&self) -> Result<i32, SettingsError> {
        Ok(self
            .get_i64_or(config_keys::TZ_OFFSET_MINUTES, DEFAULT_TZ_OFFSET_MINUTES as i64)?
            as i32)
    }

    /// 每日滚动触发时刻
    pub fn roll_time(&self) -> Result<NaiveTime, SettingsError> {
        self.get_time_or(config_keys::ROLL_TIME, "02:00:00")
    }

    /// 每日核对触发时刻
    pub fn verify_time(&self) -> Result<NaiveTime, SettingsError> {
        self.get_time_or(config_keys::VERIFY_TIME, "18:00:00")
    }

    /// 读取并校验窗口宽度
    ///
    /// # 返回
    /// - `Err(Missing)`: 未配置
    /// - `Err(WindowDaysOutOfRange)`: 越界
    pub fn window_days(&self) -> Result<i64, SettingsError> {
        let raw = self
            .get_config_value(config_keys::WINDOW_DAYS)?
            .ok_or(SettingsError::Missing(config_keys::WINDOW_DAYS))?;

        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| SettingsError::InvalidValue {
                key: config_keys::WINDOW_DAYS,
                value: raw,
            })?;

        if !(WINDOW_DAYS_MIN..=WINDOW_DAYS_MAX).contains(&value) {
            return Err(SettingsError::WindowDaysOutOfRange {
                value,
                min: WINDOW_DAYS_MIN,
                max: WINDOW_DAYS_MAX,
            });
        }
        Ok(value)
    }

    /// 读取完整设置快照 (每次滚动开始时读取一次)
    pub fn load_snapshot(&self) -> Result<RosterSettings, SettingsError> {
        Ok(RosterSettings {
            window_days: self.window_days()?,
            staffing_ratio_divisor: self.get_i64_or(config_keys::STAFFING_RATIO_DIVISOR, 5)?,
            vehicle_trigger_threshold: self.get_i64_or(config_keys::VEHICLE_TRIGGER_THRESHOLD, 1)?,
            tz_offset_minutes: self.tz_offset_minutes()?,
            roll_time: self.roll_time()?,
            verify_time: self.verify_time()?,
        })
    }
}
