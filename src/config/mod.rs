// ==========================================
// 日间活动排班系统 - 配置层
// ==========================================

pub mod settings;

pub use settings::{config_keys, RosterSettings, SettingsError, SettingsStore};
