// ==========================================
// 日间活动排班系统 (Day Program Roster)
// ==========================================
// 滚动窗口排班引擎:
// - 循环规则按机构日历展开为排班实例
// - 每日滚动把窗口向前推进一天 (尾部物化 + 头部清理)
// - 人工意图与单日例外作为叠加层覆写实例
// - 贪心分配带队/支援员工与接送车辆, 缺口落 NEEDS_ATTENTION
// - 独立核对只读复核并留痕
// ==========================================

pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod repository;

/// 应用名称
pub const APP_NAME: &str = "day-program-roster";

/// 应用版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
