// ==========================================
// 日间活动排班系统 - 引擎层
// ==========================================
// 职责: 实现排班业务规则
// 红线: Engine 不拼 SQL (事务内一律经 repository 的 *_tx 函数);
//       所有资源缺口必须输出 reason
// ==========================================
// 执行顺序 (每日滚动强制): 重织 → 意图 → 例外 → 资源分配 → 清理
// ==========================================

pub mod assigner;
pub mod exceptions;
pub mod intents;
pub mod recurrence;
pub mod rethread;
pub mod roller;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

// 重导出核心引擎
pub use assigner::{AssignSummary, ResourceAssigner};
pub use exceptions::{ExceptionApplier, ExceptionApplySummary};
pub use intents::{IntentApplier, IntentApplySummary};
pub use recurrence::RecurrenceEvaluator;
pub use rethread::{InstanceSynchronizer, RethreadSummary};
pub use roller::{RollSummary, WindowRoller};
pub use verifier::{ScheduleVerifier, VerifyReport};

use crate::config::SettingsError;
use crate::repository::RepositoryError;
use thiserror::Error;

// ==========================================
// 引擎层错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum EngineError {
    /// 致命配置错误: 当日滚动在任何写入前中止
    #[error("配置错误: {0}")]
    Configuration(#[from] SettingsError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Repository(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
