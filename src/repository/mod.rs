// ==========================================
// 日间活动排班系统 - 数据仓储层
// ==========================================
// 红线: Repository 不做业务逻辑, 只做数据映射
// 约定: `*_tx` 关联函数在调用方的事务内执行 (参数为 &Connection,
//       rusqlite::Transaction 可经 Deref 直接传入);
//       实例方法自行取锁, 独立提交
// ==========================================

pub mod allocation_repo;
pub mod audit_repo;
pub mod card_repo;
pub mod error;
pub mod exception_repo;
pub mod instance_repo;
pub mod intent_repo;
pub mod participant_repo;
pub mod rule_repo;
pub mod shift_repo;
pub mod staff_repo;
pub mod vehicle_repo;

pub use allocation_repo::AllocationRepository;
pub use audit_repo::AuditRepository;
pub use card_repo::CardRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use exception_repo::ExceptionRepository;
pub use instance_repo::InstanceRepository;
pub use intent_repo::IntentRepository;
pub use participant_repo::ParticipantRepository;
pub use rule_repo::RuleRepository;
pub use shift_repo::ShiftRepository;
pub use staff_repo::StaffRepository;
pub use vehicle_repo::VehicleRepository;
