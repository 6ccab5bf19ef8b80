// ==========================================
// 日间活动排班系统 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不做数据访问, 不做业务编排
// ==========================================

pub mod audit;
pub mod calendar;
pub mod instance;
pub mod overlay;
pub mod resources;
pub mod rule;
pub mod types;

// 重导出领域实体
pub use audit::{AuditAction, AuditLogEntry};
pub use calendar::OrgClock;
pub use instance::{InstanceCard, ScheduleInstance};
pub use overlay::{ExceptionDetails, IntentDetails, OperatorIntent, TemporalException};
pub use resources::{ParticipantAllocation, StaffMember, StaffShift, Vehicle, VehicleRun};
pub use rule::{ProgramRule, RuleSlot};
