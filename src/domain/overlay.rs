// ==========================================
// 日间活动排班系统 - 人工叠加层领域模型
// ==========================================
// 人工意图: 面向未来日期区间的临时调整
// 单日例外: 绑定到 (规则, 单个日期) 的取消/覆写
// 红线: payload 在边界处一次性解码为带标签的联合类型,
//       引擎内部不做 JSON 摸黑取值
// ==========================================

use crate::domain::types::StaffRole;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// OperatorIntent - 人工意图
// ==========================================
// 对齐: operator_intent 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorIntent {
    pub intent_id: String,
    pub rule_id: String,
    pub intent_type: String, // 数据库原值, 未知类型保留原样用于告警
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payload_json: Option<JsonValue>,
    pub created_ts: NaiveDateTime,
}

// ==========================================
// IntentDetails - 意图类型联合
// ==========================================
// 每种意图只携带自己的字段
#[derive(Debug, Clone, PartialEq)]
pub enum IntentDetails {
    AddParticipant {
        participant_id: String,
    },
    RemoveParticipant {
        participant_id: String,
    },
    ModifyTime {
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    },
    ChangeVenue {
        venue: String,
    },
    AssignStaff {
        staff_id: String,
        role: StaffRole,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    },
}

// payload 解码用的中间结构
#[derive(Debug, Deserialize)]
struct ParticipantPayload {
    participant_id: String,
}

#[derive(Debug, Deserialize)]
struct TimePayload {
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize)]
struct VenuePayload {
    venue: String,
}

#[derive(Debug, Deserialize)]
struct StaffPayload {
    staff_id: String,
    #[serde(default)]
    role: Option<String>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

impl OperatorIntent {
    /// 解码意图负载
    ///
    /// # 返回
    /// - `Some(details)`: 类型已知且负载合法
    /// - `None`: 未知类型或负载缺字段 (调用方记告警后跳过, 不中断当日处理)
    pub fn details(&self) -> Option<IntentDetails> {
        let payload = self.payload_json.clone().unwrap_or(JsonValue::Null);

        match self.intent_type.to_uppercase().as_str() {
            "ADD_PARTICIPANT" => {
                let p: ParticipantPayload = serde_json::from_value(payload).ok()?;
                Some(IntentDetails::AddParticipant {
                    participant_id: p.participant_id,
                })
            }
            "REMOVE_PARTICIPANT" => {
                let p: ParticipantPayload = serde_json::from_value(payload).ok()?;
                Some(IntentDetails::RemoveParticipant {
                    participant_id: p.participant_id,
                })
            }
            "MODIFY_TIME" => {
                let p: TimePayload = serde_json::from_value(payload).ok()?;
                Some(IntentDetails::ModifyTime {
                    start_time: p.start_time,
                    end_time: p.end_time,
                })
            }
            "CHANGE_VENUE" => {
                let p: VenuePayload = serde_json::from_value(payload).ok()?;
                Some(IntentDetails::ChangeVenue { venue: p.venue })
            }
            "ASSIGN_STAFF" => {
                let p: StaffPayload = serde_json::from_value(payload).ok()?;
                Some(IntentDetails::AssignStaff {
                    staff_id: p.staff_id,
                    role: p
                        .role
                        .map(|r| StaffRole::from_str(&r))
                        .unwrap_or(StaffRole::Support),
                    start_time: p.start_time,
                    end_time: p.end_time,
                })
            }
            _ => None,
        }
    }

    /// 意图窗口是否覆盖指定日期 (闭区间)
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

// ==========================================
// TemporalException - 单日例外
// ==========================================
// 对齐: temporal_exception 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalException {
    pub exception_id: String,
    pub rule_id: String,
    pub exception_type: String,
    pub exception_date: NaiveDate,
    pub payload_json: Option<JsonValue>,
    pub created_ts: NaiveDateTime,
}

// ==========================================
// ExceptionDetails - 例外类型联合
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionDetails {
    ParticipantCancellation {
        participant_id: String,
    },
    ProgramCancellation {
        reason: Option<String>,
    },
    /// 只覆写负载中出现的字段子集
    OneOffChange {
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        venue: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct CancellationPayload {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OneOffChangePayload {
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    venue: Option<String>,
}

impl TemporalException {
    /// 解码例外负载, 未知类型返回 None
    pub fn details(&self) -> Option<ExceptionDetails> {
        let payload = self.payload_json.clone().unwrap_or(JsonValue::Null);

        match self.exception_type.to_uppercase().as_str() {
            "PARTICIPANT_CANCELLATION" => {
                let p: ParticipantPayload = serde_json::from_value(payload).ok()?;
                Some(ExceptionDetails::ParticipantCancellation {
                    participant_id: p.participant_id,
                })
            }
            "PROGRAM_CANCELLATION" => {
                let p: CancellationPayload =
                    serde_json::from_value(payload).unwrap_or(CancellationPayload { reason: None });
                Some(ExceptionDetails::ProgramCancellation { reason: p.reason })
            }
            "ONE_OFF_CHANGE" => {
                let p: OneOffChangePayload = serde_json::from_value(payload).ok()?;
                Some(ExceptionDetails::OneOffChange {
                    start_time: p.start_time,
                    end_time: p.end_time,
                    venue: p.venue,
                })
            }
            _ => None,
        }
    }
}
