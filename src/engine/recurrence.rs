// ==========================================
// 日间活动排班系统 - 循环规则判定引擎
// ==========================================
// 职责: 判定"这条规则在这个日历日是否开班"
// 红线: 纯函数, 同一 (规则, 日期) 重复判定结果必须一致;
//       只做日历日算术, 不碰时区偏移
// ==========================================

use crate::domain::rule::ProgramRule;
use crate::domain::types::{RecurrencePattern, WeekParity};
use chrono::{Datelike, NaiveDate};

// ==========================================
// RecurrenceEvaluator - 循环规则判定
// ==========================================
pub struct RecurrenceEvaluator;

impl RecurrenceEvaluator {
    /// 判定规则在指定日期是否开班
    ///
    /// 各模式语义:
    /// - ONE_OFF: 日期等于锚点日期
    /// - WEEKLY: 星期几匹配
    /// - FORTNIGHTLY: 星期几匹配, 且距锚点日期为 14 的整数倍;
    ///   无锚点时回退到 ISO 周号奇偶 (week_parity 配置相位)
    /// - MONTHLY: 日期的"几号"等于锚点的"几号"; 无锚点永不开班
    pub fn is_active(rule: &ProgramRule, date: NaiveDate) -> bool {
        match rule.recurrence_pattern {
            RecurrencePattern::OneOff => rule.anchor_date == Some(date),
            RecurrencePattern::Weekly => Self::weekday_matches(rule, date),
            RecurrencePattern::Fortnightly => Self::fortnightly_active(rule, date),
            RecurrencePattern::Monthly => match rule.anchor_date {
                Some(anchor) => date.day() == anchor.day(),
                None => false,
            },
        }
    }

    fn weekday_matches(rule: &ProgramRule, date: NaiveDate) -> bool {
        date.weekday().num_days_from_monday() as i32 == rule.day_of_week
    }

    fn fortnightly_active(rule: &ProgramRule, date: NaiveDate) -> bool {
        if !Self::weekday_matches(rule, date) {
            return false;
        }

        // 优先锚点整周期判定
        if let Some(anchor) = rule.anchor_date {
            let delta = (date - anchor).num_days();
            return delta.rem_euclid(14) == 0;
        }

        // 无锚点: ISO 周号奇偶回退
        let parity = rule.week_parity.unwrap_or(WeekParity::Odd);
        let week_is_odd = date.iso_week().week() % 2 == 1;
        match parity {
            WeekParity::Odd => week_is_odd,
            WeekParity::Even => !week_is_odd,
        }
    }
}
