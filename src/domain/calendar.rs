// ==========================================
// 日间活动排班系统 - 机构日历
// ==========================================
// 职责: 以机构固定时区为准的"今天"与"现在"
// 红线: 循环规则判定只用日历日语义, 不做 UTC 偏移算术;
//       与其他时间表示的转换只发生在系统边界
// ==========================================

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// 机构时区默认偏移（分钟, UTC+10）
pub const DEFAULT_TZ_OFFSET_MINUTES: i32 = 600;

// ==========================================
// OrgClock - 机构时钟
// ==========================================
// 每次调用链显式传入, 不依赖进程级全局状态
#[derive(Debug, Clone, Copy)]
pub struct OrgClock {
    offset: FixedOffset,
}

impl OrgClock {
    /// 按时区偏移分钟数创建
    ///
    /// 非法偏移 (超出 ±24h) 回退到默认机构时区
    pub fn new(offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(DEFAULT_TZ_OFFSET_MINUTES * 60).unwrap());
        Self { offset }
    }

    /// 机构时区的当前日历日
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// 机构时区的当前时刻 (无时区标注)
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    /// 明天 (futureOnly 钳制的下界)
    pub fn tomorrow(&self) -> NaiveDate {
        self.today() + Duration::days(1)
    }
}

impl Default for OrgClock {
    fn default() -> Self {
        Self::new(DEFAULT_TZ_OFFSET_MINUTES)
    }
}
