//! 时钟
//!
//! 为动作结果提供时间戳。`SystemClock` 保证单调不减，
//! `ManualClock` 用于测试中固定或推进时间。

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// 时间来源
pub trait Clock: Send + Sync {
    /// 当前 UTC 时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
///
/// 返回值截断到毫秒，并以毫秒为粒度记录上一次返回的时间；墙上时钟回拨时继续返回已发出的最大值。
#[derive(Debug, Default)]
pub struct SystemClock {
    last_millis: AtomicI64,
}

impl SystemClock {
    /// 创建系统时钟
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let real_millis = Utc::now().timestamp_millis();
        let millis = self
            .last_millis
            .fetch_max(real_millis, Ordering::SeqCst)
            .max(real_millis);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// 手动时钟（测试用）
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// 以指定时间创建
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// 设置当前时间
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// 向前推进
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// 格式化为 ISO-8601 UTC 字符串，毫秒精度，`Z` 结尾
///
/// 例如 `2024-05-01T12:00:00.000Z`
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 解析 ISO-8601 时间戳
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
