// query/parser.rs - 字面量解析
//! 请求中的大小与日期字面量
//!
//! - 大小: `1024`, `10kb`, `1.5mb`, `2gb`（1024 进制，不区分大小写）
//! - 日期: `YYYY-MM-DD`、`YYYY-MM-DD HH:MM:SS`（按 UTC）或 RFC 3339

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EngineError, EngineResult};

static SIZE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*(b|kb|mb|gb|tb)?$").unwrap()
});

/// 日期作为区间哪一端使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// 只有日期时取当天 00:00:00
    Start,
    /// 只有日期时取当天 23:59:59
    End,
}

/// 解析大小字面量为字节数
pub fn parse_size(input: &str) -> EngineResult<u64> {
    let s = input.trim().to_lowercase();
    let cap = SIZE_PATTERN.captures(&s)
        .ok_or_else(|| EngineError::InvalidRequest(format!("invalid size: {}", input)))?;

    let number: f64 = cap[1].parse()
        .map_err(|_| EngineError::InvalidRequest(format!("invalid size: {}", input)))?;
    let multiplier: u64 = match cap.get(2).map(|m| m.as_str()) {
        None | Some("b") => 1,
        Some("kb") => 1024,
        Some("mb") => 1024 * 1024,
        Some("gb") => 1024 * 1024 * 1024,
        Some("tb") => 1024u64.pow(4),
        Some(other) => {
            return Err(EngineError::InvalidRequest(format!("unknown size unit: {}", other)));
        }
    };

    Ok((number * multiplier as f64).round() as u64)
}

/// 解析日期字面量为 Unix 秒（1970 年之前按 0）
pub fn parse_date(input: &str, bound: DateBound) -> EngineResult<u64> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp().max(0) as u64);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc().timestamp().max(0) as u64);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let (h, m, sec) = match bound {
            DateBound::Start => (0, 0, 0),
            DateBound::End => (23, 59, 59),
        };
        if let Some(naive) = date.and_hms_opt(h, m, sec) {
            return Ok(naive.and_utc().timestamp().max(0) as u64);
        }
    }

    Err(EngineError::InvalidRequest(format!("invalid date: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("10KB").unwrap(), 10 * 1024);
        assert_eq!(parse_size("1.5mb").unwrap(), 1_572_864);
        assert_eq!(parse_size(" 2 gb ").unwrap(), 2 * 1024 * 1024 * 1024);
        assert!(parse_size("ten").is_err());
        assert!(parse_size("-5").is_err());
    }

    #[test]
    fn test_date_only_covers_whole_day() {
        let start = parse_date("2024-03-01", DateBound::Start).unwrap();
        let end = parse_date("2024-03-01", DateBound::End).unwrap();
        assert_eq!(start, 1_709_251_200);
        assert_eq!(end - start, 86_399);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-01T00:00:10Z", DateBound::End).unwrap(), 1_709_251_210);
        assert_eq!(parse_date("2024-03-01 00:01:00", DateBound::Start).unwrap(), 1_709_251_260);
        assert_eq!(parse_date("1960-01-01", DateBound::Start).unwrap(), 0);
        assert!(parse_date("yesterday", DateBound::Start).is_err());
    }
}
