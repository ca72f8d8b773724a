//! 滚动窗口与分桶统计
//!
//! 所有函数都是纯函数，时间单位为毫秒，频率单位为次/分钟。

use super::types::{BlinkEvent, BlinkRatePoint, FaceLostPeriod};
use crate::constants::{MAX_PLAUSIBLE_BLINK_RATE, MILLIS_PER_MINUTE};

/// `count` 次眨眼落在 `window_ms` 内对应的频率，封顶于合理上限
pub fn rate_for_count(count: usize, window_ms: i64) -> f64 {
    if window_ms <= 0 {
        return 0.0;
    }
    let minutes = window_ms as f64 / MILLIS_PER_MINUTE as f64;
    (count as f64 / minutes).min(MAX_PLAUSIBLE_BLINK_RATE)
}

/// 将原始眨眼事件按 `bucket_ms` 分桶为频率点，时间戳取桶的结束时刻
///
/// 区间为 `[from, to)`；最后一个桶可能不满，按实际跨度计算频率。
pub fn bucketize(events: &[BlinkEvent], from: i64, to: i64, bucket_ms: i64) -> Vec<BlinkRatePoint> {
    if bucket_ms <= 0 || to <= from {
        return Vec::new();
    }

    let mut points = Vec::new();
    let mut start = from;
    while start < to {
        let end = (start + bucket_ms).min(to);
        let count = events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp < end)
            .count();
        points.push(BlinkRatePoint {
            timestamp: end,
            rate: rate_for_count(count, end - start),
        });
        start = end;
    }
    points
}

/// 窗口 `[now - window_ms, now]` 内采样点的平均频率；窗口内无采样时返回 `None`
pub fn rolling_average(history: &[BlinkRatePoint], now: i64, window_ms: i64) -> Option<f64> {
    let cutoff = now - window_ms;
    let (sum, count) = history
        .iter()
        .filter(|p| p.timestamp >= cutoff && p.timestamp <= now)
        .fold((0.0, 0usize), |(sum, count), p| (sum + p.rate, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// 窗口 `(now - window_ms, now]` 内的原始事件频率；窗口内没有事件时返回 `None`
pub fn events_rate_in_window(events: &[BlinkEvent], now: i64, window_ms: i64) -> Option<f64> {
    let cutoff = now - window_ms;
    let count = events
        .iter()
        .filter(|e| e.timestamp > cutoff && e.timestamp <= now)
        .count();
    (count > 0).then(|| rate_for_count(count, window_ms))
}

/// 人脸丢失区间与窗口 `[now - window_ms, now]` 的重叠总时长
pub fn face_lost_overlap_ms(periods: &[FaceLostPeriod], now: i64, window_ms: i64) -> i64 {
    let window_start = now - window_ms;
    periods
        .iter()
        .map(|p| {
            let start = p.start.max(window_start);
            let end = p.end.unwrap_or(now).min(now);
            (end - start).max(0)
        })
        .sum()
}
