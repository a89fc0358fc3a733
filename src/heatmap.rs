//! Hour-by-day activity grid
//!
//! Source data for the circular heatmap: mean activity for every hour of
//! every recorded day, always as a complete grid.

use crate::types::{Event, HourlyBucket, MINUTES_PER_DAY, MINUTES_PER_HOUR};

/// Days covered by the grid
pub const HEATMAP_DAYS: u32 = 14;

/// Hours per day in the grid
pub const HOURS_PER_DAY: u32 = 24;

/// Mean activity per (day, hour) for days `1..=14`.
///
/// Returns 14 × 24 buckets ordered by day then hour. An empty bucket has a
/// mean of 0. Events after day 14 are ignored.
pub fn aggregate_hourly<'a, I>(events: I) -> Vec<HourlyBucket>
where
    I: IntoIterator<Item = &'a Event>,
{
    aggregate_hourly_days(events, HEATMAP_DAYS)
}

/// Same as [`aggregate_hourly`] over an arbitrary number of days
pub fn aggregate_hourly_days<'a, I>(events: I, days: u32) -> Vec<HourlyBucket>
where
    I: IntoIterator<Item = &'a Event>,
{
    let per_day = HOURS_PER_DAY as usize;
    let cells = (days as usize).saturating_mul(per_day);
    let mut sums = vec![0.0f64; cells];
    let mut counts = vec![0usize; cells];

    // Bucket index is the elapsed hour: ((day - 1) * 1440 + hour * 60) / 60
    for event in events {
        let idx = (event.elapsed_minute / MINUTES_PER_HOUR) as usize;
        if idx < cells {
            sums[idx] += event.activity;
            counts[idx] += 1;
        }
    }

    let mut grid = Vec::with_capacity(cells);
    for day in 1..=days {
        for hour in 0..HOURS_PER_DAY {
            let idx = (day as usize - 1) * per_day + hour as usize;
            let count = counts[idx];
            let mean_activity = if count > 0 {
                sums[idx] / count as f64
            } else {
                0.0
            };
            grid.push(HourlyBucket {
                day,
                hour,
                mean_activity,
                event_count: count,
            });
        }
    }

    tracing::debug!(
        days,
        filled = counts.iter().filter(|c| **c > 0).count(),
        "hourly grid aggregated"
    );
    grid
}

/// Start of a bucket as an elapsed minute; day 0 is treated as day 1
pub fn bucket_start_minute(day: u32, hour: u32) -> u32 {
    day.saturating_sub(1)
        .saturating_mul(MINUTES_PER_DAY)
        .saturating_add(hour.saturating_mul(MINUTES_PER_HOUR))
}
