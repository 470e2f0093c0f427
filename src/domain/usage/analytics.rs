//! Read-only rollups over a user's usage records
//!
//! Everything here is a pure function over already-loaded keys and usage
//! records so the services stay thin and the arithmetic is testable with
//! fixed clocks.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use super::entity::{CommitStatus, Usage};
use crate::domain::api_key::{ApiKey, ApiKeyLabel};

/// Maximum number of entries in the activity feed
pub const ACTIVITY_FEED_LIMIT: usize = 50;

/// Days covered by the day-of-week breakdown, today included
pub const DAY_WINDOW: i64 = 7;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Key counts by label plus overall request volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub active_tokens: u64,
    pub expired_tokens: u64,
    pub total_requests: u64,
}

/// One line of the activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub commit_message: String,
    pub status: CommitStatus,
    pub timestamp: DateTime<Utc>,
}

/// Per-weekday counts; `day_index` 1 is Sunday
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
    pub day_index: u32,
    pub day: &'static str,
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Combined success and failure totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessFailure {
    pub total_success: u64,
    pub total_failure: u64,
}

/// Count keys by label and sum request volume over their usage records
pub fn summarize(keys: &[ApiKey], usages: &[Usage]) -> UsageSummary {
    let mut summary = UsageSummary::default();

    for key in keys {
        match key.label() {
            ApiKeyLabel::Active => summary.active_tokens += 1,
            ApiKeyLabel::Expired => summary.expired_tokens += 1,
        }
    }

    summary.total_requests = usages.iter().map(Usage::total_requests).sum();
    summary
}

/// Most recent events across all records, newest first
pub fn activity_feed(usages: &[Usage], limit: usize) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = usages
        .iter()
        .flat_map(|usage| usage.commits())
        .map(|event| ActivityEntry {
            commit_message: event.commit_message.clone(),
            status: event.status,
            timestamp: event.timestamp,
        })
        .collect();

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);
    entries
}

/// Start of the breakdown window: midnight UTC six days before `now`
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(DAY_WINDOW - 1);
    first_day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

/// Group the events of the last seven days by weekday.
///
/// Only weekdays with at least one event are returned, sorted by index.
pub fn day_of_week_breakdown(usages: &[Usage], now: DateTime<Utc>) -> Vec<DayActivity> {
    let since = window_start(now);
    let mut days: [Option<DayActivity>; 7] = Default::default();

    for event in usages
        .iter()
        .flat_map(|usage| usage.commits())
        .filter(|event| event.timestamp >= since)
    {
        let slot = event.timestamp.weekday().num_days_from_sunday() as usize;
        let day = days[slot].get_or_insert_with(|| DayActivity {
            day_index: slot as u32 + 1,
            day: DAY_NAMES[slot],
            total_requests: 0,
            success_count: 0,
            failure_count: 0,
        });

        day.total_requests += 1;
        match event.status {
            CommitStatus::Success => day.success_count += 1,
            CommitStatus::Failure => day.failure_count += 1,
        }
    }

    days.into_iter().flatten().collect()
}

/// Sum stored counters across records
pub fn success_failure(usages: &[Usage]) -> SuccessFailure {
    usages
        .iter()
        .fold(SuccessFailure::default(), |mut acc, usage| {
            acc.total_success += usage.success_count();
            acc.total_failure += usage.failure_count();
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::ApiKeyId;
    use crate::domain::usage::{CommitEvent, UsageId};
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn usage_with(events: Vec<CommitEvent>) -> Usage {
        let mut usage = Usage::new(UsageId::generate());
        usage.record_batch(events);
        usage
    }

    fn key(limit: u32) -> ApiKey {
        ApiKey::new(
            ApiKeyId::generate(),
            UsageId::generate(),
            format!("lookup-{}", limit),
            "hash",
            format!("display-{}", limit),
            limit,
        )
    }

    #[test]
    fn test_summarize() {
        let mut expired = key(1);
        expired.set_limit(0);
        let keys = vec![key(5), expired, key(0)];
        let usages = vec![
            usage_with(vec![
                CommitEvent::new("a", CommitStatus::Success),
                CommitEvent::new("b", CommitStatus::Failure),
            ]),
            usage_with(vec![CommitEvent::new("c", CommitStatus::Success)]),
        ];

        let summary = summarize(&keys, &usages);

        assert_eq!(
            summary,
            UsageSummary {
                active_tokens: 2,
                expired_tokens: 1,
                total_requests: 3,
            }
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[], &[]), UsageSummary::default());
    }

    #[test]
    fn test_activity_feed_sorted_and_limited() {
        let first = usage_with(vec![
            CommitEvent::new("old", CommitStatus::Success).at(ts(2024, 1, 1, 8)),
            CommitEvent::new("newest", CommitStatus::Failure).at(ts(2024, 1, 3, 8)),
        ]);
        let second = usage_with(vec![
            CommitEvent::new("middle", CommitStatus::Success).at(ts(2024, 1, 2, 8)),
        ]);

        let feed = activity_feed(&[first, second], 2);

        let messages: Vec<_> = feed.iter().map(|e| e.commit_message.as_str()).collect();
        assert_eq!(messages, vec!["newest", "middle"]);
        assert_eq!(feed[0].status, CommitStatus::Failure);
    }

    #[test]
    fn test_activity_feed_caps_at_fifty() {
        let events = (0..60)
            .map(|i| CommitEvent::new(format!("c{}", i), CommitStatus::Success))
            .collect();

        assert_eq!(activity_feed(&[usage_with(events)], ACTIVITY_FEED_LIMIT).len(), 50);
    }

    #[test]
    fn test_window_start() {
        // Wednesday 2024-05-15 -> Thursday 2024-05-09 00:00 UTC
        assert_eq!(window_start(ts(2024, 5, 15, 17)), ts(2024, 5, 9, 0));
    }

    #[test]
    fn test_day_of_week_breakdown_matches_manual_tally() {
        let now = ts(2024, 5, 15, 17); // Wednesday

        let usages = vec![
            usage_with(vec![
                // Sunday 2024-05-12
                CommitEvent::new("a", CommitStatus::Success).at(ts(2024, 5, 12, 9)),
                CommitEvent::new("b", CommitStatus::Failure).at(ts(2024, 5, 12, 23)),
                // Wednesday 2024-05-15
                CommitEvent::new("c", CommitStatus::Success).at(ts(2024, 5, 15, 1)),
                // Thursday 2024-05-09, first day of the window
                CommitEvent::new("d", CommitStatus::Success).at(ts(2024, 5, 9, 0)),
                // Wednesday 2024-05-08, outside the window
                CommitEvent::new("e", CommitStatus::Success).at(ts(2024, 5, 8, 23)),
            ]),
            usage_with(vec![
                // Saturday 2024-05-11
                CommitEvent::new("f", CommitStatus::Failure).at(ts(2024, 5, 11, 12)),
            ]),
        ];

        let days = day_of_week_breakdown(&usages, now);

        assert_eq!(
            days,
            vec![
                DayActivity {
                    day_index: 1,
                    day: "Sun",
                    total_requests: 2,
                    success_count: 1,
                    failure_count: 1,
                },
                DayActivity {
                    day_index: 4,
                    day: "Wed",
                    total_requests: 1,
                    success_count: 1,
                    failure_count: 0,
                },
                DayActivity {
                    day_index: 5,
                    day: "Thu",
                    total_requests: 1,
                    success_count: 1,
                    failure_count: 0,
                },
                DayActivity {
                    day_index: 7,
                    day: "Sat",
                    total_requests: 1,
                    success_count: 0,
                    failure_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_success_failure() {
        let usages = vec![
            usage_with(vec![
                CommitEvent::new("a", CommitStatus::Success),
                CommitEvent::new("b", CommitStatus::Failure),
            ]),
            usage_with(vec![CommitEvent::new("c", CommitStatus::Success)]),
        ];

        assert_eq!(
            success_failure(&usages),
            SuccessFailure {
                total_success: 2,
                total_failure: 1,
            }
        );
        assert_eq!(success_failure(&[]), SuccessFailure::default());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(DayActivity {
            day_index: 1,
            day: "Sun",
            total_requests: 1,
            success_count: 1,
            failure_count: 0,
        })
        .unwrap();

        assert_eq!(json["dayIndex"], 1);
        assert_eq!(json["day"], "Sun");
        assert_eq!(json["successCount"], 1);
    }
}
