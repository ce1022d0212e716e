//! Dashboard rollup over aggregated topic groups.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::topics::{FeedbackStats, TopicGroup};

const UNKNOWN: &str = "Unknown";
const NO_PLATFORM: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub topic_count: i64,
    pub by_vertical: BTreeMap<String, i64>,
    pub by_platform: BTreeMap<String, i64>,
    pub by_geo: BTreeMap<String, i64>,
    pub feedback_totals: FeedbackStats,
}

/// Sum group counts per vertical, platform and geo, and total the feedback
/// counters across all groups.
#[must_use]
pub fn summarize(groups: &[TopicGroup]) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary::default();

    for group in groups {
        summary.topic_count += group.count;
        *summary
            .by_vertical
            .entry(bucket(&group.vertical, UNKNOWN))
            .or_default() += group.count;
        *summary
            .by_platform
            .entry(bucket(&group.platform, NO_PLATFORM))
            .or_default() += group.count;
        *summary
            .by_geo
            .entry(bucket(&group.geo, UNKNOWN))
            .or_default() += group.count;
        summary.feedback_totals += group.feedback_stats;
    }

    summary
}

fn bucket(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
