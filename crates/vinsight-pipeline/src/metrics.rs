//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops unless the binary
//! installs a recorder.

use metrics::{counter, histogram};

use vinsight_models::Stage;

/// Metric names as constants for consistency.
pub mod names {
    pub const INGESTS_TOTAL: &str = "vinsight_ingests_total";
    pub const INGEST_DURATION_SECONDS: &str = "vinsight_ingest_duration_seconds";
    pub const KEYFRAMES_RETAINED: &str = "vinsight_keyframes_retained";
    pub const ANALYSES_TOTAL: &str = "vinsight_analyses_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "vinsight_analysis_duration_seconds";
    pub const TRANSCRIPT_CACHE_TOTAL: &str = "vinsight_transcript_cache_total";
    pub const STAGE_DEGRADED_TOTAL: &str = "vinsight_stage_degraded_total";
}

pub fn record_ingest(outcome: &'static str, duration_secs: f64) {
    let labels = [("outcome", outcome)];
    counter!(names::INGESTS_TOTAL, &labels).increment(1);
    histogram!(names::INGEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_keyframes(count: usize) {
    histogram!(names::KEYFRAMES_RETAINED).record(count as f64);
}

pub fn record_analysis(outcome: &'static str, duration_secs: f64) {
    let labels = [("outcome", outcome)];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_transcript_cache(hit: bool) {
    let labels = [("result", if hit { "hit" } else { "miss" })];
    counter!(names::TRANSCRIPT_CACHE_TOTAL, &labels).increment(1);
}

pub fn record_degraded(stage: Stage) {
    let labels = [("stage", stage.as_str())];
    counter!(names::STAGE_DEGRADED_TOTAL, &labels).increment(1);
}
