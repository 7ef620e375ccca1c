//! Run metrics
//!
//! Counters go through the `metrics` facade. Nothing is recorded unless the
//! embedding process installs a recorder.

/// Metric name with the crate prefix
macro_rules! metric_name {
    ($phase:literal, $name:literal) => {
        concat!("sg_importer_", $phase, "_", $name)
    };
}

/// Metrics for the group pipeline
pub struct GroupMetrics;

impl GroupMetrics {
    pub fn record_rows_read(count: usize) {
        ::metrics::counter!(metric_name!("groups", "rows_read_total")).increment(count as u64);
    }

    pub fn record_group_emitted() {
        ::metrics::counter!(metric_name!("groups", "blocks_emitted_total")).increment(1);
    }

    pub fn record_group_excluded() {
        ::metrics::counter!(metric_name!("groups", "excluded_total")).increment(1);
    }
}

/// Metrics for the rule pipeline
pub struct RuleMetrics;

impl RuleMetrics {
    pub fn record_rows_read(count: usize) {
        ::metrics::counter!(metric_name!("rules", "rows_read_total")).increment(count as u64);
    }

    pub fn record_remote_rules_loaded(count: usize) {
        ::metrics::counter!(metric_name!("rules", "remote_loaded_total")).increment(count as u64);
    }

    pub fn record_rule_derived() {
        ::metrics::counter!(metric_name!("rules", "derived_total")).increment(1);
    }

    pub fn record_rule_excluded() {
        ::metrics::counter!(metric_name!("rules", "excluded_total")).increment(1);
    }

    pub fn record_match(matched: bool) {
        if matched {
            ::metrics::counter!(metric_name!("rules", "matched_total")).increment(1);
        } else {
            ::metrics::counter!(metric_name!("rules", "unmatched_total")).increment(1);
        }
    }

    pub fn record_duplicate_imports(count: usize) {
        ::metrics::counter!(metric_name!("rules", "duplicate_imports_total")).increment(count as u64);
    }
}
