//! Request Metrics
//!
//! A process-scoped observability handle. One `AdvisorMetrics` is built at
//! startup and passed (as `Arc`) into the orchestrator and its adapters;
//! nothing reaches for a global registry, so tests can construct their own.
//!
//! Exposes per-operation outcome counters and a duration histogram in the
//! Prometheus text format.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Histogram upper bounds in seconds
pub const DURATION_BUCKETS: [f64; 12] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Logical operation being measured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Single-shot advice call
    GetAdvice,
    /// Streaming advice call
    StreamAdvice,
    /// Weather provider fetch
    Weather,
    /// Remote geocoding lookup
    Geocode,
}

impl Operation {
    pub const ALL: [Self; 4] = [
        Self::GetAdvice,
        Self::StreamAdvice,
        Self::Weather,
        Self::Geocode,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetAdvice => "get_advice",
            Self::StreamAdvice => "stream_advice",
            Self::Weather => "weather",
            Self::Geocode => "geocode",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// How a measured request ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
    /// Caller went away or its deadline passed; not a failure
    Cancelled,
}

impl Outcome {
    pub const ALL: [Self; 3] = [Self::Success, Self::Error, Self::Cancelled];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug)]
struct OperationStats {
    outcomes: [AtomicU64; 3],
    /// Cumulative: bucket `i` counts observations `<= DURATION_BUCKETS[i]`
    buckets: [AtomicU64; DURATION_BUCKETS.len()],
    count: AtomicU64,
    sum_us: AtomicU64,
}

impl OperationStats {
    fn new() -> Self {
        Self {
            outcomes: std::array::from_fn(|_| AtomicU64::new(0)),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
            sum_us: AtomicU64::new(0),
        }
    }
}

/// Atomic counters and histograms for all advisor operations
#[derive(Debug)]
pub struct AdvisorMetrics {
    start_time: Instant,
    stats: [OperationStats; Operation::ALL.len()],
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stats: std::array::from_fn(|_| OperationStats::new()),
        }
    }

    /// Start timing an operation; finish with [`RequestTimer::finish`]
    pub fn start(&self, operation: Operation) -> RequestTimer<'_> {
        RequestTimer {
            metrics: self,
            operation,
            started: Instant::now(),
        }
    }

    /// Record one finished request
    pub fn record(&self, operation: Operation, outcome: Outcome, elapsed: Duration) {
        let stats = &self.stats[operation.index()];
        stats.outcomes[outcome.index()].fetch_add(1, Ordering::Relaxed);
        stats.count.fetch_add(1, Ordering::Relaxed);
        stats.sum_us.fetch_add(
            u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );

        let secs = elapsed.as_secs_f64();
        for (bound, bucket) in DURATION_BUCKETS.iter().zip(&stats.buckets) {
            if secs <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Requests of `operation` that ended with `outcome`
    pub fn count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.stats[operation.index()].outcomes[outcome.index()].load(Ordering::Relaxed)
    }

    /// Number of duration observations for `operation`
    pub fn observations(&self, operation: Operation) -> u64 {
        self.stats[operation.index()].count.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render everything in the Prometheus text exposition format
    #[allow(clippy::cast_precision_loss)]
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP app_uptime_seconds Application uptime in seconds");
        let _ = writeln!(out, "# TYPE app_uptime_seconds counter");
        let _ = writeln!(out, "app_uptime_seconds {}\n", self.uptime_seconds());

        let _ = writeln!(out, "# HELP requests_total Requests by operation and outcome");
        let _ = writeln!(out, "# TYPE requests_total counter");
        for operation in Operation::ALL {
            for outcome in Outcome::ALL {
                let _ = writeln!(
                    out,
                    "requests_total{{operation=\"{}\",status=\"{}\"}} {}",
                    operation.as_str(),
                    outcome.as_str(),
                    self.count(operation, outcome)
                );
            }
        }
        out.push('\n');

        let _ = writeln!(out, "# HELP request_duration_seconds Request duration");
        let _ = writeln!(out, "# TYPE request_duration_seconds histogram");
        for operation in Operation::ALL {
            let stats = &self.stats[operation.index()];
            let name = operation.as_str();
            for (bound, bucket) in DURATION_BUCKETS.iter().zip(&stats.buckets) {
                let _ = writeln!(
                    out,
                    "request_duration_seconds_bucket{{operation=\"{name}\",le=\"{bound}\"}} {}",
                    bucket.load(Ordering::Relaxed)
                );
            }
            let count = stats.count.load(Ordering::Relaxed);
            let sum = stats.sum_us.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            let _ = writeln!(
                out,
                "request_duration_seconds_bucket{{operation=\"{name}\",le=\"+Inf\"}} {count}"
            );
            let _ = writeln!(out, "request_duration_seconds_sum{{operation=\"{name}\"}} {sum:.6}");
            let _ = writeln!(out, "request_duration_seconds_count{{operation=\"{name}\"}} {count}");
        }

        out
    }
}

/// Times one request; consumed by [`RequestTimer::finish`]
#[derive(Debug)]
#[must_use = "a timer records nothing until finished"]
pub struct RequestTimer<'a> {
    metrics: &'a AdvisorMetrics,
    operation: Operation,
    started: Instant,
}

impl RequestTimer<'_> {
    pub fn finish(self, outcome: Outcome) {
        self.metrics
            .record(self.operation, outcome, self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = AdvisorMetrics::new();
        for operation in Operation::ALL {
            for outcome in Outcome::ALL {
                assert_eq!(metrics.count(operation, outcome), 0);
            }
            assert_eq!(metrics.observations(operation), 0);
        }
    }

    #[test]
    fn record_counts_outcome_and_duration() {
        let metrics = AdvisorMetrics::new();
        metrics.record(Operation::GetAdvice, Outcome::Success, Duration::from_millis(40));
        metrics.record(Operation::GetAdvice, Outcome::Error, Duration::from_millis(3));

        assert_eq!(metrics.count(Operation::GetAdvice, Outcome::Success), 1);
        assert_eq!(metrics.count(Operation::GetAdvice, Outcome::Error), 1);
        assert_eq!(metrics.count(Operation::StreamAdvice, Outcome::Success), 0);
        assert_eq!(metrics.observations(Operation::GetAdvice), 2);
    }

    #[test]
    fn timer_records_on_finish() {
        let metrics = AdvisorMetrics::new();
        metrics.start(Operation::Weather).finish(Outcome::Cancelled);
        assert_eq!(metrics.count(Operation::Weather, Outcome::Cancelled), 1);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let metrics = AdvisorMetrics::new();
        metrics.record(Operation::Geocode, Outcome::Success, Duration::from_millis(30));

        let text = metrics.render_prometheus();
        assert!(text.contains(r#"request_duration_seconds_bucket{operation="geocode",le="0.025"} 0"#));
        assert!(text.contains(r#"request_duration_seconds_bucket{operation="geocode",le="0.05"} 1"#));
        assert!(text.contains(r#"request_duration_seconds_bucket{operation="geocode",le="10"} 1"#));
        assert!(text.contains(r#"request_duration_seconds_bucket{operation="geocode",le="+Inf"} 1"#));
        assert!(text.contains(r#"request_duration_seconds_count{operation="geocode"} 1"#));
    }

    #[test]
    fn render_includes_every_series() {
        let metrics = AdvisorMetrics::new();
        metrics.record(Operation::StreamAdvice, Outcome::Success, Duration::from_secs(2));

        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE requests_total counter"));
        assert!(text.contains(r#"requests_total{operation="stream_advice",status="success"} 1"#));
        assert!(text.contains(r#"requests_total{operation="get_advice",status="error"} 0"#));
        assert!(text.contains("# TYPE request_duration_seconds histogram"));
    }
}
