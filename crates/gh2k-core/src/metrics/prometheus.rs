//! Prometheus metrics export.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram bucket boundaries in milliseconds for publish latency.
/// Converts to seconds: [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
const PUBLISH_DURATION_BUCKETS_MS: [u64; 7] = [10, 25, 50, 100, 250, 500, 1000];

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStage {
    /// Feed fetch or decode
    Fetch,
    /// Event serialization
    Encode,
    /// Kinesis put
    Publish,
}

impl ErrorStage {
    /// Get the label value for Prometheus export.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorStage::Fetch => "fetch",
            ErrorStage::Encode => "encode",
            ErrorStage::Publish => "publish",
        }
    }
}

/// Producer metrics with counters, gauges, and a histogram.
pub struct ProducerMetrics {
    // === COUNTERS ===
    cycles_total: AtomicU64,
    cycles_failed_total: AtomicU64,
    events_fetched_total: AtomicU64,
    events_published_total: AtomicU64,
    errors_fetch: AtomicU64,
    errors_encode: AtomicU64,
    errors_publish: AtomicU64,
    /// Subset of publish errors caused by shard throughput limits
    throttled_total: AtomicU64,

    // === GAUGES ===
    last_batch_size: AtomicU64,

    // === HISTOGRAM: publish_duration_seconds ===
    publish_duration_sum_ms: AtomicU64,
    publish_duration_count: AtomicU64,
    /// Cumulative buckets, last slot is +Inf
    publish_duration_buckets: [AtomicU64; 8],
}

impl ProducerMetrics {
    pub fn new() -> Self {
        Self {
            cycles_total: AtomicU64::new(0),
            cycles_failed_total: AtomicU64::new(0),
            events_fetched_total: AtomicU64::new(0),
            events_published_total: AtomicU64::new(0),
            errors_fetch: AtomicU64::new(0),
            errors_encode: AtomicU64::new(0),
            errors_publish: AtomicU64::new(0),
            throttled_total: AtomicU64::new(0),
            last_batch_size: AtomicU64::new(0),
            publish_duration_sum_ms: AtomicU64::new(0),
            publish_duration_count: AtomicU64::new(0),
            publish_duration_buckets: Default::default(),
        }
    }

    // === RECORDING ===

    /// Record a completed cycle, successful or not.
    pub fn record_cycle(&self, failed: bool) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.cycles_failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a fetched batch; also updates the batch size gauge.
    pub fn record_fetch(&self, events: usize) {
        self.events_fetched_total
            .fetch_add(events as u64, Ordering::Relaxed);
        self.last_batch_size.store(events as u64, Ordering::Relaxed);
    }

    /// Record one successful publish and its latency.
    pub fn record_publish(&self, duration: Duration) {
        self.events_published_total.fetch_add(1, Ordering::Relaxed);

        let duration_ms = duration.as_millis() as u64;
        self.publish_duration_sum_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
        self.publish_duration_count.fetch_add(1, Ordering::Relaxed);

        for (i, &bucket_ms) in PUBLISH_DURATION_BUCKETS_MS.iter().enumerate() {
            if duration_ms <= bucket_ms {
                self.publish_duration_buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.publish_duration_buckets[7].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, stage: ErrorStage) {
        match stage {
            ErrorStage::Fetch => self.errors_fetch.fetch_add(1, Ordering::Relaxed),
            ErrorStage::Encode => self.errors_encode.fetch_add(1, Ordering::Relaxed),
            ErrorStage::Publish => self.errors_publish.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_throttled(&self) {
        self.throttled_total.fetch_add(1, Ordering::Relaxed);
    }

    // === GETTERS ===

    pub fn cycles_total(&self) -> u64 {
        self.cycles_total.load(Ordering::Relaxed)
    }

    pub fn cycles_failed_total(&self) -> u64 {
        self.cycles_failed_total.load(Ordering::Relaxed)
    }

    pub fn events_fetched_total(&self) -> u64 {
        self.events_fetched_total.load(Ordering::Relaxed)
    }

    pub fn events_published_total(&self) -> u64 {
        self.events_published_total.load(Ordering::Relaxed)
    }

    pub fn errors_by_stage(&self, stage: ErrorStage) -> u64 {
        match stage {
            ErrorStage::Fetch => self.errors_fetch.load(Ordering::Relaxed),
            ErrorStage::Encode => self.errors_encode.load(Ordering::Relaxed),
            ErrorStage::Publish => self.errors_publish.load(Ordering::Relaxed),
        }
    }

    /// Sum of errors across all stages.
    pub fn errors_total(&self) -> u64 {
        [ErrorStage::Fetch, ErrorStage::Encode, ErrorStage::Publish]
            .iter()
            .map(|s| self.errors_by_stage(*s))
            .sum()
    }

    pub fn throttled_total(&self) -> u64 {
        self.throttled_total.load(Ordering::Relaxed)
    }

    pub fn last_batch_size(&self) -> u64 {
        self.last_batch_size.load(Ordering::Relaxed)
    }

    /// Get publish latency histogram data for Prometheus export.
    pub fn publish_duration_histogram(&self) -> PublishDurationHistogram {
        let mut buckets = [(0.0, 0); 7];
        for (i, &bucket_ms) in PUBLISH_DURATION_BUCKETS_MS.iter().enumerate() {
            buckets[i] = (
                bucket_ms as f64 / 1000.0,
                self.publish_duration_buckets[i].load(Ordering::Relaxed),
            );
        }

        PublishDurationHistogram {
            sum_seconds: self.publish_duration_sum_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            count: self.publish_duration_count.load(Ordering::Relaxed),
            buckets,
            inf_bucket: self.publish_duration_buckets[7].load(Ordering::Relaxed),
        }
    }

    /// Export all metrics in Prometheus text format.
    ///
    /// # Example
    /// ```
    /// use gh2k_core::metrics::ProducerMetrics;
    ///
    /// let metrics = ProducerMetrics::new();
    /// metrics.record_fetch(30);
    /// let text = metrics.export_prometheus_text();
    /// assert!(text.contains("gh2k_events_fetched_total 30"));
    /// ```
    pub fn export_prometheus_text(&self) -> String {
        let mut out = String::with_capacity(2048);

        counter(
            &mut out,
            "gh2k_cycles_total",
            "Poll cycles run",
            self.cycles_total(),
        );
        counter(
            &mut out,
            "gh2k_cycles_failed_total",
            "Poll cycles abandoned after an error",
            self.cycles_failed_total(),
        );
        counter(
            &mut out,
            "gh2k_events_fetched_total",
            "Events read from the feed",
            self.events_fetched_total(),
        );
        counter(
            &mut out,
            "gh2k_events_published_total",
            "Events written to Kinesis",
            self.events_published_total(),
        );

        let _ = writeln!(out, "# HELP gh2k_errors_total Errors by pipeline stage");
        let _ = writeln!(out, "# TYPE gh2k_errors_total counter");
        for stage in [ErrorStage::Fetch, ErrorStage::Encode, ErrorStage::Publish] {
            let _ = writeln!(
                out,
                "gh2k_errors_total{{stage=\"{}\"}} {}",
                stage.as_label(),
                self.errors_by_stage(stage)
            );
        }
        out.push('\n');

        counter(
            &mut out,
            "gh2k_publish_throttled_total",
            "Puts rejected for exceeding shard throughput",
            self.throttled_total(),
        );

        let _ = writeln!(
            out,
            "# HELP gh2k_last_batch_size Events in the most recent feed response"
        );
        let _ = writeln!(out, "# TYPE gh2k_last_batch_size gauge");
        let _ = writeln!(out, "gh2k_last_batch_size {}\n", self.last_batch_size());

        let hist = self.publish_duration_histogram();
        let _ = writeln!(
            out,
            "# HELP gh2k_publish_duration_seconds Latency of Kinesis puts"
        );
        let _ = writeln!(out, "# TYPE gh2k_publish_duration_seconds histogram");
        for (le, count) in &hist.buckets {
            let _ = writeln!(
                out,
                "gh2k_publish_duration_seconds_bucket{{le=\"{}\"}} {}",
                le, count
            );
        }
        let _ = writeln!(
            out,
            "gh2k_publish_duration_seconds_bucket{{le=\"+Inf\"}} {}",
            hist.inf_bucket
        );
        let _ = writeln!(out, "gh2k_publish_duration_seconds_sum {}", hist.sum_seconds);
        let _ = writeln!(out, "gh2k_publish_duration_seconds_count {}", hist.count);

        out
    }
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} counter", name);
    let _ = writeln!(out, "{} {}\n", name, value);
}

impl Default for ProducerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish latency histogram data.
#[derive(Debug, Clone)]
pub struct PublishDurationHistogram {
    pub sum_seconds: f64,
    pub count: u64,
    /// (upper bound in seconds, cumulative count)
    pub buckets: [(f64, u64); 7],
    pub inf_bucket: u64,
}
