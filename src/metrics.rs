//! Process-wide counters and their Prometheus text exposition.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::dispatch::DispatchReport;
use crate::telemetry::TelemetrySink;

const ROUTE_COUNT: usize = 7;

/// Route labels in exposition order. `none` is a well-formed payload without
/// a message; `invalid` is a body that failed to decode.
pub const ROUTE_LABELS: [&str; ROUTE_COUNT] = [
    "pricing", "demo", "support", "general", "non_text", "none", "invalid",
];

// Webhook latency bucket upper bounds (ms).
const BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; BUCKET_COUNT] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

pub struct BridgeMetrics {
    webhooks_total: AtomicU64,
    route_counts: [AtomicU64; ROUTE_COUNT],
    messages_sent_total: AtomicU64,
    delivery_failures_total: AtomicU64,
    completion_requests_total: AtomicU64,
    completion_failures_total: AtomicU64,
    dispatch_errors_total: AtomicU64,
    hist_counts: [AtomicU64; BUCKET_COUNT],
    hist_sum_ms: AtomicU64,
    hist_count: AtomicU64,
    process_start_epoch: f64,
    process_start_instant: Instant,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    pub fn new() -> Self {
        let start = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            webhooks_total: AtomicU64::new(0),
            route_counts: Default::default(),
            messages_sent_total: AtomicU64::new(0),
            delivery_failures_total: AtomicU64::new(0),
            completion_requests_total: AtomicU64::new(0),
            completion_failures_total: AtomicU64::new(0),
            dispatch_errors_total: AtomicU64::new(0),
            hist_counts: Default::default(),
            hist_sum_ms: AtomicU64::new(0),
            hist_count: AtomicU64::new(0),
            process_start_epoch: start.as_secs_f64(),
            process_start_instant: Instant::now(),
        }
    }

    pub fn record_webhook(&self, route: &str, latency_ms: u64) {
        self.webhooks_total.fetch_add(1, Ordering::Relaxed);
        if let Some(idx) = ROUTE_LABELS.iter().position(|l| *l == route) {
            self.route_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.hist_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.hist_count.fetch_add(1, Ordering::Relaxed);
        if let Some(idx) = LATENCY_BUCKETS_MS.iter().position(|ub| latency_ms <= *ub) {
            self.hist_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_dispatch(&self, report: &DispatchReport) {
        self.messages_sent_total
            .fetch_add(report.replies_sent as u64, Ordering::Relaxed);
        self.delivery_failures_total
            .fetch_add(report.delivery_failures as u64, Ordering::Relaxed);
        if report.model_used {
            self.completion_requests_total.fetch_add(1, Ordering::Relaxed);
        }
        if report.model_failed {
            self.completion_failures_total.fetch_add(1, Ordering::Relaxed);
        }
        if report.error.is_some() {
            self.dispatch_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn webhooks_total(&self) -> u64 {
        self.webhooks_total.load(Ordering::Relaxed)
    }

    pub fn route_count(&self, route: &str) -> u64 {
        ROUTE_LABELS
            .iter()
            .position(|l| *l == route)
            .map(|idx| self.route_counts[idx].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.process_start_instant.elapsed().as_secs_f64()
    }

    /// Prometheus text format, version 0.0.4.
    pub fn render(&self, telemetry: &TelemetrySink) -> String {
        let mut buf = String::new();
        let counter = |buf: &mut String, name: &str, help: &str, value: u64| {
            writeln!(buf, "# HELP {name} {help}").ok();
            writeln!(buf, "# TYPE {name} counter").ok();
            writeln!(buf, "{name} {value}").ok();
        };
        let load = |a: &AtomicU64| a.load(Ordering::Relaxed);

        counter(
            &mut buf,
            "wabridge_webhooks_total",
            "Inbound POST webhooks handled",
            load(&self.webhooks_total),
        );

        writeln!(buf, "# HELP wabridge_route_total Webhooks by reply route").ok();
        writeln!(buf, "# TYPE wabridge_route_total counter").ok();
        for (label, count) in ROUTE_LABELS.iter().zip(self.route_counts.iter()) {
            writeln!(buf, "wabridge_route_total{{route=\"{}\"}} {}", label, load(count)).ok();
        }

        counter(
            &mut buf,
            "wabridge_messages_sent_total",
            "WhatsApp replies accepted by the Graph API",
            load(&self.messages_sent_total),
        );
        counter(
            &mut buf,
            "wabridge_delivery_failures_total",
            "WhatsApp replies rejected with a non-2xx status",
            load(&self.delivery_failures_total),
        );
        counter(
            &mut buf,
            "wabridge_completion_requests_total",
            "Chat completion calls made",
            load(&self.completion_requests_total),
        );
        counter(
            &mut buf,
            "wabridge_completion_failures_total",
            "Chat completion calls that failed or were rejected",
            load(&self.completion_failures_total),
        );
        counter(
            &mut buf,
            "wabridge_dispatch_errors_total",
            "Dispatches aborted by a transport or decode error",
            load(&self.dispatch_errors_total),
        );
        counter(
            &mut buf,
            "wabridge_telemetry_lines_total",
            "Telemetry JSON lines written",
            telemetry.lines_total(),
        );
        counter(
            &mut buf,
            "wabridge_telemetry_write_errors_total",
            "Telemetry JSON line write failures",
            telemetry.write_errors_total(),
        );

        writeln!(
            buf,
            "# HELP wabridge_webhook_latency_ms Webhook handling latency histogram milliseconds"
        )
        .ok();
        writeln!(buf, "# TYPE wabridge_webhook_latency_ms histogram").ok();
        let mut cumulative: u64 = 0;
        for (ub, c) in LATENCY_BUCKETS_MS.iter().zip(self.hist_counts.iter()) {
            cumulative += load(c);
            writeln!(
                buf,
                "wabridge_webhook_latency_ms_bucket{{le=\"{}\"}} {}",
                ub, cumulative
            )
            .ok();
        }
        let count = load(&self.hist_count);
        writeln!(buf, "wabridge_webhook_latency_ms_bucket{{le=\"+Inf\"}} {}", count).ok();
        writeln!(buf, "wabridge_webhook_latency_ms_sum {}", load(&self.hist_sum_ms)).ok();
        writeln!(buf, "wabridge_webhook_latency_ms_count {}", count).ok();

        writeln!(
            buf,
            "# HELP wabridge_log_file_size_bytes Current size in bytes of the telemetry log (0 if disabled)\n# TYPE wabridge_log_file_size_bytes gauge"
        )
        .ok();
        writeln!(buf, "wabridge_log_file_size_bytes {}", telemetry.log_file_size_bytes()).ok();
        writeln!(
            buf,
            "# HELP wabridge_build_info Build information\n# TYPE wabridge_build_info gauge"
        )
        .ok();
        writeln!(
            buf,
            "wabridge_build_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )
        .ok();
        writeln!(
            buf,
            "# HELP wabridge_process_start_time_seconds Process start time (Unix epoch seconds)\n# TYPE wabridge_process_start_time_seconds gauge"
        )
        .ok();
        writeln!(
            buf,
            "wabridge_process_start_time_seconds {}",
            self.process_start_epoch
        )
        .ok();
        writeln!(
            buf,
            "# HELP wabridge_process_uptime_seconds Process uptime seconds\n# TYPE wabridge_process_uptime_seconds gauge"
        )
        .ok();
        writeln!(buf, "wabridge_process_uptime_seconds {}", self.uptime_secs()).ok();
        buf
    }
}
