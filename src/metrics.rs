use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::warn;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Reads `OBSERVABILITY_ENABLED` once; anything but `false` or `0` enables it.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true) // Enabled by default
    })
}

/// Installs the Prometheus recorder and starts its upkeep task.
///
/// Returns `None` when observability is disabled or the recorder cannot be
/// installed; request handling keeps working either way.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = match PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )
        .and_then(|builder| builder.install_recorder())
    {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            return None;
        }
    };

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

/// Records request counts, latency histograms and in-flight requests.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri_path = req.uri().path().to_owned();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or(uri_path);

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();
    let status_str = status.to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status_str).increment(1);

    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    let status_category = match status {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    counter!("http_requests_by_status", "status_category" => status_category).increment(1);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for metrics server
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business counters

pub fn track_login_success() {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "success").increment(1);
}

pub fn track_login_failure(reason: &'static str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "status" => "failure", "reason" => reason).increment(1);
}

pub fn track_user_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_created_total").increment(1);
}

pub fn track_enrollment_created(level: i32) {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_created_total", "level" => level.to_string()).increment(1);
}

pub fn track_grades_entered(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("grades_entered_total").increment(count as u64);
}

pub fn track_results_computed(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("results_computed_total").increment(count as u64);
}

/// Counts validated payments and the amount collected.
pub fn track_payment_validated(amount: f64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("payments_validated_total").increment(1);
    histogram!("payment_amount").record(amount);
}

pub fn track_document_generated(document_type: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("documents_generated_total", "type" => document_type.to_string()).increment(1);
}

/// New conflicts recorded by a detection run, labelled by kind.
pub fn track_conflicts_detected(kind: &str, count: i64) {
    if !is_observability_enabled() || count <= 0 {
        return;
    }
    counter!("schedule_conflicts_detected_total", "kind" => kind.to_string())
        .increment(count as u64);
}

pub fn track_notification_sent(channel: &str, delivered: bool) {
    if !is_observability_enabled() {
        return;
    }
    counter!(
        "notifications_sent_total",
        "channel" => channel.to_string(),
        "delivered" => delivered.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_counted_per_kind() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            track_conflicts_detected("ROOM", 2);
            track_conflicts_detected("CAPACITY", 1);
            track_conflicts_detected("TEACHER", 0);
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"schedule_conflicts_detected_total{kind="ROOM"} 2"#));
        assert!(rendered.contains(r#"schedule_conflicts_detected_total{kind="CAPACITY"} 1"#));
        assert!(!rendered.contains(r#"kind="TEACHER""#));
    }
}
