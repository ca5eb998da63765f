//! Request logging and subscriber setup.
//!
//! Events go to the console, to two daily-rolling files and, when a
//! collector is reachable, to an OTLP endpoint.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::{KeyValue, global, trace::TraceError};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{self as sdktrace, RandomIdGenerator, Sampler, Tracer},
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_LOG_DIR: &str = "storage/logs";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    ClientError,
    ServerError,
}

impl Outcome {
    fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Outcome::ClientError,
            500..=599 => Outcome::ServerError,
            _ => Outcome::Completed,
        }
    }
}

/// Logs every request under a fresh `request_id`. 4xx are warnings, 5xx errors.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let request_id = uuid::Uuid::new_v4();

    info!(%request_id, %method, %path, "Incoming request");

    let response = next.run(req).await;
    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis();

    match Outcome::from_status(status) {
        Outcome::Completed => {
            info!(%request_id, %method, %path, status, latency_ms, "Request completed")
        }
        Outcome::ClientError => {
            warn!(%request_id, %method, %path, status, latency_ms, "Client error")
        }
        Outcome::ServerError => {
            error!(%request_id, %method, %path, status, latency_ms, "Server error")
        }
    }

    response
}

fn init_tracer() -> Result<Tracer, TraceError> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new([
        KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new("environment", environment),
    ]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)
}

/// `campus.log` keeps errors in plain text, `campus.json` keeps info and up.
fn file_layers(log_dir: &str) -> [BoxedLayer; 2] {
    let errors = fmt::layer()
        .with_writer(RollingFileAppender::new(Rotation::DAILY, log_dir, "campus.log"))
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("error"))
        .boxed();

    let structured = fmt::layer()
        .json()
        .with_writer(RollingFileAppender::new(Rotation::DAILY, log_dir, "campus.json"))
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(EnvFilter::new("info"))
        .boxed();

    [errors, structured]
}

fn console_layer() -> BoxedLayer {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,tower_http=warn,sqlx=warn,tonic=info",
            env!("CARGO_CRATE_NAME")
        ))
    });

    fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_filter(filter)
        .boxed()
}

/// Installs the global subscriber. `LOG_DIR` overrides `storage/logs`.
pub fn init_tracing() -> anyhow::Result<()> {
    use anyhow::Context;

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir))?;

    let mut layers = vec![console_layer()];
    layers.extend(file_layers(&log_dir));

    let otel_error = match init_tracer() {
        Ok(tracer) => {
            layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
            None
        }
        Err(e) => Some(e),
    };

    tracing_subscriber::registry().with(layers).init();

    match otel_error {
        None => info!(%log_dir, "Tracing initialized with OpenTelemetry export"),
        Some(e) => warn!(error = %e, %log_dir, "OpenTelemetry unavailable, logging locally only"),
    }
    Ok(())
}

pub async fn shutdown_tracer() {
    info!("Flushing OpenTelemetry spans");
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_follows_status_class() {
        assert_eq!(Outcome::from_status(201), Outcome::Completed);
        assert_eq!(Outcome::from_status(304), Outcome::Completed);
        assert_eq!(Outcome::from_status(403), Outcome::ClientError);
        assert_eq!(Outcome::from_status(422), Outcome::ClientError);
        assert_eq!(Outcome::from_status(503), Outcome::ServerError);
    }
}
