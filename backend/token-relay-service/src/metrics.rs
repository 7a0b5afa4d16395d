use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "token_relay_http_requests_total",
            "Total HTTP requests handled by token-relay-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create token_relay_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register token_relay_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "token_relay_http_request_duration_seconds",
            "HTTP request latency for token-relay-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0]),
        &["method", "path", "status"],
    )
    .expect("failed to create token_relay_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register token_relay_http_request_duration_seconds");
    histogram
});

static TOKEN_REGISTRATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "token_relay_registrations_total",
        "Device token registrations accepted",
    )
    .expect("failed to create token_relay_registrations_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register token_relay_registrations_total");
    counter
});

static BROADCAST_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "token_relay_broadcast_deliveries_total",
            "Per-token broadcast outcomes",
        ),
        &["outcome"],
    )
    .expect("failed to create token_relay_broadcast_deliveries_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register token_relay_broadcast_deliveries_total");
    counter
});

static PRUNED_RECIPIENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "token_relay_pruned_recipients_total",
        "Recipients removed after a permanent delivery failure",
    )
    .expect("failed to create token_relay_pruned_recipients_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register token_relay_pruned_recipients_total");
    counter
});

static TOPIC_PUBLISHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "token_relay_topic_publishes_total",
            "Topic publishes triggered by admin messages",
        ),
        &["status"],
    )
    .expect("failed to create token_relay_topic_publishes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register token_relay_topic_publishes_total");
    counter
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn record_registration() {
    TOKEN_REGISTRATIONS_TOTAL.inc();
}

pub fn record_broadcast(success: usize, failure: usize) {
    BROADCAST_DELIVERIES_TOTAL
        .with_label_values(&["success"])
        .inc_by(success as u64);
    BROADCAST_DELIVERIES_TOTAL
        .with_label_values(&["failure"])
        .inc_by(failure as u64);
}

pub fn record_pruned(count: usize) {
    PRUNED_RECIPIENTS_TOTAL.inc_by(count as u64);
}

pub fn record_topic_publish(ok: bool) {
    TOPIC_PUBLISHES_TOTAL
        .with_label_values(&[if ok { "ok" } else { "failed" }])
        .inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

/// Records count and latency of every HTTP request, labelled by route pattern
pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Route pattern keeps label cardinality bounded
        let path = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(_) => {
                    observe_http_request(&method, &path, 500, elapsed);
                }
            }
            result
        })
    }
}
