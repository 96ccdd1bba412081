use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use farm_core::RouteKind;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    chat_requests_total: AtomicU64,
    crop_replies_total: AtomicU64,
    transaction_replies_total: AtomicU64,
    faq_hits_total: AtomicU64,
    generated_replies_total: AtomicU64,
    generator_failures_total: AtomicU64,
    invalid_requests_total: AtomicU64,
    predictions_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub chat_requests_total: u64,
    pub crop_replies_total: u64,
    pub transaction_replies_total: u64,
    pub faq_hits_total: u64,
    pub generated_replies_total: u64,
    pub generator_failures_total: u64,
    pub invalid_requests_total: u64,
    pub predictions_total: u64,
    pub avg_chat_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_chat_request(&self) {
        self.chat_requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("farm_chat_requests_total").increment(1);
    }

    pub fn record_route(&self, route: RouteKind) {
        let counter = match route {
            RouteKind::CropAttribute => &self.crop_replies_total,
            RouteKind::TransactionCount => &self.transaction_replies_total,
            RouteKind::Faq => &self.faq_hits_total,
            RouteKind::Generated => &self.generated_replies_total,
            RouteKind::Apology => &self.generator_failures_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("farm_chat_replies_total", "route" => route.as_str()).increment(1);
    }

    pub fn inc_invalid_request(&self) {
        self.invalid_requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("farm_chat_invalid_requests_total").increment(1);
    }

    pub fn inc_prediction(&self) {
        self.predictions_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("farm_predictions_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.chat_requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            chat_requests_total: requests,
            crop_replies_total: self.crop_replies_total.load(Ordering::Relaxed),
            transaction_replies_total: self.transaction_replies_total.load(Ordering::Relaxed),
            faq_hits_total: self.faq_hits_total.load(Ordering::Relaxed),
            generated_replies_total: self.generated_replies_total.load(Ordering::Relaxed),
            generator_failures_total: self.generator_failures_total.load(Ordering::Relaxed),
            invalid_requests_total: self.invalid_requests_total.load(Ordering::Relaxed),
            predictions_total: self.predictions_total.load(Ordering::Relaxed),
            avg_chat_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,farm_api=info,farm_agents=info,farm_storage=info,farm_ml=info,tower_http=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
