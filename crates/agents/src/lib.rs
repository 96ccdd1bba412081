use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use farm_core::replies::{
    fertilizer_reply, harvest_reply, overview_reply, season_reply, supplier_reply,
    transaction_reply, water_reply,
};
use farm_core::{
    detect_crop, generator_prompt, match_crop_attribute, match_transaction_query,
    normalize_question, CropAttribute, RouteKind, RoutedReply, APOLOGY_REPLY,
};
use farm_ml::TextGenerator;
use farm_observability::AppMetrics;
use farm_storage::KnowledgeRepository;
use tracing::{error, info, instrument, warn};

pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a question to exactly one reply: crop attribute, transaction count,
/// FAQ answer, generated text, or the apology. Never fails.
#[derive(Clone)]
pub struct ChatRouter<S, G>
where
    S: KnowledgeRepository,
    G: TextGenerator,
{
    store: Arc<S>,
    generator: Arc<G>,
    metrics: Arc<AppMetrics>,
    generator_timeout: Duration,
}

impl<S, G> ChatRouter<S, G>
where
    S: KnowledgeRepository,
    G: TextGenerator,
{
    pub fn new(
        store: Arc<S>,
        generator: Arc<G>,
        metrics: Arc<AppMetrics>,
        generator_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            metrics,
            generator_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[instrument(skip(self, question))]
    pub async fn reply(&self, question: &str) -> RoutedReply {
        let started = Instant::now();
        self.metrics.inc_chat_request();

        let routed = match self.route(question).await {
            Ok(routed) => routed,
            Err(err) => {
                error!(error = %err, "knowledge lookup failed");
                RoutedReply {
                    reply: APOLOGY_REPLY.to_string(),
                    route: RouteKind::Apology,
                    crop: None,
                }
            }
        };

        self.metrics.record_route(routed.route);
        self.metrics.observe_latency(started.elapsed());
        info!(
            route = routed.route.as_str(),
            crop = routed.crop.as_deref().unwrap_or(""),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat handled"
        );

        routed
    }

    async fn route(&self, question: &str) -> Result<RoutedReply> {
        let normalized = normalize_question(question);

        let crop_names = self.store.list_crop_names().await?;
        let crop = detect_crop(crop_names.iter().map(String::as_str), &normalized);

        if let Some(crop) = crop.as_deref() {
            if let Some(attribute) = match_crop_attribute(&normalized) {
                let reply = self.crop_reply(crop, attribute).await?;
                return Ok(RoutedReply {
                    reply,
                    route: RouteKind::CropAttribute,
                    crop: Some(crop.to_string()),
                });
            }
        }

        if let Some(query) = match_transaction_query(&normalized) {
            let count = self.store.count_transactions(query.status()).await?;
            return Ok(RoutedReply {
                reply: transaction_reply(query, count),
                route: RouteKind::TransactionCount,
                crop,
            });
        }

        if let Some(answer) = self.store.faq_answer(&normalized).await? {
            return Ok(RoutedReply {
                reply: answer,
                route: RouteKind::Faq,
                crop,
            });
        }

        Ok(self.generate(question, crop).await)
    }

    async fn crop_reply(&self, crop: &str, attribute: CropAttribute) -> Result<String> {
        let reply = match attribute {
            CropAttribute::HarvestDate => {
                let date = self.store.harvest_date(crop).await?;
                if date.is_none() {
                    warn_inconsistent(crop, attribute);
                }
                harvest_reply(crop, date.as_deref())
            }
            CropAttribute::Supplier => {
                let supplier = self.store.supplier_for_crop(crop).await?;
                if supplier.is_none() {
                    warn_inconsistent(crop, attribute);
                }
                supplier_reply(supplier.as_ref())
            }
            CropAttribute::Season
            | CropAttribute::Fertilizer
            | CropAttribute::Water
            | CropAttribute::Overview => {
                let record = self.store.crop_by_name(crop).await?;
                if record.is_none() {
                    warn_inconsistent(crop, attribute);
                }
                let record = record.as_ref();
                match attribute {
                    CropAttribute::Season => season_reply(crop, record),
                    CropAttribute::Fertilizer => fertilizer_reply(crop, record),
                    CropAttribute::Water => water_reply(crop, record),
                    _ => overview_reply(crop, record),
                }
            }
        };
        Ok(reply)
    }

    /// Sends the original question text to the generator, bounded by the
    /// configured timeout.
    async fn generate(&self, question: &str, crop: Option<String>) -> RoutedReply {
        let prompt = generator_prompt(question);
        let outcome = tokio::time::timeout(self.generator_timeout, self.generator.generate(&prompt))
            .await;

        let reply = match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                warn!(generator = self.generator.name(), "generator returned empty text");
                None
            }
            Ok(Err(err)) => {
                warn!(generator = self.generator.name(), error = %err, "generator failed");
                None
            }
            Err(_) => {
                warn!(
                    generator = self.generator.name(),
                    timeout_ms = self.generator_timeout.as_millis() as u64,
                    "generator timed out"
                );
                None
            }
        };

        match reply {
            Some(reply) => RoutedReply {
                reply,
                route: RouteKind::Generated,
                crop,
            },
            None => RoutedReply {
                reply: APOLOGY_REPLY.to_string(),
                route: RouteKind::Apology,
                crop,
            },
        }
    }
}

fn warn_inconsistent(crop: &str, attribute: CropAttribute) {
    warn!(
        crop,
        attribute = attribute.as_str(),
        "crop detected but no matching row"
    );
}
