//! FlyerPriceAgent: shopping suggestions from local flyer deals
//!
//! Looks at items running low plus the household's watch list and proposes
//! buying them where the current flyer beats the regular shelf price.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tokio::time::Instant;
use tracing::debug;

use super::context::CoordinationContext;
use super::traits::{AgentAdapter, AgentKind};
use crate::domain::{AgentId, ItemId, Proposal, Suggestion, SuggestionKind};
use crate::error::AgentError;

/// Confidence for a low-stock item with no deal on the flyer
const RESTOCK_CONFIDENCE: f64 = 0.4;
const DEAL_BASE_CONFIDENCE: f64 = 0.6;

pub struct FlyerPriceAgent {
    id: AgentId,
    low_stock_threshold: Decimal,
    location: Option<String>,
}

impl FlyerPriceAgent {
    pub fn new(id: impl Into<String>, low_stock_threshold: Decimal) -> Self {
        Self {
            id: AgentId::new(id),
            low_stock_threshold,
            location: None,
        }
    }

    /// Override the location from the user's constraints
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn candidates(&self, ctx: &CoordinationContext) -> BTreeSet<ItemId> {
        let low_stock = ctx
            .snapshot
            .items
            .values()
            .filter(|i| i.quantity <= self.low_stock_threshold)
            .map(|i| i.id.clone());
        let watched = ctx.signals.constraints.watch_list.iter().cloned();

        low_stock
            .chain(watched)
            .filter(|id| !ctx.is_excluded(id))
            .collect()
    }

    fn suggest(&self, ctx: &CoordinationContext) -> Vec<Suggestion> {
        let location = self
            .location
            .as_deref()
            .unwrap_or(ctx.signals.constraints.location.as_str());
        let today = ctx.today();
        let mut out = Vec::new();

        for item in self.candidates(ctx) {
            let low = ctx.snapshot.quantity_of(&item) <= self.low_stock_threshold;
            let quote = ctx.signals.price_of(&item);
            let deal = quote
                .and_then(|q| q.best_deal(location, today).map(|d| (q, d)))
                .filter(|(q, d)| q.regular > Decimal::ZERO && d.price < q.regular);

            match deal {
                Some((quote, deal)) => {
                    let savings = quote.regular - deal.price;
                    let ratio = (savings / quote.regular).to_f64().unwrap_or(0.0);
                    let confidence = DEAL_BASE_CONFIDENCE + (1.0 - DEAL_BASE_CONFIDENCE) * ratio;
                    let mut suggestion = Suggestion::new(
                        format!("shop:{item}"),
                        format!("Buy {item} at {} for ${}", deal.store, deal.price),
                        SuggestionKind::Shopping,
                        confidence,
                    )
                    .with_savings(savings)
                    .with_metadata("item", item.as_str())
                    .with_metadata("store", deal.store.clone())
                    .with_metadata("price", deal.price.to_string())
                    .with_metadata("regular", quote.regular.to_string())
                    .with_metadata("unit", quote.unit.clone());
                    if !deal.detail.is_empty() {
                        suggestion = suggestion.with_metadata("detail", deal.detail.clone());
                    }
                    if let Some(until) = deal.valid_until {
                        suggestion = suggestion.with_metadata("valid_until", until.to_string());
                    }
                    out.push(suggestion);
                }
                None if low => {
                    let mut suggestion = Suggestion::new(
                        format!("shop:{item}"),
                        format!("Restock {item}"),
                        SuggestionKind::Shopping,
                        RESTOCK_CONFIDENCE,
                    )
                    .with_metadata("item", item.as_str());
                    if let Some(q) = quote {
                        suggestion = suggestion
                            .with_metadata("regular", q.regular.to_string())
                            .with_metadata("unit", q.unit.clone());
                    }
                    out.push(suggestion);
                }
                // watched, well stocked, nothing on sale
                None => {}
            }
        }
        out
    }
}

#[async_trait]
impl AgentAdapter for FlyerPriceAgent {
    fn identity(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::PriceOptimization
    }

    async fn propose(
        &self,
        ctx: &CoordinationContext,
        _deadline: Instant,
    ) -> Result<Proposal, AgentError> {
        let suggestions = self.suggest(ctx);
        debug!(agent = %self.id, count = suggestions.len(), "flyer: shopping suggestions");
        Ok(Proposal::new(self.id.clone(), ctx.version(), suggestions))
    }
}
