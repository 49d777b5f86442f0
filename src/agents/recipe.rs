//! CatalogRecipeAgent: offline recipe suggestions from on-hand ingredients
//!
//! Ranks a fixed recipe catalog by how many of its ingredients are in stock
//! and proposes the top few. Confidence is the share of ingredients on hand.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use super::context::CoordinationContext;
use super::traits::{AgentAdapter, AgentKind};
use crate::domain::{AgentId, Proposal, Requirement, Suggestion, SuggestionKind};
use crate::error::AgentError;

/// One catalog recipe. Quantities are in the inventory item's unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSpec {
    pub id: String,
    pub title: String,
    pub ingredients: Vec<Requirement>,
}

impl RecipeSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ingredients: Vec::new(),
        }
    }

    pub fn ingredient(mut self, item: &str, quantity: Decimal) -> Self {
        self.ingredients.push(Requirement::new(item, quantity));
        self
    }
}

pub struct CatalogRecipeAgent {
    id: AgentId,
    catalog: Vec<RecipeSpec>,
    top_n: usize,
}

impl CatalogRecipeAgent {
    pub fn new(id: impl Into<String>, catalog: Vec<RecipeSpec>, top_n: usize) -> Self {
        Self {
            id: AgentId::new(id),
            catalog,
            top_n: top_n.max(1),
        }
    }

    fn rank(&self, ctx: &CoordinationContext) -> Vec<Suggestion> {
        let snapshot = &ctx.snapshot;
        let mut scored: Vec<(&RecipeSpec, usize, usize)> = self
            .catalog
            .iter()
            .filter(|r| !r.ingredients.is_empty())
            .map(|r| {
                let used = r
                    .ingredients
                    .iter()
                    .filter(|req| snapshot.quantity_of(&req.item) > Decimal::ZERO)
                    .count();
                (r, used, r.ingredients.len() - used)
            })
            .filter(|(_, used, _)| *used > 0)
            .collect();

        // Most used ingredients first, then fewest missing, then catalog id.
        scored.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.2.cmp(&b.2))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        scored
            .into_iter()
            .take(self.top_n)
            .map(|(recipe, used, missed)| {
                let confidence = used as f64 / recipe.ingredients.len() as f64;
                let missing: Vec<&str> = recipe
                    .ingredients
                    .iter()
                    .filter(|req| snapshot.quantity_of(&req.item) <= Decimal::ZERO)
                    .map(|req| req.item.as_str())
                    .collect();
                let mut suggestion = Suggestion::new(
                    format!("recipe:{}", recipe.id),
                    recipe.title.clone(),
                    SuggestionKind::Recipe,
                    confidence,
                )
                .with_metadata("used_ingredients", used.to_string())
                .with_metadata("missed_ingredients", missed.to_string());
                if !missing.is_empty() {
                    suggestion = suggestion.with_metadata("missing", missing.join(","));
                }
                suggestion.requirements = recipe.ingredients.clone();
                suggestion
            })
            .collect()
    }
}

#[async_trait]
impl AgentAdapter for CatalogRecipeAgent {
    fn identity(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Recipe
    }

    async fn propose(
        &self,
        ctx: &CoordinationContext,
        _deadline: Instant,
    ) -> Result<Proposal, AgentError> {
        let suggestions = self.rank(ctx);
        debug!(
            agent = %self.id,
            version = ctx.version(),
            count = suggestions.len(),
            "recipe catalog: ranked recipes"
        );
        Ok(Proposal::new(self.id.clone(), ctx.version(), suggestions))
    }
}
