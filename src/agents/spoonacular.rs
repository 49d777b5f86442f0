//! SpoonacularRecipeAgent: recipe suggestions from the Spoonacular API
//!
//! Calls `/recipes/findByIngredients` with everything in stock, keeps the
//! recipes that use the most on-hand ingredients, and maps them into
//! suggestions. Connection errors, 429 and 5xx responses are transient.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::context::CoordinationContext;
use super::traits::{AgentAdapter, AgentKind};
use crate::domain::{AgentId, InventorySnapshot, ItemId, Proposal, Suggestion, SuggestionKind};
use crate::error::{AgentError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com";
const REQUEST_TIMEOUT_SECS: u64 = 20;
const FETCH_COUNT: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundIngredient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundRecipe {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub used_ingredient_count: u32,
    #[serde(default)]
    pub missed_ingredient_count: u32,
    #[serde(default)]
    pub used_ingredients: Vec<FoundIngredient>,
    #[serde(default)]
    pub missed_ingredients: Vec<FoundIngredient>,
}

pub struct SpoonacularRecipeAgent {
    id: AgentId,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    top_n: usize,
}

impl SpoonacularRecipeAgent {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        top_n: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            id: AgentId::new(id),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            top_n: top_n.max(1),
        })
    }

    async fn find_by_ingredients(
        &self,
        ingredients: &str,
        deadline: Instant,
    ) -> std::result::Result<Vec<FoundRecipe>, AgentError> {
        let url = format!("{}/recipes/findByIngredients", self.base_url);
        let budget = deadline.saturating_duration_since(Instant::now());
        let number = FETCH_COUNT.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("ingredients", ingredients),
                ("number", number.as_str()),
                ("ranking", "1"),
                ("ignorePantry", "true"),
            ])
            .timeout(budget.max(Duration::from_millis(1)))
            .send()
            .await?
            .error_for_status()?;

        resp.json::<Vec<FoundRecipe>>()
            .await
            .map_err(|e| AgentError::failure(format!("Unexpected Spoonacular API response: {e}")))
    }
}

/// Map raw API results to suggestions: most used ingredients first, `top_n` kept.
pub fn suggestions_from_found(
    mut found: Vec<FoundRecipe>,
    snapshot: &InventorySnapshot,
    top_n: usize,
) -> Vec<Suggestion> {
    found.sort_by(|a, b| {
        b.used_ingredient_count
            .cmp(&a.used_ingredient_count)
            .then_with(|| a.id.cmp(&b.id))
    });

    found
        .into_iter()
        .take(top_n)
        .map(|recipe| {
            let total = recipe.used_ingredient_count + recipe.missed_ingredient_count;
            let confidence = if total == 0 {
                0.0
            } else {
                recipe.used_ingredient_count as f64 / total as f64
            };
            let mut suggestion = Suggestion::new(
                format!("recipe:{}", recipe.id),
                recipe.title.clone(),
                SuggestionKind::Recipe,
                confidence,
            )
            .with_metadata("source", "spoonacular")
            .with_metadata("used_ingredients", recipe.used_ingredient_count.to_string())
            .with_metadata("missed_ingredients", recipe.missed_ingredient_count.to_string());
            if let Some(image) = &recipe.image {
                suggestion = suggestion.with_metadata("image", image.clone());
            }
            for ing in recipe
                .used_ingredients
                .iter()
                .chain(recipe.missed_ingredients.iter())
            {
                let item = ItemId::new(&ing.name);
                let quantity = requirement_quantity(snapshot, &item, ing);
                suggestion = suggestion.requires(item, quantity);
            }
            suggestion
        })
        .collect()
}

/// Amounts are only trusted when the recipe unit matches the pantry unit;
/// otherwise the recipe needs one unit of the item.
fn requirement_quantity(snapshot: &InventorySnapshot, item: &ItemId, ing: &FoundIngredient) -> Decimal {
    let unit_matches = snapshot
        .get(item)
        .map(|i| i.unit.eq_ignore_ascii_case(ing.unit.trim()))
        .unwrap_or(false);
    if !unit_matches || ing.amount <= 0.0 {
        return Decimal::ONE;
    }
    Decimal::from_f64(ing.amount)
        .map(|d| d.round_dp(3))
        .unwrap_or(Decimal::ONE)
}

#[async_trait]
impl AgentAdapter for SpoonacularRecipeAgent {
    fn identity(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Recipe
    }

    async fn propose(
        &self,
        ctx: &CoordinationContext,
        deadline: Instant,
    ) -> std::result::Result<Proposal, AgentError> {
        let ingredients: Vec<&str> = ctx.snapshot.available().map(|i| i.id.as_str()).collect();
        if ingredients.is_empty() {
            return Ok(Proposal::new(self.id.clone(), ctx.version(), Vec::new()));
        }

        let found = self
            .find_by_ingredients(&ingredients.join(","), deadline)
            .await?;
        debug!(agent = %self.id, found = found.len(), "spoonacular: recipes fetched");

        let suggestions = suggestions_from_found(found, &ctx.snapshot, self.top_n);
        Ok(Proposal::new(self.id.clone(), ctx.version(), suggestions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InventoryItem;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"[
        {"id": 11, "title": "Mushroom Toast", "image": "https://img/11.jpg",
         "usedIngredientCount": 1, "missedIngredientCount": 1,
         "usedIngredients": [{"name": "mushrooms", "amount": 2, "unit": "cups"}],
         "missedIngredients": [{"name": "bread", "amount": 2, "unit": "slices"}]},
        {"id": 12, "title": "Potato Bacon Hash",
         "usedIngredientCount": 2, "missedIngredientCount": 0,
         "usedIngredients": [
            {"name": "potatoes", "amount": 1.5, "unit": "lb"},
            {"name": "Bacon", "amount": 4, "unit": "strips"}],
         "missedIngredients": []}
    ]"#;

    #[test]
    fn test_maps_found_recipes() {
        let found: Vec<FoundRecipe> = serde_json::from_str(SAMPLE).unwrap();
        let snap = InventorySnapshot::new(
            2,
            Utc::now(),
            vec![
                InventoryItem::new("potatoes", dec!(10), "lb"),
                InventoryItem::new("bacon", dec!(1), "pack"),
                InventoryItem::new("mushrooms", dec!(1), "container"),
            ],
        );
        let suggestions = suggestions_from_found(found, &snap, 3);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].key, "recipe:12");
        assert_eq!(suggestions[0].confidence, 1.0);
        // same unit → recipe amount; mismatched unit → one pantry unit
        assert_eq!(suggestions[0].requirements[0].quantity, dec!(1.5));
        assert_eq!(suggestions[0].requirements[1].item, ItemId::new("bacon"));
        assert_eq!(suggestions[0].requirements[1].quantity, Decimal::ONE);
        assert_eq!(suggestions[1].confidence, 0.5);
        assert_eq!(
            suggestions[1].metadata.get("image").map(String::as_str),
            Some("https://img/11.jpg")
        );
    }

    #[test]
    fn test_top_n_truncates() {
        let found: Vec<FoundRecipe> = serde_json::from_str(SAMPLE).unwrap();
        let snap = InventorySnapshot::empty(1);
        let suggestions = suggestions_from_found(found, &snap, 1);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].key, "recipe:12");
    }
}
