//! Agent Adapters: uniform capability wrappers around recommendation agents
//!
//! Each adapter implements `AgentAdapter`. The engine is polymorphic over the
//! registered set and only looks at `kind()` to pick a timeout.

pub mod context;
pub mod flyer;
pub mod recipe;
pub mod spoonacular;
pub mod traits;

pub use context::{CoordinationContext, SupersedeSignal};
pub use flyer::FlyerPriceAgent;
pub use recipe::{CatalogRecipeAgent, RecipeSpec};
pub use spoonacular::SpoonacularRecipeAgent;
pub use traits::{AgentAdapter, AgentKind};

pub use crate::domain::AgentId;
