pub mod inventory;
pub mod plan;
pub mod proposal;

pub use inventory::*;
pub use plan::*;
pub use proposal::*;
