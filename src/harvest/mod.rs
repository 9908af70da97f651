//! The harvest engine: markup contract, card parsing, surface discovery,
//! pagination and the orchestrator that ties them together. Browser access
//! goes through the traits in [`surface`].

pub mod block;
pub mod card_parser;
pub mod dedup;
pub mod frame_locator;
pub mod markup;
pub mod orchestrator;
pub mod pagination;
pub mod retry;
pub mod surface;

pub use orchestrator::{HarvestOrchestrator, HarvestRequest};
pub use surface::{ReviewSurface, SessionLauncher, StorefrontSession};
