//! Shared types for MTG price tooling
//!
//! Hosts the Scryfall catalog client used to resolve card identities,
//! printings and reference prices.

pub mod error;
pub mod scryfall;

pub use error::{CatalogError, CatalogResult};
pub use scryfall::{CardFace, ImageUris, ScryfallCard, ScryfallClient, ScryfallPrices};
