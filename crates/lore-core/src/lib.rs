//! Lore Core - Domain types shared by the Lore intake pipeline.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
