//! The bundled seed catalogue.
//!
//! A TOML catalogue of curated reference cards compiled into the binary, so
//! a first run answers from sourced material without any external setup.

use serde::Deserialize;

use super::NewCard;
use crate::error::{KbError, KbResult};

const CARDS_TOML: &str = include_str!("../../data/seeds/cards.toml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    cards: Vec<NewCard>,
}

/// Parse the bundled catalogue.
pub fn bundled_cards() -> KbResult<Vec<NewCard>> {
    let parsed: SeedFile = toml::from_str(CARDS_TOML).map_err(|e| KbError::Seed {
        message: e.to_string(),
    })?;
    Ok(parsed.cards)
}
