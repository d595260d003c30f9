//! Card catalog: the immutable pool of predefined 5x5 cards
//!
//! Loaded once at startup from a JSON definition and shared by every lobby.
//! A missing or malformed definition is a boot failure.

use crate::common::types::{CardId, MAX_NUMBER};
use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Grid side length
pub const GRID_SIZE: usize = 5;

/// Index of the free center cell on both axes
pub const CENTER: usize = 2;

/// A predefined bingo card, stored column-major (B, I, N, G, O)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    columns: [[u8; GRID_SIZE]; GRID_SIZE],
}

impl Card {
    pub fn new(id: CardId, columns: [[u8; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { id, columns }
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn columns(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.columns
    }

    /// Number at `row`, `col`
    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.columns[col][row]
    }

    /// Row-major copy of the card's numbers
    pub fn grid(&self) -> [[u8; GRID_SIZE]; GRID_SIZE] {
        let mut grid = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = self.cell(row, col);
            }
        }
        grid
    }
}

/// On-disk card definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDefinition {
    pub card_id: CardId,
    #[serde(rename = "B")]
    pub b: Vec<u8>,
    #[serde(rename = "I")]
    pub i: Vec<u8>,
    #[serde(rename = "N")]
    pub n: Vec<u8>,
    #[serde(rename = "G")]
    pub g: Vec<u8>,
    #[serde(rename = "O")]
    pub o: Vec<u8>,
}

impl TryFrom<CardDefinition> for Card {
    type Error = CatalogError;

    fn try_from(def: CardDefinition) -> Result<Self, Self::Error> {
        let mut columns = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (col, (letter, values)) in [("B", &def.b), ("I", &def.i), ("N", &def.n), ("G", &def.g), ("O", &def.o)]
            .into_iter()
            .enumerate()
        {
            columns[col] = values.as_slice().try_into().map_err(|_| {
                CatalogError::Invalid(format!(
                    "card {} column {} has {} numbers, expected {}",
                    def.card_id,
                    letter,
                    values.len(),
                    GRID_SIZE
                ))
            })?;
        }

        let card = Card::new(def.card_id, columns);
        validate_numbers(&card)?;
        Ok(card)
    }
}

impl From<&Card> for CardDefinition {
    fn from(card: &Card) -> Self {
        let [b, i, n, g, o] = card.columns;
        Self {
            card_id: card.id,
            b: b.to_vec(),
            i: i.to_vec(),
            n: n.to_vec(),
            g: g.to_vec(),
            o: o.to_vec(),
        }
    }
}

fn validate_numbers(card: &Card) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let n = card.cell(row, col);
            if row == CENTER && col == CENTER {
                // free space may carry any placeholder
                continue;
            }
            if n == 0 || n > MAX_NUMBER {
                return Err(CatalogError::Invalid(format!(
                    "card {} has number {} outside 1..={}",
                    card.id, n, MAX_NUMBER
                )));
            }
            if !seen.insert(n) {
                return Err(CatalogError::Invalid(format!(
                    "card {} repeats number {}",
                    card.id, n
                )));
            }
        }
    }
    Ok(())
}

/// Process-wide, read-only card pool
#[derive(Debug)]
pub struct CardCatalog {
    cards: Vec<Arc<Card>>,
    index: HashMap<CardId, usize>,
}

impl CardCatalog {
    /// Build a catalog from already-constructed cards
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, CatalogError> {
        if cards.is_empty() {
            return Err(CatalogError::Invalid("card pool is empty".to_string()));
        }

        let mut index = HashMap::with_capacity(cards.len());
        let mut pool = Vec::with_capacity(cards.len());
        for card in cards {
            validate_numbers(&card)?;
            if index.insert(card.id(), pool.len()).is_some() {
                return Err(CatalogError::Invalid(format!("duplicate card id {}", card.id())));
            }
            pool.push(Arc::new(card));
        }

        Ok(Self { cards: pool, index })
    }

    /// Parse a JSON array of card definitions
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<CardDefinition> = serde_json::from_str(json)?;
        let cards = definitions
            .into_iter()
            .map(Card::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cards(cards)
    }

    /// Load the catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(cards = catalog.len(), path = %path.display(), "Loaded bingo cards");
        Ok(catalog)
    }

    pub fn lookup(&self, card_id: CardId) -> Option<Arc<Card>> {
        self.index.get(&card_id).map(|&i| self.cards[i].clone())
    }

    /// All cards in definition order
    pub fn all_cards(&self) -> &[Arc<Card>] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"card_id": 1, "B": [1,2,3,4,5], "I": [16,17,18,19,20], "N": [31,32,0,34,35],
         "G": [46,47,48,49,50], "O": [61,62,63,64,65]},
        {"card_id": 2, "B": [6,7,8,9,10], "I": [21,22,23,24,25], "N": [36,37,0,39,40],
         "G": [51,52,53,54,55], "O": [66,67,68,69,70]}
    ]"#;

    #[test]
    fn test_load_from_json() {
        let catalog = CardCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 2);

        let card = catalog.lookup(1).unwrap();
        assert_eq!(card.cell(0, 0), 1);
        assert_eq!(card.cell(0, 4), 61);
        assert_eq!(card.cell(4, 1), 20);
        assert_eq!(card.grid()[2], [3, 18, 0, 48, 63]);
        assert!(catalog.lookup(99).is_none());
    }

    #[test]
    fn test_rejects_short_column() {
        let json = r#"[{"card_id": 1, "B": [1,2,3,4], "I": [16,17,18,19,20],
            "N": [31,32,0,34,35], "G": [46,47,48,49,50], "O": [61,62,63,64,65]}]"#;
        assert!(matches!(CardCatalog::from_json(json), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_rejects_out_of_range_number() {
        let json = r#"[{"card_id": 1, "B": [1,2,3,4,76], "I": [16,17,18,19,20],
            "N": [31,32,0,34,35], "G": [46,47,48,49,50], "O": [61,62,63,64,65]}]"#;
        assert!(CardCatalog::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let card = Card::try_from(CardDefinition {
            card_id: 4,
            b: vec![1, 2, 3, 4, 5],
            i: vec![16, 17, 18, 19, 20],
            n: vec![31, 32, 0, 34, 35],
            g: vec![46, 47, 48, 49, 50],
            o: vec![61, 62, 63, 64, 65],
        })
        .unwrap();
        let result = CardCatalog::from_cards(vec![card.clone(), card]);
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json_and_empty_pool() {
        assert!(matches!(CardCatalog::from_json("{"), Err(CatalogError::Parse(_))));
        assert!(CardCatalog::from_json("[]").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = CardCatalog::load("/nonexistent/cards.json");
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn test_definition_round_trip_keeps_columns() {
        let catalog = CardCatalog::from_json(SAMPLE).unwrap();
        let def = CardDefinition::from(catalog.lookup(2).unwrap().as_ref());
        assert_eq!(def.n, vec![36, 37, 0, 39, 40]);
    }
}
