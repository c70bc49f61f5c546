//! Embedded knowledge base of curated reference cards.
//!
//! Cards live in a single redb database: a `cards` table keyed by a
//! monotonic u64 id (bincode-encoded records) and a `meta` table holding the
//! id allocator. Every operation opens the database, acts inside one
//! transaction, and closes it again; no handle is held across turns. Ids are
//! never reused, even after deletion.

pub mod score;
pub mod seed;

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{KbError, KbResult};

const CARDS: TableDefinition<u64, &[u8]> = TableDefinition::new("cards");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";

/// A curated reference entry with source attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique, monotonically assigned, never reused.
    pub id: u64,
    /// Free-form category: "ayah", "hadith", "dua", "dhikr", "concept", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    /// Source-language text.
    pub arabic: Option<String>,
    pub translation_en: Option<String>,
    pub explanation: Option<String>,
    pub source_name: String,
    pub reference: String,
    /// Authenticity grade, e.g. "sahih" or "hasan".
    pub auth_grade: Option<String>,
    /// Comma-separated tag string.
    pub tags: Option<String>,
    /// Unix seconds at insertion.
    pub created_at: u64,
}

/// Fields for a card about to be inserted; id and timestamp are assigned by
/// the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCard {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub arabic: Option<String>,
    #[serde(default)]
    pub translation_en: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    pub source_name: String,
    pub reference: String,
    #[serde(default)]
    pub auth_grade: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

/// A card paired with its normalized relevance score for one search call.
#[derive(Debug, Clone)]
pub struct KnowledgeHit {
    pub card: Card,
    /// Normalized relevance in [0.0, 1.0].
    pub score: f32,
}

/// Handle to the embedded card store. Cheap to clone; holds only the path.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    path: PathBuf,
}

impl KnowledgeBase {
    /// Create a handle for the database at `path`. Nothing is opened until
    /// the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_db(&self) -> KbResult<Database> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| KbError::Io { source: e })?;
            }
        }
        Database::create(&self.path).map_err(|e| KbError::Redb {
            message: format!("failed to open redb at {}: {e}", self.path.display()),
        })
    }

    /// Idempotently ensure both tables exist. Safe to call on every startup.
    pub fn init(&self) -> KbResult<()> {
        let db = self.open_db()?;
        let txn = db.begin_write().map_err(|e| KbError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            txn.open_table(CARDS).map_err(|e| KbError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            txn.open_table(META).map_err(|e| KbError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| KbError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    /// Insert the bundled catalogue when the store holds zero cards.
    ///
    /// Returns the number of cards inserted; a non-empty store is left
    /// untouched and reports 0. Idempotent across repeated invocations.
    pub fn seed_if_empty(&self) -> KbResult<usize> {
        self.init()?;
        if self.count()? > 0 {
            return Ok(0);
        }
        let mut inserted = 0;
        for card in seed::bundled_cards()? {
            self.add_card(card)?;
            inserted += 1;
        }
        info!(cards = inserted, "seeded knowledge base");
        Ok(inserted)
    }

    /// Validate, assign the next id and a creation timestamp, persist, and
    /// return the stored card.
    pub fn add_card(&self, new: NewCard) -> KbResult<Card> {
        validate_required(&new)?;

        let db = self.open_db()?;
        let txn = db.begin_write().map_err(|e| KbError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        let card;
        {
            let mut meta = txn.open_table(META).map_err(|e| KbError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            let id = meta
                .get(NEXT_ID_KEY)
                .map_err(|e| KbError::Redb {
                    message: format!("get failed: {e}"),
                })?
                .map(|g| g.value())
                .unwrap_or(1);
            meta.insert(NEXT_ID_KEY, id + 1).map_err(|e| KbError::Redb {
                message: format!("insert failed: {e}"),
            })?;

            card = Card {
                id,
                kind: new.kind.trim().to_string(),
                title: new.title.trim().to_string(),
                arabic: new.arabic,
                translation_en: new.translation_en,
                explanation: new.explanation,
                source_name: new.source_name.trim().to_string(),
                reference: new.reference.trim().to_string(),
                auth_grade: new.auth_grade,
                tags: new.tags,
                created_at: now_secs(),
            };

            let bytes = bincode::serialize(&card).map_err(|e| KbError::Serialization {
                message: e.to_string(),
            })?;
            let mut cards = txn.open_table(CARDS).map_err(|e| KbError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            cards
                .insert(card.id, bytes.as_slice())
                .map_err(|e| KbError::Redb {
                    message: format!("insert failed: {e}"),
                })?;
        }
        txn.commit().map_err(|e| KbError::Redb {
            message: format!("commit failed: {e}"),
        })?;

        debug!(card_id = card.id, title = %card.title, "card added");
        Ok(card)
    }

    /// Fetch a card by id. No side effects; an uninitialized store reads as
    /// empty.
    pub fn get_card(&self, id: u64) -> KbResult<Option<Card>> {
        let db = self.open_db()?;
        let txn = db.begin_read().map_err(|e| KbError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(CARDS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(KbError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let Some(guard) = table.get(id).map_err(|e| KbError::Redb {
            message: format!("get failed: {e}"),
        })?
        else {
            return Ok(None);
        };
        decode_card(guard.value()).map(Some)
    }

    /// Remove a card if present. Returns whether a deletion occurred;
    /// deleting a missing id reports false, not an error.
    pub fn delete_card(&self, id: u64) -> KbResult<bool> {
        let db = self.open_db()?;
        let txn = db.begin_write().map_err(|e| KbError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        let existed = {
            let mut table = txn.open_table(CARDS).map_err(|e| KbError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table
                .remove(id)
                .map_err(|e| KbError::Redb {
                    message: format!("remove failed: {e}"),
                })?
                .is_some()
        };
        txn.commit().map_err(|e| KbError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(existed)
    }

    /// Number of stored cards.
    pub fn count(&self) -> KbResult<u64> {
        let db = self.open_db()?;
        let txn = db.begin_read().map_err(|e| KbError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(CARDS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => {
                return Err(KbError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        table.len().map_err(|e| KbError::Redb {
            message: format!("len failed: {e}"),
        })
    }

    /// All cards, ascending by id (redb key order).
    pub fn all_cards(&self) -> KbResult<Vec<Card>> {
        let db = self.open_db()?;
        let txn = db.begin_read().map_err(|e| KbError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(CARDS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => {
                return Err(KbError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let mut cards = Vec::new();
        for item in table.iter().map_err(|e| KbError::Redb {
            message: format!("iter failed: {e}"),
        })? {
            let (_, value) = item.map_err(|e| KbError::Redb {
                message: format!("iter failed: {e}"),
            })?;
            cards.push(decode_card(value.value())?);
        }
        Ok(cards)
    }

    /// Scored free-text search.
    ///
    /// Tokenizes on whitespace, scores every card over the weighted fields
    /// in [`score`], drops zero scores, sorts by descending score (stable:
    /// ascending id on ties), and truncates to `limit`. A query with no
    /// usable tokens returns an empty result, not an error.
    pub fn search(&self, query: &str, limit: usize) -> KbResult<Vec<KnowledgeHit>> {
        let tokens = score::tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let full_query = query.trim().to_lowercase();

        let mut hits: Vec<KnowledgeHit> = self
            .all_cards()?
            .into_iter()
            .filter_map(|card| {
                let s = score::score_card(&card, &tokens, &full_query);
                (s > 0.0).then_some(KnowledgeHit { card, score: s })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        debug!(query, hits = hits.len(), "knowledge search");
        Ok(hits)
    }

    /// Serialize all cards, ascending by id, as a pretty-printed JSON array
    /// at `path`. Overwrites any existing file; returns the resolved path.
    pub fn export_json(&self, path: &Path) -> KbResult<PathBuf> {
        let cards = self.all_cards()?;
        let json = serde_json::to_string_pretty(&cards).map_err(|e| KbError::Serialization {
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| KbError::Io { source: e })?;
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        info!(path = %resolved.display(), cards = cards.len(), "exported knowledge base");
        Ok(resolved)
    }
}

fn validate_required(new: &NewCard) -> KbResult<()> {
    if new.kind.trim().is_empty() {
        return Err(KbError::Validation { field: "type" });
    }
    if new.title.trim().is_empty() {
        return Err(KbError::Validation { field: "title" });
    }
    if new.source_name.trim().is_empty() {
        return Err(KbError::Validation { field: "source_name" });
    }
    if new.reference.trim().is_empty() {
        return Err(KbError::Validation { field: "reference" });
    }
    Ok(())
}

fn decode_card(bytes: &[u8]) -> KbResult<Card> {
    bincode::deserialize(bytes).map_err(|e| KbError::Serialization {
        message: e.to_string(),
    })
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
