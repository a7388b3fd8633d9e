use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tilecraft_storage::{Document, DocumentKind};

use crate::tile::ParseError;

/// Species of a tile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Grass,
    Tree,
    Fish,
    Mycelium,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Grass,
        EntityType::Tree,
        EntityType::Fish,
        EntityType::Mycelium,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Grass => "grass",
            EntityType::Tree => "tree",
            EntityType::Fish => "fish",
            EntityType::Mycelium => "mycelium",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError {
                kind: "entity type",
                input: s.to_string(),
            })
    }
}

/// Lifecycle stage. Each species walks its own subset in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Seed,
    Sprout,
    Sapling,
    Fruit,
    Spore,
    Hyphae,
    Egg,
    Fry,
    Mature,
}

/// Something living on a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub stage: Stage,
    pub last_updated: DateTime<Utc>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: EntityType, stage: Stage) -> Self {
        Self {
            id: id.into(),
            entity_type,
            stage,
            last_updated: Utc::now(),
        }
    }
}

impl Document for Entity {
    const KIND: DocumentKind = DocumentKind::Entity;
}
