//! Hierarchical document addresses.
//!
//! An address is a path through World → Chunk → Tile → Entity. The most
//! specific id present decides the document kind, and each level requires the
//! level above it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File holding a document inside its address directory.
pub const METADATA_FILE: &str = "metadata.json";

/// The kinds of document the hierarchy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    World,
    Chunk,
    Tile,
    Entity,
}

impl DocumentKind {
    /// Directory segment collecting documents of this kind under their parent.
    pub fn segment(self) -> &'static str {
        match self {
            DocumentKind::World => "worlds",
            DocumentKind::Chunk => "chunks",
            DocumentKind::Tile => "tiles",
            DocumentKind::Entity => "entities",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::World => "world",
            DocumentKind::Chunk => "chunk",
            DocumentKind::Tile => "tile",
            DocumentKind::Entity => "entity",
        };
        f.write_str(name)
    }
}

/// Location of exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub world_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Address {
    pub fn world(world_id: impl Into<String>) -> Self {
        Self {
            world_id: world_id.into(),
            chunk_id: None,
            tile_id: None,
            entity_id: None,
        }
    }

    pub fn chunk(world_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
        Self::world(world_id).with_chunk(chunk_id)
    }

    pub fn tile(
        world_id: impl Into<String>,
        chunk_id: impl Into<String>,
        tile_id: impl Into<String>,
    ) -> Self {
        Self::chunk(world_id, chunk_id).with_tile(tile_id)
    }

    pub fn entity(
        world_id: impl Into<String>,
        chunk_id: impl Into<String>,
        tile_id: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::tile(world_id, chunk_id, tile_id).with_entity(entity_id)
    }

    /// Same world, with the chunk level set. Deeper levels are dropped.
    pub fn with_chunk(&self, chunk_id: impl Into<String>) -> Self {
        Self {
            world_id: self.world_id.clone(),
            chunk_id: Some(chunk_id.into()),
            tile_id: None,
            entity_id: None,
        }
    }

    /// Same chunk, with the tile level set. The entity level is dropped.
    pub fn with_tile(&self, tile_id: impl Into<String>) -> Self {
        Self {
            world_id: self.world_id.clone(),
            chunk_id: self.chunk_id.clone(),
            tile_id: Some(tile_id.into()),
            entity_id: None,
        }
    }

    /// Same tile, with the entity level set.
    pub fn with_entity(&self, entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..self.clone()
        }
    }

    /// Resolve the document kind, validating the hierarchy and every id.
    pub fn kind(&self) -> Result<DocumentKind> {
        validate_id(&self.world_id, self)?;
        for id in [&self.chunk_id, &self.tile_id, &self.entity_id].into_iter().flatten() {
            validate_id(id, self)?;
        }

        match (&self.chunk_id, &self.tile_id, &self.entity_id) {
            (None, None, None) => Ok(DocumentKind::World),
            (Some(_), None, None) => Ok(DocumentKind::Chunk),
            (Some(_), Some(_), None) => Ok(DocumentKind::Tile),
            (Some(_), Some(_), Some(_)) => Ok(DocumentKind::Entity),
            _ => Err(Error::UnknownAddress(format!(
                "{self}: every level requires the level above it"
            ))),
        }
    }

    /// Resolve the kind and require it to be `expected`.
    pub fn expect_kind(&self, expected: DocumentKind) -> Result<()> {
        let kind = self.kind()?;
        if kind != expected {
            return Err(Error::UnknownAddress(format!(
                "{self} addresses a {kind}, not a {expected}"
            )));
        }
        Ok(())
    }

    /// Id of the most specific level.
    pub fn id(&self) -> &str {
        self.entity_id
            .as_deref()
            .or(self.tile_id.as_deref())
            .or(self.chunk_id.as_deref())
            .unwrap_or(&self.world_id)
    }

    /// Address of the enclosing container, `None` for a world.
    pub fn parent(&self) -> Option<Address> {
        if self.entity_id.is_some() {
            Some(Self {
                entity_id: None,
                ..self.clone()
            })
        } else if self.tile_id.is_some() {
            Some(Self {
                tile_id: None,
                entity_id: None,
                ..self.clone()
            })
        } else if self.chunk_id.is_some() {
            Some(Self::world(self.world_id.clone()))
        } else {
            None
        }
    }

    /// Directory owning this document and everything beneath it.
    pub fn directory(&self, root: &Path) -> Result<PathBuf> {
        let kind = self.kind()?;
        let mut path = root.join(DocumentKind::World.segment()).join(&self.world_id);
        if kind == DocumentKind::World {
            return Ok(path);
        }
        let levels = [
            (DocumentKind::Chunk, &self.chunk_id),
            (DocumentKind::Tile, &self.tile_id),
            (DocumentKind::Entity, &self.entity_id),
        ];
        for (level, id) in levels {
            if let Some(id) = id {
                path = path.join(level.segment()).join(id);
            }
        }
        Ok(path)
    }

    /// Path of the JSON file holding this document.
    pub fn metadata_path(&self, root: &Path) -> Result<PathBuf> {
        Ok(self.directory(root)?.join(METADATA_FILE))
    }
}

fn validate_id(id: &str, address: &Address) -> Result<()> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(Error::UnknownAddress(format!("{address}: invalid id {id:?}")))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worlds/{}", self.world_id)?;
        if let Some(id) = &self.chunk_id {
            write!(f, "/chunks/{id}")?;
        }
        if let Some(id) = &self.tile_id {
            write!(f, "/tiles/{id}")?;
        }
        if let Some(id) = &self.entity_id {
            write!(f, "/entities/{id}")?;
        }
        Ok(())
    }
}

/// Parses the same `worlds/{w}/chunks/{c}/...` form `Display` writes.
impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::UnknownAddress(s.to_string());
        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        if segments.len() % 2 != 0 {
            return Err(unknown());
        }
        let kinds = [
            DocumentKind::World,
            DocumentKind::Chunk,
            DocumentKind::Tile,
            DocumentKind::Entity,
        ];
        let mut ids = [None, None, None, None];
        for (level, pair) in segments.chunks(2).enumerate() {
            match kinds.get(level) {
                Some(kind) if kind.segment() == pair[0] => ids[level] = Some(pair[1].to_string()),
                _ => return Err(unknown()),
            }
        }
        let [world_id, chunk_id, tile_id, entity_id] = ids;
        let address = Address {
            world_id: world_id.ok_or_else(unknown)?,
            chunk_id,
            tile_id,
            entity_id,
        };
        address.kind()?;
        Ok(address)
    }
}
