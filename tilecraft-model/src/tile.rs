use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tilecraft_storage::{Document, DocumentKind};

/// Terrain of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    #[default]
    Unknown,
    Ocean,
    Water,
    Shore,
    Dirt,
    Rock,
    Grass,
    Forest,
}

impl TileType {
    pub const ALL: [TileType; 8] = [
        TileType::Unknown,
        TileType::Ocean,
        TileType::Water,
        TileType::Shore,
        TileType::Dirt,
        TileType::Rock,
        TileType::Grass,
        TileType::Forest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TileType::Unknown => "unknown",
            TileType::Ocean => "ocean",
            TileType::Water => "water",
            TileType::Shore => "shore",
            TileType::Dirt => "dirt",
            TileType::Rock => "rock",
            TileType::Grass => "grass",
            TileType::Forest => "forest",
        }
    }

    /// One-character map glyph.
    pub fn glyph(self) -> char {
        match self {
            TileType::Unknown => '?',
            TileType::Ocean => '~',
            TileType::Water => 'w',
            TileType::Shore => '.',
            TileType::Dirt => ':',
            TileType::Rock => '^',
            TileType::Grass => '"',
            TileType::Forest => 'T',
        }
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to parse a model enum from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: &'static str,
    pub input: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseError {}

impl FromStr for TileType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TileType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError {
                kind: "tile type",
                input: s.to_string(),
            })
    }
}

/// The four adjacency directions. `Up` is toward y = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Grid offset `(dx, dy)`.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    /// Position in [`Direction::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed four-slot neighbor table, one optional tile id per [`Direction`].
///
/// Serialized as `{"left": .., "right": .., "up": .., "down": ..}` so a
/// partial patch can set a single direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neighbors {
    left: Option<String>,
    right: Option<String>,
    up: Option<String>,
    down: Option<String>,
}

impl Neighbors {
    pub fn get(&self, direction: Direction) -> Option<&str> {
        self.slot(direction).as_deref()
    }

    pub fn set(&mut self, direction: Direction, tile_id: impl Into<String>) {
        *self.slot_mut(direction) = Some(tile_id.into());
    }

    /// Bound directions with their tile ids.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &str)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.get(d).map(|id| (d, id)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, direction: Direction) -> &Option<String> {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut Option<String> {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }
}

/// A single grid cell of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: String,
    pub tile_type: TileType,
    #[serde(default)]
    pub next: Neighbors,
    #[serde(default)]
    pub entities: BTreeSet<String>,
}

impl Tile {
    pub fn new(id: impl Into<String>, tile_type: TileType) -> Self {
        Self {
            id: id.into(),
            tile_type,
            next: Neighbors::default(),
            entities: BTreeSet::new(),
        }
    }
}

impl Document for Tile {
    const KIND: DocumentKind = DocumentKind::Tile;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tile_type_wire_names() {
        assert_eq!(serde_json::to_value(TileType::Shore).unwrap(), json!("shore"));
        let parsed: TileType = serde_json::from_value(json!("forest")).unwrap();
        assert_eq!(parsed, TileType::Forest);
    }

    #[test]
    fn test_tile_type_from_str() {
        assert_eq!("DIRT".parse::<TileType>().unwrap(), TileType::Dirt);
        assert_eq!("grass".parse::<TileType>().unwrap(), TileType::Grass);
        assert!("lava".parse::<TileType>().is_err());
    }

    #[test]
    fn test_direction_opposites() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.offset();
            let (ox, oy) = direction.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_direction_index_matches_order() {
        for (i, direction) in Direction::ALL.into_iter().enumerate() {
            assert_eq!(direction.index(), i);
        }
    }

    #[test]
    fn test_neighbors_table() {
        let mut next = Neighbors::default();
        assert!(next.is_empty());
        next.set(Direction::Right, "b");
        next.set(Direction::Up, "c");
        assert_eq!(next.get(Direction::Right), Some("b"));
        assert_eq!(next.get(Direction::Left), None);
        assert_eq!(
            next.iter().collect::<Vec<_>>(),
            vec![(Direction::Right, "b"), (Direction::Up, "c")]
        );
    }

    #[test]
    fn test_tile_layout() {
        let mut tile = Tile::new("t1", TileType::Ocean);
        tile.next.set(Direction::Left, "t0");
        let value = serde_json::to_value(&tile).unwrap();
        assert_eq!(value["tile_type"], "ocean");
        assert_eq!(value["next"]["left"], "t0");
        assert_eq!(value["next"]["down"], serde_json::Value::Null);
        assert_eq!(value["entities"], json!([]));
    }
}
