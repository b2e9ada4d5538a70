//! Static board topology: territories, continents and adjacency

use crate::error::RulesError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Territory index (dense, 0-based)
pub type TerritoryId = usize;

/// Continent index (dense, 0-based)
pub type ContinentId = usize;

/// A continent and the troop bonus for holding all of it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentDef {
    pub id: ContinentId,
    pub name: String,
    pub bonus: u32,
}

/// A territory, its continent and its neighbours
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryDef {
    pub id: TerritoryId,
    pub name: String,
    pub continent: ContinentId,
    #[serde(default)]
    pub neighbors: Vec<TerritoryId>,
}

/// Board topology (immutable once built)
///
/// Adjacency is always symmetric: a link listed on either side is
/// stored on both.
#[derive(Clone, Debug, Serialize)]
pub struct Board {
    pub name: String,
    continents: Vec<ContinentDef>,
    territories: Vec<TerritoryDef>,
    #[serde(skip)]
    members: Vec<Vec<TerritoryId>>,
}

#[derive(Deserialize)]
struct BoardFile {
    name: Option<String>,
    continents: Vec<ContinentDef>,
    territories: Vec<TerritoryDef>,
}

impl Board {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Build a board, validating ids and symmetrising adjacency
    pub fn new(
        name: impl Into<String>,
        continents: Vec<ContinentDef>,
        mut territories: Vec<TerritoryDef>,
    ) -> Result<Self, RulesError> {
        if territories.is_empty() {
            return Err(RulesError::EmptyBoard);
        }
        for (expected, c) in continents.iter().enumerate() {
            if c.id != expected {
                return Err(RulesError::NonDenseTerritoryIds { expected, found: c.id });
            }
        }
        for (expected, t) in territories.iter().enumerate() {
            if t.id != expected {
                return Err(RulesError::NonDenseTerritoryIds { expected, found: t.id });
            }
            if t.continent >= continents.len() {
                return Err(RulesError::UnknownContinent {
                    territory: t.id,
                    continent: t.continent,
                });
            }
        }

        // Collect every link once, then write both directions back
        let count = territories.len();
        let mut links = Vec::new();
        for t in &territories {
            for &n in &t.neighbors {
                if n >= count {
                    return Err(RulesError::UnknownTerritory(n));
                }
                if n == t.id {
                    return Err(RulesError::SelfAdjacent(n));
                }
                links.push((t.id, n));
            }
        }
        for t in territories.iter_mut() {
            t.neighbors.clear();
        }
        for (a, b) in links {
            if !territories[a].neighbors.contains(&b) {
                territories[a].neighbors.push(b);
            }
            if !territories[b].neighbors.contains(&a) {
                territories[b].neighbors.push(a);
            }
        }
        for t in territories.iter_mut() {
            t.neighbors.sort_unstable();
        }

        let mut members = vec![Vec::new(); continents.len()];
        for t in &territories {
            members[t.continent].push(t.id);
        }
        if let Some(empty) = members.iter().position(|m| m.is_empty()) {
            return Err(RulesError::EmptyContinent(empty));
        }

        Ok(Self {
            name: name.into(),
            continents,
            territories,
            members,
        })
    }

    /// Build a board from compact tables
    ///
    /// `continents` are `(name, bonus)`, `territories` are `(name, continent)`
    /// and `links` are undirected adjacency pairs.
    pub fn from_links(
        name: impl Into<String>,
        continents: &[(&str, u32)],
        territories: &[(&str, ContinentId)],
        links: &[(TerritoryId, TerritoryId)],
    ) -> Result<Self, RulesError> {
        let continents = continents
            .iter()
            .enumerate()
            .map(|(id, (name, bonus))| ContinentDef {
                id,
                name: name.to_string(),
                bonus: *bonus,
            })
            .collect();
        let mut territories: Vec<TerritoryDef> = territories
            .iter()
            .enumerate()
            .map(|(id, (name, continent))| TerritoryDef {
                id,
                name: name.to_string(),
                continent: *continent,
                neighbors: Vec::new(),
            })
            .collect();
        for &(a, b) in links {
            let t = territories.get_mut(a).ok_or(RulesError::UnknownTerritory(a))?;
            t.neighbors.push(b);
        }
        Self::new(name, continents, territories)
    }

    /// Built-in board: four continents, fourteen territories
    pub fn classic_mini() -> Self {
        let continents = [("Northreach", 3), ("Eastmarch", 2), ("Southvale", 5), ("Westholm", 1)];
        let territories = [
            ("Aldmoor", 0),
            ("Brisk", 0),
            ("Caldera", 0),
            ("Dunmere", 0),
            ("Eastwatch", 1),
            ("Fenwick", 1),
            ("Glimmer", 1),
            ("Harrow", 2),
            ("Ironvale", 2),
            ("Jasper", 2),
            ("Kestrel", 2),
            ("Lowfield", 2),
            ("Marrow", 3),
            ("Northwold", 3),
        ];
        let links = [
            (0, 1), (0, 2), (1, 2), (1, 3), (2, 3),
            (3, 4),
            (4, 5), (4, 6), (5, 6),
            (6, 7),
            (7, 8), (7, 9), (8, 9), (8, 10), (9, 11), (10, 11),
            (10, 12),
            (12, 13),
            (13, 0),
        ];
        match Self::from_links("classic-mini", &continents, &territories, &links) {
            Ok(board) => board,
            Err(e) => unreachable!("built-in board is valid: {e}"),
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: BoardFile = serde_json::from_str(&content)?;
        let name = file.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".to_string())
        });
        Ok(Self::new(name, file.continents, file.territories)?)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    pub fn continent_count(&self) -> usize {
        self.continents.len()
    }

    pub fn territory_ids(&self) -> std::ops::Range<TerritoryId> {
        0..self.territories.len()
    }

    pub fn territory(&self, id: TerritoryId) -> Option<&TerritoryDef> {
        self.territories.get(id)
    }

    pub fn continents(&self) -> &[ContinentDef] {
        &self.continents
    }

    /// Neighbours of a territory (sorted; empty for unknown ids)
    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        self.territories
            .get(id)
            .map(|t| t.neighbors.as_slice())
            .unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    pub fn continent_of(&self, id: TerritoryId) -> Option<ContinentId> {
        self.territories.get(id).map(|t| t.continent)
    }

    /// Territories belonging to a continent
    pub fn continent_members(&self, continent: ContinentId) -> &[TerritoryId] {
        self.members
            .get(continent)
            .map(|m| m.as_slice())
            .unwrap_or(&[])
    }

    pub fn continent_bonus(&self, continent: ContinentId) -> u32 {
        self.continents.get(continent).map(|c| c.bonus).unwrap_or(0)
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.continents == other.continents && self.territories == other.territories
    }
}
