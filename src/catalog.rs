// =============================================================================
// EloDex Backend - Static Species Catalog
// =============================================================================
// Loaded once at startup from JSON tables and shared read-only for the
// process lifetime:
// - species.json:          { "<speciesId>": { id, name, types, abilities, flags } }
// - evolution_roots.json:  { "<speciesId>": <rootSpeciesId> }
// The root table is produced offline by the `evolution-roots` binary.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// One ability slot of a species.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesAbility {
    pub ability_id: String,
    pub is_hidden: bool,
    pub slot: u32,
}

/// Rarity flags. Ultra beasts carry no flag in the source data; they are
/// handled by a fixed denylist in the starter rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeciesFlags {
    pub legendary: bool,
    pub mythical: bool,
}

/// A static creature definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Species {
    pub id: u32,
    pub name: String,
    pub types: Vec<String>,
    pub abilities: Vec<SpeciesAbility>,
    #[serde(default)]
    pub flags: SpeciesFlags,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Failed to parse catalog file {0}: {1}")]
    Parse(String, #[source] serde_json::Error),
}

/// Immutable species catalog plus the evolution-root index.
pub struct Catalog {
    by_id: HashMap<u32, Species>,
    by_name_lower: HashMap<String, u32>,
    roots: HashMap<u32, u32>,
}

impl Catalog {
    /// Load the catalog from `<data_dir>/species.json` and
    /// `<data_dir>/evolution_roots.json`.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let species_path = data_dir.as_ref().join("species.json");
        let roots_path = data_dir.as_ref().join("evolution_roots.json");

        let species_json = std::fs::read_to_string(&species_path)
            .map_err(|e| CatalogError::Io(species_path.display().to_string(), e))?;
        let roots_json = std::fs::read_to_string(&roots_path)
            .map_err(|e| CatalogError::Io(roots_path.display().to_string(), e))?;

        Self::from_json(&species_json, &roots_json)
    }

    /// Parse a catalog from raw JSON strings.
    pub fn from_json(species_json: &str, roots_json: &str) -> Result<Self, CatalogError> {
        let species: HashMap<String, Species> = serde_json::from_str(species_json)
            .map_err(|e| CatalogError::Parse("species.json".into(), e))?;
        let roots_raw: HashMap<String, u32> = serde_json::from_str(roots_json)
            .map_err(|e| CatalogError::Parse("evolution_roots.json".into(), e))?;

        let mut by_id = HashMap::with_capacity(species.len());
        let mut by_name_lower = HashMap::with_capacity(species.len());
        for s in species.into_values() {
            by_name_lower.insert(s.name.to_lowercase(), s.id);
            by_id.insert(s.id, s);
        }

        let roots: HashMap<u32, u32> = roots_raw
            .into_iter()
            .filter_map(|(k, v)| k.parse::<u32>().ok().map(|id| (id, v)))
            .collect();

        for id in by_id.keys() {
            if !roots.contains_key(id) {
                tracing::warn!(species_id = id, "species missing from evolution-root index");
            }
        }

        Ok(Self {
            by_id,
            by_name_lower,
            roots,
        })
    }

    /// Catalog shipped with the binary. Used by tests and as a dev fallback.
    pub fn bundled() -> Self {
        Self::from_json(
            include_str!("../data/species.json"),
            include_str!("../data/evolution_roots.json"),
        )
        .expect("bundled catalog data is valid")
    }

    pub fn get(&self, id: u32) -> Option<&Species> {
        self.by_id.get(&id)
    }

    /// Case-insensitive name lookup.
    pub fn by_name(&self, name: &str) -> Option<&Species> {
        self.by_name_lower
            .get(&name.to_lowercase())
            .and_then(|id| self.by_id.get(id))
    }

    /// First species of the evolution family. Species absent from the index
    /// map to themselves.
    pub fn root_id(&self, species_id: u32) -> u32 {
        self.roots.get(&species_id).copied().unwrap_or(species_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_index_closure_over_catalog() {
        let catalog = Catalog::bundled();
        assert!(!catalog.is_empty());

        for species in catalog.iter() {
            let root = catalog.root_id(species.id);
            assert!(
                catalog.get(root).is_some(),
                "root {} of species {} ({}) is not a catalog key",
                root,
                species.id,
                species.name
            );
        }
    }

    #[test]
    fn evolutions_resolve_to_family_root() {
        let catalog = Catalog::bundled();
        // Venusaur -> Bulbasaur
        assert_eq!(catalog.root_id(3), 1);
        assert_eq!(catalog.root_id(2), 1);
        // Base forms map to themselves
        assert_eq!(catalog.root_id(1), 1);
        assert_eq!(catalog.root_id(152), 152);
    }

    #[test]
    fn unknown_species_roots_to_itself() {
        let catalog = Catalog::bundled();
        assert_eq!(catalog.root_id(99999), 99999);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let catalog = Catalog::bundled();
        assert_eq!(catalog.by_name("bulbasaur").map(|s| s.id), Some(1));
        assert_eq!(catalog.by_name("BULBASAUR").map(|s| s.id), Some(1));
        assert!(catalog.by_name("missingno").is_none());
    }

    #[test]
    fn abilities_carry_slots_and_hidden_flag() {
        let catalog = Catalog::bundled();
        let bulbasaur = catalog.get(1).unwrap();
        assert!(!bulbasaur.abilities.is_empty());
        assert!(bulbasaur.abilities.iter().any(|a| a.is_hidden));
        assert!(bulbasaur.abilities.iter().all(|a| a.slot >= 1));
    }
}
