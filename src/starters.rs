// =============================================================================
// EloDex Backend - Starter Selection Rules
// =============================================================================
// FREE tier: a fixed 3-species list keyed by (region, class archetype).
// VIP tier: full-catalog search, normalized to evolution-family roots.
// =============================================================================

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Query, State},
    Json,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::catalog::{Catalog, Species};
use crate::db::{PlayerType, StarterPokemon};
use crate::error::AppError;
use crate::AppState;

// -----------------------------------------------------------------------------
// Regions / Classes / Genders
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Kanto,
    Johto,
    Hoenn,
    Sinnoh,
    Unova,
    Kalos,
    Alola,
    Galar,
    Paldea,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Kanto,
        Region::Johto,
        Region::Hoenn,
        Region::Sinnoh,
        Region::Unova,
        Region::Kalos,
        Region::Alola,
        Region::Galar,
        Region::Paldea,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Region::Kanto => "KANTO",
            Region::Johto => "JOHTO",
            Region::Hoenn => "HOENN",
            Region::Sinnoh => "SINNOH",
            Region::Unova => "UNOVA",
            Region::Kalos => "KALOS",
            Region::Alola => "ALOLA",
            Region::Galar => "GALAR",
            Region::Paldea => "PALDEA",
        }
    }

    pub fn from_key(value: &str) -> Option<Region> {
        Region::ALL.iter().copied().find(|r| r.key() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassType {
    Trainer,
    Thief,
}

impl ClassType {
    pub fn key(&self) -> &'static str {
        match self {
            ClassType::Trainer => "TRAINER",
            ClassType::Thief => "THIEF",
        }
    }

    pub fn from_key(value: &str) -> Option<ClassType> {
        match value {
            "TRAINER" => Some(ClassType::Trainer),
            "THIEF" => Some(ClassType::Thief),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
    U,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::M, Gender::F, Gender::U];

    pub fn key(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::U => "U",
        }
    }
}

// -----------------------------------------------------------------------------
// Static Tables
// -----------------------------------------------------------------------------

pub const NATURES: [&str; 25] = [
    "Hardy", "Lonely", "Brave", "Adamant", "Naughty", "Bold", "Docile", "Relaxed", "Impish",
    "Lax", "Timid", "Hasty", "Serious", "Jolly", "Naive", "Modest", "Mild", "Quiet", "Bashful",
    "Rash", "Calm", "Gentle", "Sassy", "Careful", "Quirky",
];

/// Ultra beasts carry no rarity flag in the species data; fixed denylist.
pub const ULTRA_BEAST_NAMES: [&str; 11] = [
    "Nihilego",
    "Buzzwole",
    "Pheromosa",
    "Xurkitree",
    "Celesteela",
    "Kartana",
    "Guzzlord",
    "Poipole",
    "Naganadel",
    "Stakataka",
    "Blacephalon",
];

/// Trainer starters per region.
pub fn starters_for(region: Region) -> [&'static str; 3] {
    match region {
        Region::Kanto => ["Bulbasaur", "Charmander", "Squirtle"],
        Region::Johto => ["Chikorita", "Cyndaquil", "Totodile"],
        Region::Hoenn => ["Treecko", "Torchic", "Mudkip"],
        Region::Sinnoh => ["Turtwig", "Chimchar", "Piplup"],
        Region::Unova => ["Snivy", "Tepig", "Oshawott"],
        Region::Kalos => ["Chespin", "Fennekin", "Froakie"],
        Region::Alola => ["Rowlet", "Litten", "Popplio"],
        Region::Galar => ["Grookey", "Scorbunny", "Sobble"],
        Region::Paldea => ["Sprigatito", "Fuecoco", "Quaxly"],
    }
}

/// Thief picks per region: species used by the region's villain teams.
pub fn villains_for(region: Region) -> [&'static str; 3] {
    match region {
        Region::Kanto => ["Ekans", "Koffing", "Meowth"],
        Region::Johto => ["Houndour", "Sneasel", "Murkrow"],
        Region::Hoenn => ["Carvanha", "Mightyena", "Zubat"],
        Region::Sinnoh => ["Stunky", "Glameow", "Croagunk"],
        Region::Unova => ["Sandile", "Scraggy", "Trubbish"],
        Region::Kalos => ["Pawniard", "Inkay", "Houndour"],
        Region::Alola => ["Rattata", "Grimer", "Meowth"],
        Region::Galar => ["Nickit", "Zigzagoon", "Sneasel"],
        Region::Paldea => ["Maschiff", "Shroodle", "Grafaiai"],
    }
}

/// FREE tier choice list: fixed 3 species for the (region, class) pair.
pub fn free_choices(region: Region, class_type: ClassType) -> [&'static str; 3] {
    match class_type {
        ClassType::Trainer => starters_for(region),
        ClassType::Thief => villains_for(region),
    }
}

// -----------------------------------------------------------------------------
// VIP Search
// -----------------------------------------------------------------------------

fn eligible(species: &Species) -> bool {
    !species.flags.legendary
        && !species.flags.mythical
        && !ULTRA_BEAST_NAMES.contains(&species.name.as_str())
}

fn root_name(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

/// VIP search: case-insensitive substring match over species name and
/// hyphen-stripped root name. Matches are normalized to their evolution-family
/// root, forms are collapsed onto the lowest-id species per root name, results
/// are deduplicated, sorted, and capped at 50.
pub fn vip_search(catalog: &Catalog, raw_query: &str) -> Vec<String> {
    let q = raw_query.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }

    // Display base: eligible species with forms removed, keeping the first
    // (lowest id) per root name.
    let mut base: HashMap<&str, &Species> = HashMap::new();
    for species in catalog.iter().filter(|s| eligible(s)) {
        let root = root_name(&species.name);
        match base.get(root) {
            Some(current) if current.id <= species.id => {}
            _ => {
                base.insert(root, species);
            }
        }
    }

    // Match over everything (evolutions included), then convert to root ids.
    let mut matched_roots: HashSet<u32> = HashSet::new();
    for species in catalog.iter().filter(|s| eligible(s)) {
        let name_lower = species.name.to_lowercase();
        let root_lower = root_name(&name_lower);

        if name_lower.contains(&q) || root_lower.contains(&q) {
            matched_roots.insert(catalog.root_id(species.id));
        }
    }

    let mut names: Vec<String> = base
        .values()
        .filter(|s| matched_roots.contains(&s.id))
        .map(|s| s.name.clone())
        .collect();

    names.sort();
    names.dedup();
    names.truncate(50);
    names
}

// -----------------------------------------------------------------------------
// Starter Resolution
// -----------------------------------------------------------------------------

/// The starter fields a client submits at character creation. For FREE
/// players only the species name matters; the rest is rolled server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct StarterSelection {
    pub species_name: String,
    pub ability_id: Option<String>,
    pub nature: Option<String>,
    pub gender: Option<Gender>,
}

/// Uniform random roll for the FREE tier auto-fill.
fn roll(abilities: &[String]) -> (String, String, Gender) {
    let mut rng = rand::thread_rng();

    let ability = abilities
        .choose(&mut rng)
        .cloned()
        .unwrap_or_default();
    let nature = NATURES.choose(&mut rng).copied().unwrap_or("Docile");
    let gender = Gender::ALL.choose(&mut rng).copied().unwrap_or(Gender::U);

    (ability, nature.to_string(), gender)
}

/// Resolve a starter selection against the catalog and the player's tier.
///
/// FREE: the species must be one of the fixed choices for (region, class);
/// ability, nature, and gender are rolled uniformly at random and the
/// nickname is auto-filled with the species display name.
///
/// VIP: ability, nature, and gender must be supplied explicitly; the ability
/// must belong to the species.
pub fn resolve_starter(
    catalog: &Catalog,
    player_type: PlayerType,
    region: Region,
    class_type: ClassType,
    selection: &StarterSelection,
) -> Result<StarterPokemon, AppError> {
    let species = catalog.by_name(&selection.species_name).ok_or_else(|| {
        AppError::NotFound(format!(
            "Species not found in catalog: {}",
            selection.species_name
        ))
    })?;

    let abilities: Vec<String> = species
        .abilities
        .iter()
        .map(|a| a.ability_id.clone())
        .collect();
    if abilities.is_empty() {
        return Err(AppError::Validation(format!(
            "Species {} has no abilities in the catalog",
            species.name
        )));
    }

    let nickname = species.name.clone();

    let (ability_id, nature, gender) = match player_type {
        PlayerType::Free => {
            let choices = free_choices(region, class_type);
            if !choices.contains(&species.name.as_str()) {
                return Err(AppError::Validation(format!(
                    "{} is not an available starter for {} {}",
                    species.name,
                    region.key(),
                    class_type.key()
                )));
            }
            roll(&abilities)
        }
        PlayerType::Vip => {
            let ability_id = selection
                .ability_id
                .clone()
                .filter(|a| !a.is_empty())
                .ok_or_else(|| AppError::Validation("Ability is required".into()))?;
            if !abilities.contains(&ability_id) {
                return Err(AppError::Validation(format!(
                    "{} cannot have the ability {}",
                    species.name, ability_id
                )));
            }

            let nature = selection
                .nature
                .clone()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AppError::Validation("Nature is required".into()))?;
            if !NATURES.contains(&nature.as_str()) {
                return Err(AppError::Validation(format!("Unknown nature: {nature}")));
            }

            let gender = selection
                .gender
                .ok_or_else(|| AppError::Validation("Gender is required".into()))?;

            (ability_id, nature, gender)
        }
    };

    Ok(StarterPokemon {
        species_id: species.id as i64,
        species_name: species.name.clone(),
        nickname,
        ability_id,
        nature,
        gender: gender.key().to_string(),
    })
}

// -----------------------------------------------------------------------------
// Handler
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StarterQuery {
    pub region: Region,
    pub class_type: ClassType,
    /// VIP-only free-text search; ignored for FREE players.
    pub query: Option<String>,
}

/// List the starter choices available to the authenticated player.
pub async fn get_starters(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StarterQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let player = state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    let choices: Vec<String> = match player.player_type() {
        PlayerType::Free => free_choices(query.region, query.class_type)
            .iter()
            .map(|s| s.to_string())
            .collect(),
        PlayerType::Vip => vip_search(&state.catalog, query.query.as_deref().unwrap_or("")),
    };

    Ok(Json(serde_json::json!({ "choices": choices })))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanto_trainer_free_choices() {
        let choices = free_choices(Region::Kanto, ClassType::Trainer);
        assert_eq!(choices, ["Bulbasaur", "Charmander", "Squirtle"]);
    }

    #[test]
    fn thief_choices_are_disjoint_from_trainer_choices() {
        for region in Region::ALL {
            let trainers = starters_for(region);
            let thieves = villains_for(region);
            for name in thieves {
                assert!(!trainers.contains(&name), "{name} appears in both sets");
            }
        }
    }

    #[test]
    fn every_fixed_choice_exists_in_catalog() {
        let catalog = Catalog::bundled();
        for region in Region::ALL {
            for class in [ClassType::Trainer, ClassType::Thief] {
                for name in free_choices(region, class) {
                    assert!(
                        catalog.by_name(name).is_some(),
                        "{name} missing from catalog"
                    );
                }
            }
        }
    }

    #[test]
    fn vip_search_normalizes_to_evolution_root() {
        let catalog = Catalog::bundled();
        let results = vip_search(&catalog, "venusaur");
        assert_eq!(results, vec!["Bulbasaur".to_string()]);
    }

    #[test]
    fn vip_search_excludes_rarities_and_ultra_beasts() {
        let catalog = Catalog::bundled();
        // Mewtwo (legendary) and Mew (mythical) are the only "mew" matches.
        assert!(vip_search(&catalog, "mew").is_empty());
        // Kartana and Nihilego are denylisted ultra beasts.
        assert!(vip_search(&catalog, "kartana").is_empty());
        assert!(vip_search(&catalog, "nihilego").is_empty());
    }

    #[test]
    fn vip_search_collapses_forms_onto_base_species() {
        let catalog = Catalog::bundled();
        // "Meowth-alola" matches but only the base Meowth is displayed.
        let results = vip_search(&catalog, "meowth");
        assert_eq!(results, vec!["Meowth".to_string()]);
    }

    #[test]
    fn vip_search_sorts_dedups_and_caps() {
        let catalog = Catalog::bundled();
        let results = vip_search(&catalog, "a");
        assert!(results.len() <= 50);
        let mut sorted = results.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(results, sorted);
    }

    #[test]
    fn vip_search_with_blank_query_is_empty() {
        let catalog = Catalog::bundled();
        assert!(vip_search(&catalog, "").is_empty());
        assert!(vip_search(&catalog, "   ").is_empty());
    }

    #[test]
    fn free_resolution_rolls_from_species_abilities() {
        let catalog = Catalog::bundled();
        let selection = StarterSelection {
            species_name: "Bulbasaur".into(),
            ability_id: None,
            nature: None,
            gender: None,
        };

        let starter = resolve_starter(
            &catalog,
            PlayerType::Free,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap();

        assert_eq!(starter.species_id, 1);
        assert_eq!(starter.nickname, "Bulbasaur");
        assert!(["overgrow", "chlorophyll"].contains(&starter.ability_id.as_str()));
        assert!(NATURES.contains(&starter.nature.as_str()));
        assert!(["M", "F", "U"].contains(&starter.gender.as_str()));
    }

    #[test]
    fn free_resolution_rejects_off_list_species() {
        let catalog = Catalog::bundled();
        let selection = StarterSelection {
            species_name: "Ekans".into(),
            ability_id: None,
            nature: None,
            gender: None,
        };

        let err = resolve_starter(
            &catalog,
            PlayerType::Free,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unknown_species_is_not_found() {
        let catalog = Catalog::bundled();
        let selection = StarterSelection {
            species_name: "MissingNo".into(),
            ability_id: None,
            nature: None,
            gender: None,
        };

        let err = resolve_starter(
            &catalog,
            PlayerType::Free,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn vip_resolution_requires_explicit_fields() {
        let catalog = Catalog::bundled();
        let selection = StarterSelection {
            species_name: "Bulbasaur".into(),
            ability_id: None,
            nature: None,
            gender: None,
        };

        let err = resolve_starter(
            &catalog,
            PlayerType::Vip,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let selection = StarterSelection {
            species_name: "Bulbasaur".into(),
            ability_id: Some("chlorophyll".into()),
            nature: Some("Adamant".into()),
            gender: Some(Gender::F),
        };
        let starter = resolve_starter(
            &catalog,
            PlayerType::Vip,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap();
        assert_eq!(starter.ability_id, "chlorophyll");
        assert_eq!(starter.nature, "Adamant");
        assert_eq!(starter.gender, "F");
    }

    #[test]
    fn vip_resolution_rejects_foreign_ability() {
        let catalog = Catalog::bundled();
        let selection = StarterSelection {
            species_name: "Bulbasaur".into(),
            ability_id: Some("blaze".into()),
            nature: Some("Adamant".into()),
            gender: Some(Gender::M),
        };

        let err = resolve_starter(
            &catalog,
            PlayerType::Vip,
            Region::Kanto,
            ClassType::Trainer,
            &selection,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
