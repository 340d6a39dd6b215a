// =============================================================================
// EloDex Backend - Evolution Root Index Builder
// =============================================================================
// Offline tool. Reads the bundled species table, resolves each species'
// evolution chain against the public PokeAPI, and writes the root index
// (species id -> base-form id) consumed by the server at startup.
//
// Usage:
//   evolution-roots [data_dir]
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
const FETCH_RETRIES: u32 = 4;
const RETRY_BASE_MS: u64 = 600;

// -----------------------------------------------------------------------------
// API Payloads
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SpeciesPayload {
    evolution_chain: Option<ChainRef>,
}

#[derive(Debug, Deserialize)]
struct ChainRef {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChainPayload {
    chain: ChainLink,
}

#[derive(Debug, Deserialize)]
struct ChainLink {
    species: NamedResource,
    #[serde(default)]
    evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogSpecies {
    id: u32,
}

// -----------------------------------------------------------------------------
// Fetching
// -----------------------------------------------------------------------------

/// GET with linear backoff. Gives up after FETCH_RETRIES attempts.
async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, reqwest::Error> {
    let mut last_err = None;

    for attempt in 1..=FETCH_RETRIES {
        match client.get(url).send().await {
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => return resp.json::<T>().await,
                Err(e) => last_err = Some(e),
            },
            Err(e) => last_err = Some(e),
        }

        if attempt < FETCH_RETRIES {
            tracing::warn!(url, attempt, "fetch failed, retrying");
            tokio::time::sleep(Duration::from_millis(RETRY_BASE_MS * attempt as u64)).await;
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}

/// Trailing id of a resource URL like ".../pokemon-species/1/".
fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
}

/// Root species id of a chain: the species at the head of the chain tree.
fn chain_root(chain: &ChainPayload) -> Option<u32> {
    id_from_url(&chain.chain.species.url)
}

// -----------------------------------------------------------------------------
// Main
// -----------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".into());
    let api_base =
        std::env::var("POKEAPI_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

    let species_path = Path::new(&data_dir).join("species.json");
    let raw = std::fs::read_to_string(&species_path)?;
    let catalog: BTreeMap<String, CatalogSpecies> = serde_json::from_str(&raw)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()?;

    let mut roots: BTreeMap<String, u32> = BTreeMap::new();
    let mut chain_cache: HashMap<String, u32> = HashMap::new();

    for species in catalog.values() {
        let id = species.id;
        let url = format!("{api_base}/pokemon-species/{id}");

        let root = match fetch_json::<SpeciesPayload>(&client, &url).await {
            Ok(payload) => match payload.evolution_chain {
                Some(chain_ref) => {
                    if let Some(&cached) = chain_cache.get(&chain_ref.url) {
                        Some(cached)
                    } else {
                        match fetch_json::<ChainPayload>(&client, &chain_ref.url).await {
                            Ok(chain) => {
                                let root = chain_root(&chain);
                                if let Some(root) = root {
                                    chain_cache.insert(chain_ref.url.clone(), root);
                                }
                                root
                            }
                            Err(e) => {
                                tracing::warn!(id, error = %e, "chain fetch failed");
                                None
                            }
                        }
                    }
                }
                None => None,
            },
            Err(e) => {
                tracing::warn!(id, error = %e, "species fetch failed");
                None
            }
        };

        // Unresolvable species map to themselves so lookups never miss.
        let root = root.unwrap_or(id);
        roots.insert(id.to_string(), root);
        tracing::info!(id, root, "resolved");
    }

    let out_path = Path::new(&data_dir).join("evolution_roots.json");
    std::fs::write(&out_path, serde_json::to_string_pretty(&roots)?)?;
    tracing::info!(count = roots.len(), path = %out_path.display(), "root index written");

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_resource_url() {
        assert_eq!(
            id_from_url("https://pokeapi.co/api/v2/pokemon-species/1/"),
            Some(1)
        );
        assert_eq!(
            id_from_url("https://pokeapi.co/api/v2/pokemon-species/945"),
            Some(945)
        );
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/"), None);
    }

    #[test]
    fn chain_root_is_head_species() {
        let chain = ChainPayload {
            chain: ChainLink {
                species: NamedResource {
                    url: "https://pokeapi.co/api/v2/pokemon-species/1/".into(),
                },
                evolves_to: vec![ChainLink {
                    species: NamedResource {
                        url: "https://pokeapi.co/api/v2/pokemon-species/2/".into(),
                    },
                    evolves_to: Vec::new(),
                }],
            },
        };
        assert_eq!(chain_root(&chain), Some(1));
    }
}
