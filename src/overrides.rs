// src/overrides.rs
//! Override tables: values the catalog omits or that the app wants to
//! customise. Three JSON files under `overrides/` of the override base:
//!
//! - `chassis_stats.json`: chassis key → [`ChassisStats`]
//! - `damage_tracks.json`: chassis key → location → [`LocationTrack`]
//! - `weapon_meta.json`: `"name|mount"` → [`WeaponMeta`]
//!
//! Each table fails on its own: a non-success answer or bad JSON leaves that
//! table empty and adds a warning. Only transport failures are errors.
//!
//! The first successful load is kept for the life of the process (not keyed
//! by base) until [`clear`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::Mount;
use crate::config::consts::{CHASSIS_STATS_FILE, DAMAGE_TRACKS_FILE, WEAPON_META_FILE};
use crate::config::CatalogOptions;
use crate::core::net::Fetch;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChassisStats {
    pub reactor_max: Option<u32>,
    pub shield_max: Option<u32>,
    pub heat_max: Option<u32>,
    #[serde(deserialize_with = "loose_strings")]
    pub shield_saves: Vec<String>,
    pub special_rules: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArmorRolls {
    pub direct: Option<u32>,
    pub devastating: Option<u32>,
    pub critical: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationTrack {
    pub max: Option<u32>,
    pub armor: ArmorRolls,
    /// Modifier per damage pip, first pip first.
    pub pips: Vec<i32>,
    pub criticals: Vec<String>,
}

/// Location name (`head`, `body`, `legs`) → track.
pub type DamageTrack = BTreeMap<String, LocationTrack>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaponMeta {
    pub repair_roll: Option<u32>,
    pub disabled: Vec<String>,
}

/// Values may be written as `"3+"` or `3`.
fn loose_strings<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
    }
    let items: Vec<Loose> = Vec::deserialize(de)?;
    Ok(items
        .into_iter()
        .map(|l| match l {
            Loose::Text(s) => s,
            Loose::Number(n) => n.to_string(),
        })
        .collect())
}

/// Table key: trimmed, ASCII lowercase.
pub fn table_key(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

pub fn weapon_key(name: &str, mount: Mount) -> String {
    table_key(&join!(name.trim(), "|", mount.as_str()))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverrideTables {
    pub chassis: BTreeMap<String, ChassisStats>,
    pub damage: BTreeMap<String, DamageTrack>,
    pub weapons: BTreeMap<String, WeaponMeta>,
    pub warnings: Vec<String>,
}

impl OverrideTables {
    pub fn chassis_stats(&self, key: &str) -> Option<&ChassisStats> {
        self.chassis.get(&table_key(key))
    }

    pub fn damage_track(&self, key: &str) -> Option<&DamageTrack> {
        self.damage.get(&table_key(key))
    }

    pub fn weapon_meta(&self, name: &str, mount: Mount) -> Option<&WeaponMeta> {
        self.weapons.get(&weapon_key(name, mount))
    }

    pub fn is_empty(&self) -> bool {
        self.chassis.is_empty() && self.damage.is_empty() && self.weapons.is_empty()
    }
}

/// Fetch and decode one table. Soft failures come back as `(empty, Some(warning))`.
async fn fetch_table<T>(fetcher: &dyn Fetch, url: &str, what: &str) -> Result<(BTreeMap<String, T>, Option<String>)>
where
    T: DeserializeOwned,
{
    let decoded = match fetcher.get(url).await {
        Ok(body) => serde_json::from_str::<BTreeMap<String, T>>(&body)
            .map_err(|e| Error::Json { what: s!(what), message: e.to_string() }),
        Err(e) => Err(e),
    };
    match decoded {
        Ok(raw) => {
            let mut table = BTreeMap::new();
            for (k, v) in raw {
                table.entry(table_key(&k)).or_insert(v);
            }
            logd!("overrides: {what}: {} rows", table.len());
            Ok((table, None))
        }
        Err(e) if e.is_soft() => {
            let msg = format!("override table {what} unavailable: {e}");
            logw!("{msg}");
            Ok((BTreeMap::new(), Some(msg)))
        }
        Err(e) => Err(e),
    }
}

/// One uncached load of all three tables, in parallel.
pub async fn fetch_tables(fetcher: &dyn Fetch, opts: &CatalogOptions) -> Result<OverrideTables> {
    let (Some(chassis_url), Some(damage_url), Some(weapon_url)) = (
        opts.override_url(CHASSIS_STATS_FILE),
        opts.override_url(DAMAGE_TRACKS_FILE),
        opts.override_url(WEAPON_META_FILE),
    ) else {
        logd!("overrides: no override base configured");
        return Ok(OverrideTables::default());
    };

    let (chassis, damage, weapons) = tokio::join!(
        fetch_table::<ChassisStats>(fetcher, &chassis_url, CHASSIS_STATS_FILE),
        fetch_table::<DamageTrack>(fetcher, &damage_url, DAMAGE_TRACKS_FILE),
        fetch_table::<WeaponMeta>(fetcher, &weapon_url, WEAPON_META_FILE),
    );
    let (chassis, w1) = chassis?;
    let (damage, w2) = damage?;
    let (weapons, w3) = weapons?;

    let tables = OverrideTables {
        chassis,
        damage,
        weapons,
        warnings: [w1, w2, w3].into_iter().flatten().collect(),
    };
    logf!(
        "overrides: {} chassis, {} damage tracks, {} weapons, {} warnings",
        tables.chassis.len(),
        tables.damage.len(),
        tables.weapons.len(),
        tables.warnings.len()
    );
    Ok(tables)
}

/* ---------------- Process-wide cache ---------------- */

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<OverrideTables>>>>;

enum State {
    Empty,
    Loading { generation: u64, load: SharedLoad },
    Ready(Arc<OverrideTables>),
}

struct Inner {
    state: State,
    generation: u64,
}

/// First-successful-load cache with one shared in-flight load.
/// A failed load is not kept; the next caller starts over.
pub struct OverrideCache {
    inner: Mutex<Inner>,
}

impl Default for OverrideCache {
    fn default() -> Self { Self::new() }
}

impl OverrideCache {
    pub const fn new() -> Self {
        Self { inner: Mutex::new(Inner { state: State::Empty, generation: 0 }) }
    }

    pub async fn load(&self, fetcher: Arc<dyn Fetch>, opts: &CatalogOptions) -> Result<Arc<OverrideTables>> {
        let (generation, load) = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let in_flight = match &inner.state {
                State::Ready(tables) => return Ok(Arc::clone(tables)),
                State::Loading { generation, load } => Some((*generation, load.clone())),
                State::Empty => None,
            };
            match in_flight {
                Some(found) => found,
                None => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let opts = opts.clone();
                    let load = async move { fetch_tables(fetcher.as_ref(), &opts).await.map(Arc::new) }
                        .boxed()
                        .shared();
                    inner.state = State::Loading { generation, load: load.clone() };
                    logd!("overrides: load #{generation} started");
                    (generation, load)
                }
            }
        };

        let result = load.await;

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let current = matches!(&inner.state, State::Loading { generation: g, .. } if *g == generation);
        if current {
            inner.state = match &result {
                Ok(tables) => State::Ready(Arc::clone(tables)),
                Err(_) => State::Empty,
            };
        }
        result
    }

    /// Forget the cached tables. An in-flight load still finishes for its
    /// callers but no longer fills the cache.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.state = State::Empty;
        logd!("overrides: cache cleared");
    }

    pub fn is_loaded(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(inner.state, State::Ready(_))
    }
}

static GLOBAL: OverrideCache = OverrideCache::new();

/// Load through the process-wide cache.
pub async fn load(fetcher: Arc<dyn Fetch>, opts: &CatalogOptions) -> Result<Arc<OverrideTables>> {
    GLOBAL.load(fetcher, opts).await
}

/// Reset the process-wide cache.
pub fn clear() {
    GLOBAL.clear();
}
