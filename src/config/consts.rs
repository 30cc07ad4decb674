// src/config/consts.rs

// Net config
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/BSData/adeptus-titanicus/master/";
pub const DEFAULT_FILES: &[&str] = &[
    "Adeptus Titanicus 2018.gst",
    "Titan Legions.cat",
    "Questoris Household.cat",
];
pub const USER_AGENT: &str = concat!("titan_scrape/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT_SECS: u64 = 20;

// Override data (relative to the override base)
pub const OVERRIDE_SUBPATH: &str = "overrides/";
pub const CHASSIS_STATS_FILE: &str = "chassis_stats.json";
pub const DAMAGE_TRACKS_FILE: &str = "damage_tracks.json";
pub const WEAPON_META_FILE: &str = "weapon_meta.json";

/// Chassis id → override-table key, for chassis that were renamed or that
/// share stat lines. Ids not listed are their own key.
pub const CHASSIS_ALIASES: &[(&str, &str)] = &[
    ("warlord-sinister", "warlord"),
    ("warmaster-iconoclast", "warmaster"),
    ("warbringer-nemesis", "warbringer"),
    ("reaver-mars", "reaver"),
    ("direwolf", "dire-wolf"),
];

/// A rule always appended to a chassis, unless one of its rules already
/// contains `unless_contains` (lowercase).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleInjection {
    pub chassis_key: &'static str,
    pub rule: &'static str,
    pub unless_contains: &'static str,
}

// Content policy, not logic: the Warhound has always been shown with this
// rule even though the catalog files only carry it on the legio entries.
// Product owners to confirm it is still wanted.
pub const RULE_INJECTIONS: &[RuleInjection] = &[
    RuleInjection { chassis_key: "warhound", rule: "Agile", unless_contains: "agile" },
];
