// src/catalog/tables.rs
//! Data tables behind the classification heuristics.
//!
//! Upstream revisions mostly mean editing a table here, not the logic in
//! `classify`. All needles are lowercase; matching is substring on the
//! lowercased display name / key unless noted otherwise.
//!
//! Id tables are ordered: the first matching needle wins, so specific
//! variants must come before the generic class name.

/// `type` attribute values a chassis entry may carry.
pub const CHASSIS_ENTRY_TYPES: &[&str] = &["model", "unit"];

/// Names that are never a chassis, whatever their stats say.
pub const CHASSIS_DENYLIST: &[&str] = &[
    // formations
    "maniple", "battlegroup", "banner", "formation",
    // stratagems / wargear / upgrades
    "stratagem", "wargear", "upgrade", "trait",
    // generic infantry & support
    "infantry", "militia", "servitor", "auxilia",
    // narrative-only / mission furniture
    "objective", "scenario", "mission", "terrain",
    // factions
    "legion",
];

/// Known chassis classes; a name containing one of these skips the stat check.
pub const CHASSIS_ALLOWLIST: &[&str] = &[
    "warhound", "reaver", "warlord", "warbringer", "warmaster", "dire wolf", "direwolf",
    "questoris", "cerastus", "acastus", "armiger",
];

/// Characteristic keys that only a "real" unit profile carries.
pub const STRONG_STAT_KEYS: &[&str] = &["command", "ballistic", "weapon skill", "shield", "reactor"];
/// Exact (whole-key) short forms of the above.
pub const STRONG_STAT_SHORT_KEYS: &[&str] = &["cmd", "bs", "ws"];

/// Characteristic keys that look like a titan maximum track.
pub const TITAN_MAXIMUM_KEYS: &[&str] = &["shield", "reactor", "track"];

/// Keys feeding the three extracted maxima. Keys containing an exclusion are skipped
/// ("Void Shield Saves" is not a shield count).
pub const SHIELD_KEYS: &[&str] = &["shield"];
pub const REACTOR_KEYS: &[&str] = &["reactor", "plasma"];
pub const HEAT_KEYS: &[&str] = &["heat"];
pub const MAXIMUM_KEY_EXCLUSIONS: &[&str] = &["save"];

/// Category/name markers of legendary or narrative-only chassis.
pub const LEGENDARY_MARKERS: &[&str] = &["legendary", "narrative"];

/// Name or category markers of a formation (multi-unit group).
pub const FORMATION_MARKERS: &[&str] = &["maniple", "battlegroup", "banner", "formation"];

/// A legion entry's name starts with one of these.
pub const FACTION_PREFIXES: &[&str] = &["legio ", "legion "];
/// ...or its primary category's name starts with one of these.
pub const FACTION_GROUP_TOKENS: &[&str] = &["legio", "legion"];

/// Container (group/entry/category) names that hold traits.
pub const TRAIT_TOKENS: &[&str] = &["trait"];
/// Container names that hold upgrades.
pub const UPGRADE_TOKENS: &[&str] = &["wargear", "upgrade", "stratagem"];

/// Weapon profiles: the profile `typeName` (or name) mentions this.
pub const WEAPON_PROFILE_MARKER: &str = "weapon";
pub const CARAPACE_TOKEN: &str = "carapace";
pub const LEFT_TOKEN: &str = "left";
pub const RIGHT_TOKEN: &str = "right";

/// Cost names that mean "points".
pub const POINTS_COST_MARKERS: &[&str] = &["pts", "point"];

// Weapon characteristic spellings seen across catalog revisions (whole key, lowercase).
pub const SHORT_RANGE_KEYS: &[&str] = &["short range", "range (short)", "short", "sr", "s. range", "rng (s)"];
pub const LONG_RANGE_KEYS: &[&str] = &["long range", "range (long)", "long", "lr", "l. range", "rng (l)"];
pub const COMBINED_RANGE_KEYS: &[&str] = &["range", "rng", "range (s/l)"];
pub const SHORT_ACC_KEYS: &[&str] = &["short accuracy", "accuracy (short)", "acc (short)", "short acc", "sa", "acc (s)"];
pub const LONG_ACC_KEYS: &[&str] = &["long accuracy", "accuracy (long)", "acc (long)", "long acc", "la", "acc (l)"];
pub const COMBINED_ACC_KEYS: &[&str] = &["accuracy", "acc", "accuracy (s/l)"];
pub const DICE_KEYS: &[&str] = &["dice", "d", "shots"];
pub const STRENGTH_KEYS: &[&str] = &["strength", "str", "s"];
pub const TRAIT_KEYS: &[&str] = &["traits", "trait", "special rules", "special"];

/// Stat values meaning "does not apply".
pub const NOT_APPLICABLE_VALUES: &[&str] = &["-", "\u{2013}", "\u{2014}", "n/a", "na"];
/// Stat values meaning "template weapon".
pub const TEMPLATE_VALUES: &[&str] = &["t", "template"];

/// Stable chassis ids. These are persisted by users; never change an id,
/// only add rows.
pub const KNOWN_CHASSIS_IDS: &[(&str, &str)] = &[
    ("sinister", "warlord-sinister"),
    ("iconoclast", "warmaster-iconoclast"),
    ("nemesis", "warbringer-nemesis"),
    ("warbringer", "warbringer-nemesis"),
    ("dire wolf", "dire-wolf"),
    ("direwolf", "dire-wolf"),
    ("warhound", "warhound"),
    ("reaver", "reaver"),
    ("warlord", "warlord"),
    ("warmaster", "warmaster"),
    ("asterius", "acastus-asterius"),
    ("porphyrion", "acastus-porphyrion"),
];

/// Stable weapon ids, same rules as above.
pub const KNOWN_WEAPON_IDS: &[(&str, &str)] = &[
    ("belicosa volcano cannon", "belicosa-volcano-cannon"),
    ("volcano cannon", "volcano-cannon"),
    ("macro-gatling", "macro-gatling-blaster"),
    ("macro gatling", "macro-gatling-blaster"),
    ("gatling blaster", "gatling-blaster"),
    ("sunfury plasma annihilator", "sunfury-plasma-annihilator"),
    ("plasma blastgun", "plasma-blastgun"),
    ("plasma destructor", "plasma-destructor"),
    ("turbo-laser destructor", "turbo-laser-destructor"),
    ("turbo laser destructor", "turbo-laser-destructor"),
    ("vulcan mega-bolter", "vulcan-mega-bolter"),
    ("vulcan mega bolter", "vulcan-mega-bolter"),
    ("inferno gun", "inferno-gun"),
    ("melta cannon", "melta-cannon"),
    ("laser blaster", "laser-blaster"),
    ("volkite eradicator", "volkite-eradicator"),
    ("arioch power claw", "arioch-power-claw"),
    ("reaver chainfist", "reaver-chainfist"),
    ("warlord power claw", "power-claw"),
    ("power fist", "power-fist"),
    ("apocalypse missile", "apocalypse-missile-launcher"),
    ("vortex missile", "vortex-missile"),
    ("mori quake cannon", "mori-quake-cannon"),
    ("conversion beam", "conversion-beam-dissolution-cannon"),
];
