// src/catalog/ids.rs
// Stable identifiers. Users persist these, so an id produced once must keep
// coming out the same across catalog revisions: known names go through the
// fixed tables, everything else gets a prefixed raw-id or name slug.

use super::tables::{KNOWN_CHASSIS_IDS, KNOWN_WEAPON_IDS};
use crate::core::sanitize::slugify;

pub const CHASSIS_PREFIX: &str = "titan";
pub const WEAPON_PREFIX: &str = "weapon";
pub const FORMATION_PREFIX: &str = "formation";
pub const LEGION_PREFIX: &str = "legio";
pub const UPGRADE_PREFIX: &str = "upgrade";
pub const TRAIT_PREFIX: &str = "trait";

fn known(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    let lc = name.to_ascii_lowercase();
    table.iter().find(|(needle, _)| lc.contains(needle)).map(|(_, id)| *id)
}

/// `prefix-<raw id>` when the source gave one, else `prefix-<name slug>`.
fn fallback(prefix: &str, raw_id: Option<&str>, name: &str) -> String {
    let raw = raw_id.map(slugify).unwrap_or_default();
    if !raw.is_empty() {
        return format!("{prefix}-{raw}");
    }
    slug_id(prefix, name)
}

/// `prefix-<name slug>`, never bare.
pub fn slug_id(prefix: &str, name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        format!("{prefix}-unnamed")
    } else if slug == prefix || slug.starts_with(&format!("{prefix}-")) {
        slug
    } else {
        format!("{prefix}-{slug}")
    }
}

/// `name` must already be sanitized (see `sanitize::display_name`).
pub fn chassis_id(name: &str, raw_id: Option<&str>) -> String {
    match known(KNOWN_CHASSIS_IDS, name) {
        Some(id) => s!(id),
        None => fallback(CHASSIS_PREFIX, raw_id, name),
    }
}

pub fn weapon_id(name: &str, raw_id: Option<&str>) -> String {
    match known(KNOWN_WEAPON_IDS, name) {
        Some(id) => s!(id),
        None => fallback(WEAPON_PREFIX, raw_id, name),
    }
}
