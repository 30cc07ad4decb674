// src/catalog/classify.rs
// Classification heuristics as small named predicates over a candidate.
// Each chain is an ordered list; the first predicate with an opinion decides.

use super::tables::*;

/// What we know about an entry before deciding what it is.
#[derive(Clone, Debug, Default)]
pub struct Candidate<'a> {
    /// Sanitized display name.
    pub name: &'a str,
    /// Raw `type` attribute, if any.
    pub entry_type: Option<&'a str>,
    /// Characteristic keys of every profile on the entry.
    pub stat_keys: &'a [String],
    /// Category link names.
    pub categories: &'a [String],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept(&'static str),
    Reject(&'static str),
}

impl Verdict {
    pub fn accepted(self) -> bool {
        matches!(self, Verdict::Accept(_))
    }
}

type Step = fn(&Candidate<'_>) -> Option<Verdict>;

fn lc_contains_any(s: &str, needles: &[&str]) -> bool {
    let lc = s.to_ascii_lowercase();
    needles.iter().any(|n| lc.contains(n))
}

fn wrong_entry_type(c: &Candidate<'_>) -> Option<Verdict> {
    match c.entry_type {
        Some(t) if !CHASSIS_ENTRY_TYPES.iter().any(|k| t.eq_ignore_ascii_case(k)) => Some(Verdict::Reject("entry type")),
        _ => None,
    }
}

fn denylisted(c: &Candidate<'_>) -> Option<Verdict> {
    lc_contains_any(c.name, CHASSIS_DENYLIST).then_some(Verdict::Reject("denylisted name"))
}

fn allowlisted(c: &Candidate<'_>) -> Option<Verdict> {
    lc_contains_any(c.name, CHASSIS_ALLOWLIST).then_some(Verdict::Accept("known chassis class"))
}

fn stat_shape(c: &Candidate<'_>) -> Option<Verdict> {
    if has_strong_stat(c.stat_keys) && has_titan_maximum(c.stat_keys) {
        Some(Verdict::Accept("stat profile"))
    } else {
        Some(Verdict::Reject("no titan stat profile"))
    }
}

const CHASSIS_CHAIN: &[Step] = &[wrong_entry_type, denylisted, allowlisted, stat_shape];

/// Run the chassis chain. Always produces a verdict.
pub fn chassis(c: &Candidate<'_>) -> Verdict {
    CHASSIS_CHAIN
        .iter()
        .find_map(|step| step(c))
        .unwrap_or(Verdict::Reject("no rule matched"))
}

pub fn has_strong_stat(keys: &[String]) -> bool {
    keys.iter().any(|k| {
        let lc = k.to_ascii_lowercase();
        STRONG_STAT_KEYS.iter().any(|s| lc.contains(s)) || STRONG_STAT_SHORT_KEYS.contains(&lc.as_str())
    })
}

pub fn has_titan_maximum(keys: &[String]) -> bool {
    keys.iter().any(|k| lc_contains_any(k, TITAN_MAXIMUM_KEYS))
}

pub fn is_legendary(c: &Candidate<'_>) -> bool {
    lc_contains_any(c.name, LEGENDARY_MARKERS) || c.categories.iter().any(|cat| lc_contains_any(cat, LEGENDARY_MARKERS))
}

pub fn is_formation(c: &Candidate<'_>) -> bool {
    lc_contains_any(c.name, FORMATION_MARKERS) || c.categories.iter().any(|cat| lc_contains_any(cat, FORMATION_MARKERS))
}

/// Legion: name starts with a faction prefix, or its primary category starts
/// with a faction token.
pub fn is_legion(name: &str, primary_category: Option<&str>) -> bool {
    let lc = name.to_ascii_lowercase();
    if FACTION_PREFIXES.iter().any(|p| lc.starts_with(p)) {
        return true;
    }
    primary_category.is_some_and(|cat| {
        let lc = cat.to_ascii_lowercase();
        FACTION_GROUP_TOKENS.iter().any(|t| lc.starts_with(t))
    })
}

/// Any of the names (entry, enclosing groups, categories) marks a trait.
pub fn mentions_trait<'s, I>(names: I) -> bool
where
    I: IntoIterator<Item = &'s str>,
{
    names.into_iter().any(|n| lc_contains_any(n, TRAIT_TOKENS))
}

pub fn mentions_upgrade<'s, I>(names: I) -> bool
where
    I: IntoIterator<Item = &'s str>,
{
    names.into_iter().any(|n| lc_contains_any(n, UPGRADE_TOKENS))
}

/// A profile is a weapon profile if its `typeName` (or name) mentions "weapon".
pub fn is_weapon_profile(type_name: &str, name: &str) -> bool {
    contains_weapon(type_name) || contains_weapon(name)
}

fn contains_weapon(s: &str) -> bool {
    s.to_ascii_lowercase().contains(WEAPON_PROFILE_MARKER)
}
