// src/assemble.rs
//! Skeletons + override tables → final templates.
//!
//! Precedence for the three maxima is catalog first, override second. A
//! maximum neither source provides is recorded in `missing_maxima` with a
//! warning. Templates are built fresh on every load and never mutated.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{
    union_names, ChassisSkeleton, FormationSkeleton, LegionSkeleton, RuleText, TraitSkeleton,
    UpgradeSkeleton, WeaponSkeleton,
};
use crate::config::consts::{CHASSIS_ALIASES, RULE_INJECTIONS};
use crate::overrides::{DamageTrack, LocationTrack, OverrideTables};

/// Locations of the stand-in track used when no damage track is known.
pub const PLACEHOLDER_LOCATIONS: &[&str] = &["head", "body", "legs"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BaseStats {
    pub shield_max: Option<u32>,
    pub reactor_max: Option<u32>,
    pub heat_max: Option<u32>,
    pub shield_saves: Vec<String>,
    pub characteristics: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WeaponTemplate {
    #[serde(flatten)]
    pub weapon: WeaponSkeleton,
    pub repair_roll: Option<u32>,
    pub disabled: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Loadout {
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TitanTemplate {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub points: Option<u32>,
    pub stats: BaseStats,
    pub damage_track: DamageTrack,
    /// `damage_track` is the placeholder, not real data.
    pub damage_placeholder: bool,
    pub weapons: Vec<WeaponTemplate>,
    /// Rule names: chassis ∪ override ∪ injections, case-insensitively deduped.
    pub special_rules: Vec<String>,
    /// Catalog rule bodies, where the catalog had any.
    pub rule_texts: Vec<RuleText>,
    pub loadout: Loadout,
    pub legendary: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxField {
    Shield,
    Reactor,
    Heat,
}

impl MaxField {
    pub fn as_str(self) -> &'static str {
        match self {
            MaxField::Shield => "shield",
            MaxField::Reactor => "reactor",
            MaxField::Heat => "heat",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingMaxima {
    pub id: String,
    pub name: String,
    pub fields: Vec<MaxField>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TitanResult {
    pub templates: Vec<TitanTemplate>,
    pub warnings: Vec<String>,
    pub missing_maxima: Vec<MissingMaxima>,
    /// Ids of legendary / narrative-only chassis, in template order.
    pub legendary: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConceptResult<T> {
    pub templates: Vec<T>,
    pub warnings: Vec<String>,
}

impl<T> Default for ConceptResult<T> {
    fn default() -> Self {
        Self { templates: Vec::new(), warnings: Vec::new() }
    }
}

// The other concepts take no override data; their skeleton is the template.
pub type FormationTemplate = FormationSkeleton;
pub type LegionTemplate = LegionSkeleton;
pub type UpgradeTemplate = UpgradeSkeleton;
pub type TraitTemplate = TraitSkeleton;

/// Override-table key of a chassis id.
pub fn override_key(id: &str) -> &str {
    CHASSIS_ALIASES
        .iter()
        .find(|(from, _)| *from == id)
        .map(|(_, to)| *to)
        .unwrap_or(id)
}

pub fn placeholder_track() -> DamageTrack {
    PLACEHOLDER_LOCATIONS
        .iter()
        .map(|loc| (s!(*loc), LocationTrack::default()))
        .collect()
}

fn resolve_max(field: MaxField, xml: Option<u32>, over: Option<u32>, missing: &mut Vec<MaxField>) -> Option<u32> {
    let v = xml.or(over);
    if v.is_none() {
        missing.push(field);
    }
    v
}

fn apply_injections(key: &str, rules: &mut Vec<String>) {
    for inj in RULE_INJECTIONS.iter().filter(|i| i.chassis_key == key) {
        let present = rules.iter().any(|r| r.to_ascii_lowercase().contains(inj.unless_contains));
        if !present {
            logd!("{key}: injecting rule {}", inj.rule);
            rules.push(s!(inj.rule));
        }
    }
}

fn weapon_template(w: WeaponSkeleton, overrides: &OverrideTables) -> WeaponTemplate {
    let meta = overrides.weapon_meta(&w.name, w.mount).cloned().unwrap_or_default();
    WeaponTemplate { weapon: w, repair_roll: meta.repair_roll, disabled: meta.disabled }
}

fn titan(c: ChassisSkeleton, overrides: &OverrideTables, warnings: &mut Vec<String>) -> (TitanTemplate, Vec<MaxField>) {
    let key = override_key(&c.id);
    let stats_over = overrides.chassis_stats(key).cloned().unwrap_or_default();

    let mut missing = Vec::new();
    let stats = BaseStats {
        shield_max: resolve_max(MaxField::Shield, c.shield_max, stats_over.shield_max, &mut missing),
        reactor_max: resolve_max(MaxField::Reactor, c.reactor_max, stats_over.reactor_max, &mut missing),
        heat_max: resolve_max(MaxField::Heat, c.heat_max, stats_over.heat_max, &mut missing),
        shield_saves: stats_over.shield_saves,
        characteristics: c.characteristics,
    };
    for field in &missing {
        warn_push!(warnings, "{} ({}): no {} maximum in catalog or overrides", c.name, c.id, field.as_str());
    }

    let (damage_track, damage_placeholder) = match overrides.damage_track(key) {
        Some(track) if !track.is_empty() => (track.clone(), false),
        _ => {
            warn_push!(warnings, "{} ({}): no damage track, using placeholder", c.name, c.id);
            (placeholder_track(), true)
        }
    };

    let mut special_rules = Vec::new();
    union_names(&mut special_rules, c.rules.iter().map(|r| r.name.clone()));
    union_names(&mut special_rules, stats_over.special_rules);
    apply_injections(key, &mut special_rules);

    let template = TitanTemplate {
        category: c.category,
        points: c.points,
        stats,
        damage_track,
        damage_placeholder,
        weapons: c.weapons.into_iter().map(|w| weapon_template(w, overrides)).collect(),
        special_rules,
        rule_texts: c.rules.into_iter().filter(|r| !r.text.is_empty()).collect(),
        loadout: Loadout { left: c.default_left, right: c.default_right },
        legendary: c.legendary,
        id: c.id,
        name: c.name,
    };
    (template, missing)
}

/// Display name, then id: the order every result list is handed out in.
fn by_name<T>(items: &mut [T], key: impl Fn(&T) -> (&str, &str)) {
    items.sort_by(|a, b| {
        let (an, ai) = key(a);
        let (bn, bi) = key(b);
        an.to_ascii_lowercase().cmp(&bn.to_ascii_lowercase()).then_with(|| ai.cmp(bi))
    });
}

pub fn titans(skeletons: Vec<ChassisSkeleton>, overrides: &OverrideTables) -> TitanResult {
    let mut warnings = overrides.warnings.clone();
    let mut missing_maxima = Vec::new();
    let mut templates = Vec::with_capacity(skeletons.len());

    for c in skeletons {
        let (t, missing) = titan(c, overrides, &mut warnings);
        if !missing.is_empty() {
            missing_maxima.push(MissingMaxima { id: t.id.clone(), name: t.name.clone(), fields: missing });
        }
        templates.push(t);
    }

    by_name(&mut templates, |t| (t.name.as_str(), t.id.as_str()));
    by_name(&mut missing_maxima, |m| (m.name.as_str(), m.id.as_str()));
    let legendary = templates.iter().filter(|t| t.legendary).map(|t| t.id.clone()).collect();

    TitanResult { templates, warnings, missing_maxima, legendary }
}

pub fn formations(mut items: Vec<FormationSkeleton>) -> ConceptResult<FormationTemplate> {
    by_name(&mut items, |f| (f.name.as_str(), f.id.as_str()));
    ConceptResult { templates: items, warnings: Vec::new() }
}

pub fn legions(mut items: Vec<LegionSkeleton>) -> ConceptResult<LegionTemplate> {
    by_name(&mut items, |l| (l.name.as_str(), l.id.as_str()));
    ConceptResult { templates: items, warnings: Vec::new() }
}

pub fn upgrades(mut items: Vec<UpgradeSkeleton>) -> ConceptResult<UpgradeTemplate> {
    by_name(&mut items, |u| (u.name.as_str(), u.id.as_str()));
    ConceptResult { templates: items, warnings: Vec::new() }
}

pub fn traits(mut items: Vec<TraitSkeleton>) -> ConceptResult<TraitTemplate> {
    by_name(&mut items, |t| (t.name.as_str(), t.id.as_str()));
    ConceptResult { templates: items, warnings: Vec::new() }
}
