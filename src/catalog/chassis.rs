// src/catalog/chassis.rs
// Chassis skeletons: classification, stats, maxima, weapon slots.

use std::collections::BTreeMap;
use std::ptr;

use serde::Serialize;

use super::classify::{self, Candidate, Verdict};
use super::ids::chassis_id;
use super::refs::{self, characteristics, name_of, Flow, Hop};
use super::tables::*;
use super::weapons::{self, WeaponSkeleton};
use super::{keep_first, union_names, union_rules, Catalog, Keyed, Merged, RuleText};
use crate::core::sanitize::first_int;
use crate::core::tree::find_all;
use crate::core::xml::Node;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChassisSkeleton {
    pub id: String,
    pub name: String,
    /// Every source id merged into this record, first one first.
    pub raw_ids: Vec<String>,
    pub category: Option<String>,
    pub points: Option<u32>,
    /// Non-weapon profile characteristics; first spelling of a key wins.
    pub characteristics: BTreeMap<String, String>,
    pub shield_max: Option<u32>,
    pub reactor_max: Option<u32>,
    pub heat_max: Option<u32>,
    pub weapons: Vec<WeaponSkeleton>,
    pub default_left: Option<String>,
    pub default_right: Option<String>,
    pub rules: Vec<RuleText>,
    pub legendary: bool,
}

impl Keyed for ChassisSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        union_names(&mut self.raw_ids, later.raw_ids);
        keep_first(&mut self.category, later.category);
        keep_first(&mut self.points, later.points);
        for (k, v) in later.characteristics {
            self.characteristics.entry(k).or_insert(v);
        }
        keep_first(&mut self.shield_max, later.shield_max);
        keep_first(&mut self.reactor_max, later.reactor_max);
        keep_first(&mut self.heat_max, later.heat_max);
        union_weapons(&mut self.weapons, later.weapons);
        keep_first(&mut self.default_left, later.default_left);
        keep_first(&mut self.default_right, later.default_right);
        union_rules(&mut self.rules, later.rules);
        self.legendary |= later.legendary;
    }
}

/// Weapons are the same weapon only on the same mount.
fn union_weapons(into: &mut Vec<WeaponSkeleton>, more: Vec<WeaponSkeleton>) {
    for w in more {
        match into.iter_mut().find(|e| e.id == w.id && e.mount == w.mount) {
            Some(existing) => existing.absorb(w),
            None => into.push(w),
        }
    }
}

/// Everything the classifier looks at, gathered once per entry.
struct Facts {
    name: String,
    stats: Vec<(String, String)>,
    keys: Vec<String>,
    categories: Vec<String>,
}

impl Facts {
    fn of<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Self {
        let stats: Vec<(String, String)> = refs::profiles(cat, doc, node)
            .into_iter()
            .filter(|p| !classify::is_weapon_profile(p.attr_or_empty("typeName"), p.attr_or_empty("name")))
            .flat_map(characteristics)
            .collect();
        let keys = stats.iter().map(|(k, _)| k.clone()).collect();
        Self { name: name_of(node), stats, keys, categories: refs::category_names(node) }
    }

    fn candidate<'f>(&'f self, node: &'f Node) -> Candidate<'f> {
        Candidate {
            name: &self.name,
            entry_type: node.attr("type"),
            stat_keys: &self.keys,
            categories: &self.categories,
        }
    }
}

/// Chassis id and name, if `node` classifies as a chassis.
pub fn identify<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Option<(String, String)> {
    if !refs::is_entry(node) {
        return None;
    }
    let facts = Facts::of(cat, doc, node);
    if !classify::chassis(&facts.candidate(node)).accepted() {
        return None;
    }
    Some((chassis_id(&facts.name, node.attr("id")), facts.name))
}

/// Scan every document for chassis and merge them by stable id.
pub fn extract_all(cat: &Catalog<'_>) -> Vec<ChassisSkeleton> {
    let mut merged: Merged<ChassisSkeleton> = Merged::default();
    for (doc, root) in cat.documents() {
        for node in find_all(root, refs::is_entry) {
            let facts = Facts::of(cat, doc, node);
            let verdict = classify::chassis(&facts.candidate(node));
            let Verdict::Accept(reason) = verdict else { continue };
            logd!("{}: chassis {} ({reason})", cat.file(doc), facts.name);
            merged.push(build(cat, doc, node, facts));
        }
    }
    logf!("chassis: {} after merge", merged.len());
    merged.into_vec()
}

fn build<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node, facts: Facts) -> ChassisSkeleton {
    let raw_id = node.attr("id");
    let legendary = classify::is_legendary(&facts.candidate(node));

    let mut chars = BTreeMap::new();
    for (k, v) in &facts.stats {
        chars.entry(k.clone()).or_insert_with(|| v.clone());
    }

    let hits = weapon_hits(cat, doc, node);
    let default_left = default_for(&hits, LEFT_TOKEN);
    let default_right = default_for(&hits, RIGHT_TOKEN);
    let mut weapons = Vec::new();
    union_weapons(&mut weapons, hits.into_iter().map(|h| h.weapon).collect());

    let category = refs::primary_category(node).or_else(|| facts.categories.first().cloned());

    ChassisSkeleton {
        id: chassis_id(&facts.name, raw_id),
        raw_ids: raw_id.map(|r| vec![s!(r)]).unwrap_or_default(),
        category,
        points: refs::points(node),
        shield_max: maximum(&facts.stats, SHIELD_KEYS),
        reactor_max: maximum(&facts.stats, REACTOR_KEYS),
        heat_max: maximum(&facts.stats, HEAT_KEYS),
        characteristics: chars,
        weapons,
        default_left,
        default_right,
        rules: refs::rules(cat, doc, node),
        legendary,
        name: facts.name,
    }
}

/// First integer of the first characteristic whose key matches.
fn maximum(stats: &[(String, String)], keys: &[&str]) -> Option<u32> {
    stats
        .iter()
        .filter(|(k, _)| {
            let lc = k.to_ascii_lowercase();
            keys.iter().any(|needle| lc.contains(needle)) && !MAXIMUM_KEY_EXCLUSIONS.iter().any(|x| lc.contains(x))
        })
        .find_map(|(_, v)| first_int(v))
        .and_then(|n| u32::try_from(n).ok())
}

/* ---------------- Weapon slots ---------------- */

struct Hit<'a> {
    weapon: WeaponSkeleton,
    hop: Hop<'a>,
    chain: Vec<Hop<'a>>,
}

fn weapon_hits<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<Hit<'a>> {
    let mut hits = Vec::new();
    refs::walk_contents(cat, doc, node, |hop, chain| {
        if !refs::is_entry(hop.node) {
            return Flow::Descend;
        }
        match weapons::extract(cat, hop, chain) {
            Some(weapon) => {
                hits.push(Hit { weapon, hop: *hop, chain: chain.to_vec() });
                Flow::Skip
            }
            None => Flow::Descend,
        }
    });
    hits
}

/// Outermost hop on the chain naming the side.
fn slot_of(chain: &[Hop<'_>], token: &str) -> Option<usize> {
    chain
        .iter()
        .position(|h| h.names().iter().any(|n| n.to_ascii_lowercase().contains(token)))
}

/// Default weapon of the first slot seen for a side: the first option that
/// agrees with every `defaultSelectionEntryId` on the groups from the slot
/// down to it, else the first option with min >= 1, else the first option.
fn default_for(hits: &[Hit<'_>], token: &str) -> Option<String> {
    let slot = hits.iter().find_map(|h| slot_of(&h.chain, token).map(|i| h.chain[i]))?;
    let options: Vec<(&Hit<'_>, usize)> = hits
        .iter()
        .filter_map(|h| {
            let i = slot_of(&h.chain, token)?;
            ptr::eq(h.chain[i].node, slot.node).then_some((h, i))
        })
        .collect();

    if let Some((h, _)) = options.iter().find(|(h, i)| follows_defaults(h, *i)) {
        return Some(h.weapon.id.clone());
    }
    if let Some(default_id) = slot.node.attr("defaultSelectionEntryId") {
        logd!("default {default_id} of {} not among its options", name_of(slot.node));
    }

    options
        .iter()
        .find(|(h, _)| h.hop.bounds().min.is_some_and(|m| m >= 1))
        .or(options.first())
        .map(|(h, _)| h.weapon.id.clone())
}

/// At least one group between `chain[from]` and the hit names a default, and
/// every such default lies on the path to the hit.
fn follows_defaults(h: &Hit<'_>, from: usize) -> bool {
    let mut named = false;
    for j in (from..h.chain.len()).rev() {
        let Some(id) = h.chain[j].node.attr("defaultSelectionEntryId") else { continue };
        if !(h.hop.matches_id(id) || h.chain[j + 1..].iter().any(|c| c.matches_id(id))) {
            return false;
        }
        named = true;
    }
    named
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::weapons::Mount;
    use crate::catalog::Document;
    use crate::core::xml::parse;

    const GST: &str = r#"
        <gameSystem>
          <sharedSelectionEntries>
            <selectionEntry id="w-gat" name="Gatling Blaster" type="upgrade">
              <profiles><profile name="Gatling Blaster" typeName="Weapon"><characteristics>
                <characteristic name="Short Range">8"</characteristic>
              </characteristics></profile></profiles>
            </selectionEntry>
            <selectionEntry id="w-melta" name="Melta Cannon" type="upgrade">
              <profiles><profile name="Melta Cannon" typeName="Weapon"/></profiles>
            </selectionEntry>
            <selectionEntry id="w-apoc" name="Apocalypse Missile Launcher" type="upgrade">
              <profiles><profile name="Apoc" typeName="Weapon"/></profiles>
            </selectionEntry>
          </sharedSelectionEntries>
        </gameSystem>"#;

    const CAT: &str = r#"
        <catalogue>
          <selectionEntries>
            <selectionEntry id="reaver-raw" name="Reaver Titan [Legio Mortis]" type="model">
              <costs><cost name="Points" value="275.0"/></costs>
              <categoryLinks><categoryLink name="Battle Titan" primary="true"/></categoryLinks>
              <profiles>
                <profile name="Reaver" typeName="Titan">
                  <characteristics>
                    <characteristic name="Void Shields">5 (3+)</characteristic>
                    <characteristic name="Void Shield Saves">3+</characteristic>
                    <characteristic name="Command">3+</characteristic>
                  </characteristics>
                </profile>
              </profiles>
              <selectionEntryGroups>
                <selectionEntryGroup id="left" name="Left Arm" defaultSelectionEntryId="l-melta">
                  <entryLinks>
                    <entryLink id="l-gat" targetId="w-gat" type="selectionEntry"/>
                    <entryLink id="l-melta" targetId="w-melta" type="selectionEntry"/>
                  </entryLinks>
                </selectionEntryGroup>
                <selectionEntryGroup id="right" name="Right Arm">
                  <entryLinks>
                    <entryLink id="r-gat" targetId="w-gat" type="selectionEntry"/>
                    <entryLink id="r-melta" targetId="w-melta" type="selectionEntry">
                      <constraints><constraint field="selections" scope="parent" type="min" value="1"/></constraints>
                    </entryLink>
                  </entryLinks>
                </selectionEntryGroup>
                <selectionEntryGroup id="top" name="Carapace">
                  <entryLinks><entryLink id="c-apoc" targetId="w-apoc" type="selectionEntry"/></entryLinks>
                </selectionEntryGroup>
              </selectionEntryGroups>
            </selectionEntry>
            <selectionEntry id="aux" name="Auxilia Infantry" type="unit">
              <profiles><profile typeName="Unit"><characteristics>
                <characteristic name="Command">4+</characteristic><characteristic name="Shield">1</characteristic>
              </characteristics></profile></profiles>
            </selectionEntry>
          </selectionEntries>
        </catalogue>"#;

    fn docs() -> Vec<Document> {
        vec![
            Document { file: s!("a.gst"), root: parse(GST) },
            Document { file: s!("b.cat"), root: parse(CAT) },
        ]
    }

    #[test]
    fn reaver_skeleton() {
        let d = docs();
        let cat = Catalog::new(&d);
        let all = extract_all(&cat);
        assert_eq!(all.len(), 1, "{all:?}");
        let r = &all[0];
        assert_eq!(r.id, "reaver");
        assert_eq!(r.name, "Reaver Titan");
        assert_eq!(r.points, Some(275));
        assert_eq!(r.category.as_deref(), Some("Battle Titan"));
        assert_eq!(r.shield_max, Some(5));
        assert_eq!(r.reactor_max, None);
        assert_eq!(r.default_left.as_deref(), Some("melta-cannon"));
        assert_eq!(r.default_right.as_deref(), Some("melta-cannon"));
        let weapons: Vec<_> = r.weapons.iter().map(|w| (w.id.as_str(), w.mount)).collect();
        assert_eq!(weapons, vec![
            ("gatling-blaster", Mount::Arm),
            ("melta-cannon", Mount::Arm),
            ("apocalypse-missile-launcher", Mount::Carapace),
        ]);
    }

    #[test]
    fn first_option_is_the_last_resort() {
        let hits = {
            let d = docs();
            let cat = Catalog::new(&d);
            let (_, gat) = cat.resolve(0, "w-gat").unwrap();
            let (_, left) = cat.resolve(1, "left").unwrap();
            let w = WeaponSkeleton { id: s!("gatling-blaster"), ..Default::default() };
            let slot = Hop { doc: 1, node: left, link: None };
            // defaultSelectionEntryId points at a link that is not a hit here
            let hit = Hit { weapon: w, hop: Hop { doc: 0, node: gat, link: None }, chain: vec![slot] };
            default_for(&[hit], LEFT_TOKEN)
        };
        assert_eq!(hits.as_deref(), Some("gatling-blaster"));
    }

    #[test]
    fn nested_group_default_picks_the_arm_weapon() {
        let nested = r#"
            <catalogue>
              <selectionEntry id="rv" name="Reaver Titan" type="model">
                <selectionEntryGroups>
                  <selectionEntryGroup id="left" name="Left Arm">
                    <selectionEntryGroups>
                      <selectionEntryGroup id="arm" name="Arm Weapon" defaultSelectionEntryId="lg">
                        <entryLinks>
                          <entryLink id="lm" targetId="w-melta" type="selectionEntry"/>
                          <entryLink id="lg" targetId="w-gat" type="selectionEntry"/>
                        </entryLinks>
                      </selectionEntryGroup>
                    </selectionEntryGroups>
                  </selectionEntryGroup>
                </selectionEntryGroups>
              </selectionEntry>
            </catalogue>"#;
        let d = vec![
            Document { file: s!("a.gst"), root: parse(GST) },
            Document { file: s!("n.cat"), root: parse(nested) },
        ];
        let all = extract_all(&Catalog::new(&d));
        assert_eq!(all.len(), 1, "{all:?}");
        assert_eq!(all[0].default_left.as_deref(), Some("gatling-blaster"));
        assert_eq!(all[0].default_right, None);
    }

    #[test]
    fn identify_rejects_infantry() {
        let d = docs();
        let cat = Catalog::new(&d);
        let (doc, aux) = cat.resolve(1, "aux").unwrap();
        assert!(identify(&cat, doc, aux).is_none());
        let (doc, reaver) = cat.resolve(1, "reaver-raw").unwrap();
        assert_eq!(identify(&cat, doc, reaver), Some((s!("reaver"), s!("Reaver Titan"))));
    }

    #[test]
    fn merge_keeps_first_scalars_and_unions_lists() {
        let mut a = ChassisSkeleton { id: s!("x"), points: Some(100), raw_ids: vec![s!("1")], ..Default::default() };
        a.characteristics.insert(s!("Speed"), s!("8"));
        let mut b = ChassisSkeleton { id: s!("x"), points: Some(200), shield_max: Some(4), raw_ids: vec![s!("2")], legendary: true, ..Default::default() };
        b.characteristics.insert(s!("Speed"), s!("9"));
        a.absorb(b);
        assert_eq!(a.points, Some(100));
        assert_eq!(a.shield_max, Some(4));
        assert_eq!(a.raw_ids, vec!["1", "2"]);
        assert_eq!(a.characteristics["Speed"], "8");
        assert!(a.legendary);
    }
}
