// src/catalog/formations.rs
// Formations (maniples, battlegroups): named groups of chassis slots.

use std::ptr;

use serde::Serialize;

use super::chassis::identify;
use super::classify::{self, Candidate};
use super::ids::{slug_id, FORMATION_PREFIX};
use super::refs::{self, name_of, Bounds, Flow, Hop};
use super::{keep_first, union_names, union_rules, Catalog, Keyed, Merged, RuleText};
use crate::core::tree::find_all;
use crate::core::xml::Node;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FormationSlot {
    pub label: String,
    /// Chassis ids that may fill the slot.
    pub chassis: Vec<String>,
    pub min: u32,
    /// `None`: unbounded.
    pub max: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FormationSkeleton {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub points: Option<u32>,
    pub rules: Vec<RuleText>,
    pub slots: Vec<FormationSlot>,
    pub min_titans: u32,
    /// `None` when any slot is unbounded.
    pub max_titans: Option<u32>,
}

impl Keyed for FormationSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        keep_first(&mut self.raw_id, later.raw_id);
        keep_first(&mut self.points, later.points);
        union_rules(&mut self.rules, later.rules);
        // slots come as a set with their sums; never mix two layouts
        if self.slots.is_empty() && !later.slots.is_empty() {
            self.slots = later.slots;
            self.min_titans = later.min_titans;
            self.max_titans = later.max_titans;
        }
    }
}

/// Missing max is 1; -1 is unbounded.
fn resolve_max(b: Bounds) -> Option<u32> {
    if b.unlimited { None } else { Some(b.max.unwrap_or(1)) }
}

/// A max that overflows counts as unbounded.
fn sums(slots: &[FormationSlot]) -> (u32, Option<u32>) {
    let min = slots.iter().fold(0u32, |acc, s| acc.saturating_add(s.min));
    let max = slots.iter().try_fold(0u32, |acc, s| acc.checked_add(s.max?));
    (min, max)
}

pub fn extract_all(cat: &Catalog<'_>) -> Vec<FormationSkeleton> {
    let mut merged: Merged<FormationSkeleton> = Merged::default();
    for (doc, root) in cat.documents() {
        for node in find_all(root, refs::is_entry) {
            let name = name_of(node);
            let categories = refs::category_names(node);
            let candidate = Candidate { name: &name, categories: &categories, ..Default::default() };
            if !classify::is_formation(&candidate) || identify(cat, doc, node).is_some() {
                continue;
            }
            let slots = match direct_slots(cat, doc, node) {
                slots if !slots.is_empty() => slots,
                _ => nested_slots(cat, doc, node),
            };
            if slots.is_empty() {
                logd!("{}: {name} names no chassis, skipped", cat.file(doc));
                continue;
            }
            let (min_titans, max_titans) = sums(&slots);
            merged.push(FormationSkeleton {
                id: slug_id(FORMATION_PREFIX, &name),
                name,
                raw_id: node.attr("id").map(|s| s!(s)),
                points: refs::points(node),
                rules: refs::rules(cat, doc, node),
                slots,
                min_titans,
                max_titans,
            });
        }
    }
    logf!("formations: {} after merge", merged.len());
    merged.into_vec()
}

/// One slot per direct entry link that lands on a chassis.
fn direct_slots<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<FormationSlot> {
    let mut slots = Vec::new();
    for link in node.grandchildren("entryLinks", "entryLink") {
        let Some((tdoc, target)) = link.attr("targetId").and_then(|id| cat.resolve(doc, id)) else { continue };
        let Some((chassis_id, chassis_name)) = identify(cat, tdoc, target) else { continue };
        let hop = Hop { doc: tdoc, node: target, link: Some(link) };
        let b = hop.bounds();
        let label = match name_of(link) {
            n if n.is_empty() => chassis_name,
            n => n,
        };
        slots.push(FormationSlot { label, chassis: vec![chassis_id], min: b.min.unwrap_or(0), max: resolve_max(b) });
    }
    slots
}

struct Pending<'a> {
    group: Option<Hop<'a>>,
    options: Vec<Hop<'a>>,
    label: String,
    chassis: Vec<String>,
}

/// Chassis anywhere below, grouped by the innermost enclosing group.
fn nested_slots<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<FormationSlot> {
    let mut pending: Vec<Pending<'a>> = Vec::new();
    refs::walk_contents(cat, doc, node, |hop, chain| {
        let Some((chassis_id, chassis_name)) = identify(cat, hop.doc, hop.node) else {
            return Flow::Descend;
        };
        let group = chain.iter().rev().find(|h| refs::is_group(h.node)).copied();
        let existing = pending.iter_mut().find(|p| match (&p.group, &group) {
            (Some(a), Some(b)) => ptr::eq(a.node, b.node),
            _ => false,
        });
        match existing {
            Some(p) => {
                p.options.push(*hop);
                union_names(&mut p.chassis, [chassis_id]);
            }
            None => {
                let label = group.as_ref().map(|g| g.names().join(" ")).filter(|l| !l.is_empty()).unwrap_or(chassis_name);
                pending.push(Pending { group, options: vec![*hop], label, chassis: vec![chassis_id] });
            }
        }
        Flow::Skip
    });

    pending
        .into_iter()
        .map(|p| {
            let own = p.group.map(|g| g.bounds()).unwrap_or_default();
            let b = match (own.is_empty(), p.options.as_slice()) {
                (true, [single]) => single.bounds(),
                _ => own,
            };
            FormationSlot { label: p.label, chassis: p.chassis, min: b.min.unwrap_or(0), max: resolve_max(b) }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Document;
    use crate::core::xml::parse;

    const GST: &str = r#"
        <gameSystem>
          <sharedSelectionEntries>
            <selectionEntry id="e-reaver" name="Reaver Titan" type="model"/>
            <selectionEntry id="e-warhound" name="Warhound Titan" type="model"/>
            <selectionEntry id="e-warlord" name="Warlord Titan" type="model"/>
          </sharedSelectionEntries>
          <selectionEntries>
            <selectionEntry id="f1" name="Axiom Battleline Maniple" type="upgrade">
              <rules><rule name="Line of Battle"/></rules>
              <entryLinks>
                <entryLink id="a" name="Principal: Reaver" targetId="e-reaver" type="selectionEntry">
                  <constraints><constraint field="selections" scope="parent" type="min" value="1"/>
                  <constraint field="selections" scope="parent" type="max" value="1"/></constraints>
                </entryLink>
                <entryLink id="b" targetId="e-warhound" type="selectionEntry">
                  <constraints><constraint field="selections" scope="parent" type="min" value="2"/>
                  <constraint field="selections" scope="parent" type="max" value="-1"/></constraints>
                </entryLink>
              </entryLinks>
            </selectionEntry>
            <selectionEntry id="f2" name="Venator Light Maniple" type="upgrade">
              <selectionEntryGroups>
                <selectionEntryGroup id="g-light" name="Light Titans">
                  <constraints><constraint field="selections" scope="parent" type="min" value="2"/>
                  <constraint field="selections" scope="parent" type="max" value="4"/></constraints>
                  <entryLinks>
                    <entryLink id="c" targetId="e-warhound" type="selectionEntry"/>
                  </entryLinks>
                  <selectionEntryGroups>
                    <selectionEntryGroup id="g-heavy" name="Heavy Support">
                      <entryLinks><entryLink id="d" targetId="e-warlord" type="selectionEntry"/></entryLinks>
                    </selectionEntryGroup>
                  </selectionEntryGroups>
                </selectionEntryGroup>
              </selectionEntryGroups>
            </selectionEntry>
            <selectionEntry id="f3" name="Maniple Trait" type="upgrade"/>
          </selectionEntries>
        </gameSystem>"#;

    fn formations() -> Vec<FormationSkeleton> {
        let d = vec![Document { file: s!("a.gst"), root: parse(GST) }];
        let cat = Catalog::new(&d);
        extract_all(&cat)
    }

    #[test]
    fn direct_links_sum_their_bounds() {
        let all = formations();
        let axiom = all.iter().find(|f| f.id == "formation-axiom-battleline-maniple").unwrap();
        assert_eq!(axiom.slots.len(), 2);
        assert_eq!(axiom.slots[0].label, "Principal: Reaver");
        assert_eq!(axiom.slots[1].label, "Warhound Titan");
        assert_eq!(axiom.min_titans, 3);
        assert_eq!(axiom.max_titans, None);
        assert_eq!(axiom.rules[0].name, "Line of Battle");
    }

    #[test]
    fn nested_groups_use_own_or_single_link_bounds() {
        let all = formations();
        let venator = all.iter().find(|f| f.name == "Venator Light Maniple").unwrap();
        let slots: Vec<_> = venator.slots.iter().map(|s| (s.label.as_str(), s.chassis.clone(), s.min, s.max)).collect();
        assert_eq!(slots, vec![
            ("Light Titans", vec![s!("warhound")], 2, Some(4)),
            ("Heavy Support", vec![s!("warlord")], 0, Some(1)),
        ]);
        assert_eq!(venator.min_titans, 2);
        assert_eq!(venator.max_titans, Some(5));
    }

    #[test]
    fn formations_without_chassis_are_dropped() {
        assert!(formations().iter().all(|f| f.name != "Maniple Trait"));
    }

    #[test]
    fn huge_bounds_saturate_instead_of_overflowing() {
        let doc = r#"
            <gameSystem>
              <selectionEntry id="e-reaver" name="Reaver Titan" type="model"/>
              <selectionEntry id="f" name="Endless Maniple" type="upgrade">
                <entryLinks>
                  <entryLink id="a" targetId="e-reaver" type="selectionEntry">
                    <constraints><constraint field="selections" scope="parent" type="min" value="4000000000"/>
                    <constraint field="selections" scope="parent" type="max" value="4000000000"/></constraints>
                  </entryLink>
                  <entryLink id="b" targetId="e-reaver" type="selectionEntry">
                    <constraints><constraint field="selections" scope="parent" type="min" value="4000000000"/>
                    <constraint field="selections" scope="parent" type="max" value="4000000000"/></constraints>
                  </entryLink>
                </entryLinks>
              </selectionEntry>
            </gameSystem>"#;
        let d = vec![Document { file: s!("big.gst"), root: parse(doc) }];
        let all = extract_all(&Catalog::new(&d));
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].slots.len(), 2);
        assert_eq!(all[0].min_titans, u32::MAX);
        assert_eq!(all[0].max_titans, None);
    }
}
