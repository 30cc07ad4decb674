// src/catalog/upgrades.rs
// Traits and upgrades. Both live as leaf entries under named containers
// ("Princeps Traits", "Wargear", ...), so they share one collector.
// A leaf that qualifies as a trait is never also an upgrade.

use std::ptr;

use serde::Serialize;

use super::chassis::identify;
use super::classify::{is_legion, mentions_trait, mentions_upgrade};
use super::ids::{slug_id, TRAIT_PREFIX, UPGRADE_PREFIX};
use super::refs::{self, name_of, Flow, Hop};
use super::weapons::weapon_profile;
use super::{keep_first, union_names, union_rules, Catalog, Keyed, Merged, RuleText};
use crate::core::tree::find_all;
use crate::core::xml::Node;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TraitSkeleton {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub group: Option<String>,
    pub rules: Vec<RuleText>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpgradeSkeleton {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub points: Option<u32>,
    pub group: Option<String>,
    pub rules: Vec<RuleText>,
    /// Chassis ids this upgrade is hidden for.
    pub hidden_for: Vec<String>,
}

impl Keyed for TraitSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        keep_first(&mut self.raw_id, later.raw_id);
        keep_first(&mut self.group, later.group);
        union_rules(&mut self.rules, later.rules);
    }
}

impl Keyed for UpgradeSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        keep_first(&mut self.raw_id, later.raw_id);
        keep_first(&mut self.points, later.points);
        keep_first(&mut self.group, later.group);
        union_rules(&mut self.rules, later.rules);
        union_names(&mut self.hidden_for, later.hidden_for);
    }
}

/// A leaf entry found under a container.
struct Found<'a> {
    hop: Hop<'a>,
    group: Option<String>,
    /// Raw ids from hide-if-instance-of modifiers on the way down.
    hidden: Vec<&'a str>,
}

fn has_contents(node: &Node) -> bool {
    ["selectionEntries", "selectionEntryGroups", "entryLinks"]
        .iter()
        .any(|w| node.children_named(w).any(|c| !c.children.is_empty()))
}

fn hidden_on<'a>(hop: &Hop<'a>, into: &mut Vec<&'a str>) {
    into.extend(refs::hidden_if_instance_of(hop.node));
    if let Some(link) = hop.link {
        into.extend(refs::hidden_if_instance_of(link));
    }
}

/// Entries and groups whose name or categories mention `mentions`.
fn containers<'a>(cat: &Catalog<'a>, mentions: fn(Vec<&str>) -> bool) -> Vec<(usize, &'a Node)> {
    let mut out = Vec::new();
    for (doc, root) in cat.documents() {
        let found = find_all(root, |n| {
            if !refs::is_entry(n) && !refs::is_group(n) {
                return false;
            }
            let name = name_of(n);
            let cats = refs::category_names(n);
            mentions(std::iter::once(name.as_str()).chain(cats.iter().map(String::as_str)).collect())
        });
        out.extend(found.into_iter().map(|n| (doc, n)));
    }
    out
}

/// Walk every container and keep the leaf entries `accept` takes. A leaf
/// container is itself the candidate.
fn leaves<'a, A>(cat: &Catalog<'a>, mentions: fn(Vec<&str>) -> bool, accept: A) -> Vec<Found<'a>>
where
    A: Fn(&Hop<'a>) -> bool,
{
    let mut out = Vec::new();
    for (doc, container) in containers(cat, mentions) {
        let top = Hop { doc, node: container, link: None };
        let mut hidden_top = Vec::new();
        hidden_on(&top, &mut hidden_top);

        if refs::is_entry(container) && !has_contents(container) {
            if accept(&top) {
                out.push(Found { hop: top, group: None, hidden: hidden_top });
            }
            continue;
        }

        let container_label = name_of(container);
        refs::walk_contents(cat, doc, container, |hop, chain| {
            if !refs::is_entry(hop.node) || has_contents(hop.node) {
                return Flow::Descend;
            }
            if accept(hop) {
                let group = chain
                    .iter()
                    .rev()
                    .find(|h| refs::is_group(h.node))
                    .map(|h| name_of(h.node))
                    .or_else(|| Some(container_label.clone()))
                    .filter(|g| !g.is_empty());
                let mut hidden = hidden_top.clone();
                for h in chain.iter().chain(std::iter::once(hop)) {
                    hidden_on(h, &mut hidden);
                }
                out.push(Found { hop: *hop, group, hidden });
            }
            Flow::Skip
        });
    }
    out
}

fn mentions_trait_vec(names: Vec<&str>) -> bool { mentions_trait(names) }
fn mentions_upgrade_vec(names: Vec<&str>) -> bool { mentions_upgrade(names) }

fn trait_leaves<'a>(cat: &Catalog<'a>) -> Vec<Found<'a>> {
    leaves(cat, mentions_trait_vec, |hop| identify(cat, hop.doc, hop.node).is_none())
}

pub fn extract_traits(cat: &Catalog<'_>) -> Vec<TraitSkeleton> {
    let mut merged: Merged<TraitSkeleton> = Merged::default();
    for f in trait_leaves(cat) {
        let name = name_of(f.hop.node);
        merged.push(TraitSkeleton {
            id: slug_id(TRAIT_PREFIX, &name),
            name,
            raw_id: f.hop.node.attr("id").map(|s| s!(s)),
            group: f.group,
            rules: refs::rules(cat, f.hop.doc, f.hop.node),
        });
    }
    logf!("traits: {} after merge", merged.len());
    merged.into_vec()
}

pub fn extract_upgrades<'a>(cat: &Catalog<'a>) -> Vec<UpgradeSkeleton> {
    let traits: Vec<&'a Node> = trait_leaves(cat).into_iter().map(|f| f.hop.node).collect();
    let accept = |hop: &Hop<'a>| {
        let is_upgrade_type = hop.node.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("upgrade"));
        is_upgrade_type
            && !traits.iter().any(|t| ptr::eq(*t, hop.node))
            && !is_legion(&name_of(hop.node), refs::primary_category(hop.node).as_deref())
            && weapon_profile(cat, hop.doc, hop.node).is_none()
            && identify(cat, hop.doc, hop.node).is_none()
    };

    let mut merged: Merged<UpgradeSkeleton> = Merged::default();
    for f in leaves(cat, mentions_upgrade_vec, accept) {
        let name = name_of(f.hop.node);
        let hidden_for = chassis_ids(cat, f.hop.doc, &f.hidden);
        merged.push(UpgradeSkeleton {
            id: slug_id(UPGRADE_PREFIX, &name),
            name,
            raw_id: f.hop.node.attr("id").map(|s| s!(s)),
            points: f.hop.points(),
            group: f.group,
            rules: refs::rules(cat, f.hop.doc, f.hop.node),
            hidden_for,
        });
    }
    logf!("upgrades: {} after merge", merged.len());
    merged.into_vec()
}

/// Raw ids → chassis ids; ids that are not a chassis are dropped.
fn chassis_ids(cat: &Catalog<'_>, doc: usize, raw: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for id in raw {
        match cat.resolve(doc, id).and_then(|(d, n)| identify(cat, d, n)) {
            Some((chassis, _)) => union_names(&mut out, [chassis]),
            None => logd!("hide condition on {id} is not a chassis"),
        }
    }
    out
}
