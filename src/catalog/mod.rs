// src/catalog/mod.rs
//! # Catalog extraction engine
//!
//! Turns parsed catalog documents into per-concept *skeletons* (chassis,
//! weapons, formations, legions, upgrades, traits). The upstream format has
//! no schema we can rely on, so everything here is heuristic:
//!
//! - `tables`   – the data the heuristics run on (allow/deny lists, key spellings, id tables)
//! - `classify` – named predicates composed into decision chains
//! - `ids`      – stable identifier policy
//! - `refs`     – costs, constraints, rules, profiles, and the link walker
//! - one module per concept
//!
//! ## Ordering
//! Documents are scanned in the caller's file order and nodes in document
//! order. Duplicates (same stable id) are merged first-seen-wins per field with
//! list fields unioned, so that order decides which entry is authoritative.
//!
//! ## Failure
//! Nothing in here returns an error. Missing nodes skip the entry, dangling
//! links are ignored, and cycles are cut by the walker.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::tree::find_all;
use crate::core::xml::Node;

pub mod chassis;
pub mod classify;
pub mod formations;
pub mod ids;
pub mod legions;
pub mod refs;
pub mod tables;
pub mod upgrades;
pub mod weapons;

pub use chassis::ChassisSkeleton;
pub use formations::{FormationSkeleton, FormationSlot};
pub use legions::LegionSkeleton;
pub use upgrades::{TraitSkeleton, UpgradeSkeleton};
pub use weapons::{Mount, StatValue, WeaponSkeleton};

/// One parsed source file.
#[derive(Clone, Debug)]
pub struct Document {
    pub file: String,
    pub root: Node,
}

/// Link nodes carry their own `id`s; they are never link *targets*.
const LINK_NODES: &[&str] = &["entryLink", "infoLink", "categoryLink", "catalogueLink"];

struct DocIndex<'a> {
    file: &'a str,
    root: &'a Node,
    ids: HashMap<&'a str, &'a Node>,
}

/// All documents of one load, with a raw-id index per document.
pub struct Catalog<'a> {
    docs: Vec<DocIndex<'a>>,
}

impl<'a> Catalog<'a> {
    pub fn new(docs: &'a [Document]) -> Self {
        let docs = docs
            .iter()
            .map(|d| {
                let mut ids = HashMap::new();
                for node in find_all(&d.root, |n| n.attributes.contains_key("id") && !LINK_NODES.contains(&n.name.as_str())) {
                    if let Some(id) = node.attr("id") {
                        ids.entry(id).or_insert(node);
                    }
                }
                logd!("{}: indexed {} ids", d.file, ids.len());
                DocIndex { file: &d.file, root: &d.root, ids }
            })
            .collect();
        Self { docs }
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    /// `(doc index, root)` in scan order.
    pub fn documents(&self) -> impl Iterator<Item = (usize, &'a Node)> + '_ {
        self.docs.iter().enumerate().map(|(i, d)| (i, d.root))
    }

    pub fn file(&self, doc: usize) -> &'a str {
        self.docs.get(doc).map(|d| d.file).unwrap_or("")
    }

    /// Look `id` up in document `doc` first, then in the others in scan order.
    pub fn resolve(&self, doc: usize, id: &str) -> Option<(usize, &'a Node)> {
        if let Some(node) = self.docs.get(doc).and_then(|d| d.ids.get(id)) {
            return Some((doc, *node));
        }
        self.docs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != doc)
            .find_map(|(i, d)| d.ids.get(id).map(|n| (i, *n)))
    }
}

/// Rule as shown to users: name plus (possibly empty) body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleText {
    pub name: String,
    pub text: String,
}

/// Records that merge across documents by stable id.
pub trait Keyed {
    fn key(&self) -> &str;
    /// Fold a later duplicate into `self` (first-seen wins per field).
    fn absorb(&mut self, later: Self);
}

/// Insertion-ordered merge of keyed records.
pub struct Merged<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Merged<T> {
    fn default() -> Self {
        Self { items: Vec::new(), index: HashMap::new() }
    }
}

impl<T: Keyed> Merged<T> {
    pub fn push(&mut self, item: T) {
        match self.index.get(item.key()) {
            Some(&i) => self.items[i].absorb(item),
            None => {
                self.index.insert(s!(item.key()), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn into_vec(self) -> Vec<T> { self.items }
}

/// Append names not already present (ASCII case-insensitive).
pub fn union_names<I>(into: &mut Vec<String>, more: I)
where
    I: IntoIterator<Item = String>,
{
    for name in more {
        if name.trim().is_empty() {
            continue;
        }
        if !into.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            into.push(name);
        }
    }
}

/// Same as `union_names` for rule texts; keeps the first body seen, fills an empty one.
pub fn union_rules<I>(into: &mut Vec<RuleText>, more: I)
where
    I: IntoIterator<Item = RuleText>,
{
    for rule in more {
        if rule.name.trim().is_empty() {
            continue;
        }
        match into.iter_mut().find(|r| r.name.eq_ignore_ascii_case(&rule.name)) {
            Some(existing) => {
                if existing.text.is_empty() {
                    existing.text = rule.text;
                }
            }
            None => into.push(rule),
        }
    }
}

/// First-seen-wins for optional scalars.
#[inline]
pub fn keep_first<T>(slot: &mut Option<T>, later: Option<T>) {
    if slot.is_none() {
        *slot = later;
    }
}
