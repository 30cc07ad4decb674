// src/catalog/legions.rs

use serde::Serialize;

use super::chassis::identify;
use super::classify::is_legion;
use super::ids::{slug_id, LEGION_PREFIX};
use super::refs::{self, name_of, Flow};
use super::{keep_first, union_rules, Catalog, Keyed, Merged, RuleText};
use crate::core::tree::find_all;
use crate::core::xml::Node;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LegionSkeleton {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub points: Option<u32>,
    pub rules: Vec<RuleText>,
}

impl Keyed for LegionSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        keep_first(&mut self.raw_id, later.raw_id);
        keep_first(&mut self.points, later.points);
        union_rules(&mut self.rules, later.rules);
    }
}

fn is_legion_node(node: &Node) -> bool {
    (refs::is_entry(node) || refs::is_group(node))
        && is_legion(&name_of(node), refs::primary_category(node).as_deref())
}

pub fn extract_all(cat: &Catalog<'_>) -> Vec<LegionSkeleton> {
    let mut merged: Merged<LegionSkeleton> = Merged::default();
    for (doc, root) in cat.documents() {
        for node in find_all(root, is_legion_node) {
            if identify(cat, doc, node).is_some() {
                continue;
            }
            let name = name_of(node);
            merged.push(LegionSkeleton {
                id: slug_id(LEGION_PREFIX, &name),
                name,
                raw_id: node.attr("id").map(|s| s!(s)),
                points: refs::points(node),
                rules: rules_below(cat, doc, node),
            });
        }
    }
    logf!("legions: {} after merge", merged.len());
    merged.into_vec()
}

/// The legion's own rules, then rules carried by anything selectable inside it.
fn rules_below<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<RuleText> {
    let mut out = refs::rules(cat, doc, node);
    refs::walk_contents(cat, doc, node, |hop, _| {
        union_rules(&mut out, refs::rules(cat, hop.doc, hop.node));
        // a nested legion is its own record
        if is_legion_node(hop.node) { Flow::Skip } else { Flow::Descend }
    });
    out
}
