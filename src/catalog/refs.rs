// src/catalog/refs.rs
// Reading the recurring catalog shapes (costs, constraints, rules, profiles,
// modifiers) and walking entry/group/link contents.

use std::collections::BTreeSet;

use super::tables::POINTS_COST_MARKERS;
use super::{Catalog, RuleText};
use crate::core::sanitize::{display_name, normalize_ws, parse_number};
use crate::core::tree::find_all;
use crate::core::xml::Node;

/// Wrappers whose items are the selectable contents of an entry or group.
const CONTENT_WRAPPERS: &[&str] = &["selectionEntries", "selectionEntryGroups", "entryLinks"];

/// Sanitized `name` attribute.
pub fn name_of(node: &Node) -> String {
    display_name(node.attr_or_empty("name"))
}

pub fn is_entry(node: &Node) -> bool { node.name == "selectionEntry" }
pub fn is_group(node: &Node) -> bool { node.name == "selectionEntryGroup" }
pub fn is_link(node: &Node) -> bool { node.name == "entryLink" }

/// Points cost on this node (first cost named like points). Rounded, never negative.
pub fn points(node: &Node) -> Option<u32> {
    node.grandchildren("costs", "cost")
        .find(|c| {
            let name = c.attr_or_empty("name").to_ascii_lowercase();
            POINTS_COST_MARKERS.iter().any(|m| name.contains(m))
        })
        .and_then(|c| parse_number(c.attr_or_empty("value")))
        .map(|v| v.max(0.0).round() as u32)
}

/// Selection-count bounds from a node's own constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// A max constraint of -1: no upper limit.
    pub unlimited: bool,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && !self.unlimited
    }
}

/// Only "selections" constraints count; parent-scoped ones are preferred
/// over roster/force-wide ones.
pub fn bounds(node: &Node) -> Bounds {
    let selection_constraints: Vec<&Node> = node
        .grandchildren("constraints", "constraint")
        .filter(|c| matches!(c.attr("field"), None | Some("selections")))
        .collect();
    let parent_scoped: Vec<&Node> = selection_constraints
        .iter()
        .copied()
        .filter(|c| matches!(c.attr("scope"), None | Some("parent")))
        .collect();
    let chosen = if parent_scoped.is_empty() { selection_constraints } else { parent_scoped };

    let mut out = Bounds::default();
    for c in chosen {
        let Some(v) = parse_number(c.attr_or_empty("value")) else { continue };
        match c.attr("type") {
            Some("min") if out.min.is_none() => out.min = Some(v.max(0.0).round() as u32),
            Some("max") if out.max.is_none() && !out.unlimited => {
                if v < 0.0 {
                    out.unlimited = true;
                } else {
                    out.max = Some(v.round() as u32);
                }
            }
            _ => {}
        }
    }
    out
}

/// Direct profiles plus profiles reached through `infoLink type="profile"`.
pub fn profiles<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<&'a Node> {
    let mut out: Vec<&'a Node> = node.grandchildren("profiles", "profile").collect();
    for link in node.grandchildren("infoLinks", "infoLink") {
        if link.attr("type") != Some("profile") {
            continue;
        }
        if let Some((_, target)) = link.attr("targetId").and_then(|id| cat.resolve(doc, id)) {
            if target.name == "profile" {
                out.push(target);
            }
        }
    }
    out
}

/// `(name, value)` pairs of a profile, document order, values trimmed.
pub fn characteristics(profile: &Node) -> Vec<(String, String)> {
    profile
        .grandchildren("characteristics", "characteristic")
        .map(|c| (normalize_ws(c.attr_or_empty("name")), normalize_ws(c.text())))
        .collect()
}

fn rule_of(rule: &Node) -> RuleText {
    RuleText {
        name: name_of(rule),
        text: rule.child_text("description").map(normalize_ws).unwrap_or_default(),
    }
}

/// Direct rules plus `infoLink type="rule"` targets. A dangling rule link
/// still contributes its own name.
pub fn rules<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Vec<RuleText> {
    let mut out: Vec<RuleText> = node.grandchildren("rules", "rule").map(rule_of).collect();
    for link in node.grandchildren("infoLinks", "infoLink") {
        if link.attr("type") != Some("rule") {
            continue;
        }
        match link.attr("targetId").and_then(|id| cat.resolve(doc, id)) {
            Some((_, target)) if target.name == "rule" => out.push(rule_of(target)),
            _ => {
                let name = name_of(link);
                if !name.is_empty() {
                    out.push(RuleText { name, text: s!() });
                }
            }
        }
    }
    out
}

pub fn category_names(node: &Node) -> Vec<String> {
    node.grandchildren("categoryLinks", "categoryLink").map(name_of).collect()
}

/// Name of the primary category link, if any.
pub fn primary_category(node: &Node) -> Option<String> {
    node.grandchildren("categoryLinks", "categoryLink")
        .find(|c| c.attr("primary") == Some("true"))
        .map(name_of)
        .filter(|n| !n.is_empty())
}

/// Raw ids named by `instanceOf` conditions under modifiers that hide `node`.
/// Conditions on enclosing `modifierGroup`s apply to every modifier inside.
pub fn hidden_if_instance_of(node: &Node) -> Vec<&str> {
    let mut out = Vec::new();
    collect_hidden(node, &[], &mut out);
    out
}

fn collect_hidden<'a>(holder: &'a Node, inherited: &[&'a str], out: &mut Vec<&'a str>) {
    for modifier in holder.grandchildren("modifiers", "modifier") {
        if hides(modifier) {
            out.extend(inherited);
            out.extend(instance_of_ids(find_all(modifier, |n| n.name == "condition")));
        }
    }
    for group in holder.grandchildren("modifierGroups", "modifierGroup") {
        let mut scoped = inherited.to_vec();
        for wrapper in group.children.iter().filter(|c| c.name == "conditions" || c.name == "conditionGroups") {
            scoped.extend(instance_of_ids(find_all(wrapper, |n| n.name == "condition")));
        }
        collect_hidden(group, &scoped, out);
    }
}

fn hides(modifier: &Node) -> bool {
    modifier.attr("field") == Some("hidden") && modifier.attr("value") == Some("true")
}

fn instance_of_ids(conditions: Vec<&Node>) -> impl Iterator<Item = &str> {
    conditions.into_iter().filter_map(|cond| {
        let is_instance = cond.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("instanceOf"));
        if is_instance { cond.attr("childId") } else { None }
    })
}

/* ---------------- Walking contents ---------------- */

/// One step down the walk: the entry/group reached, and the link used to get there.
#[derive(Clone, Copy, Debug)]
pub struct Hop<'a> {
    pub doc: usize,
    pub node: &'a Node,
    pub link: Option<&'a Node>,
}

impl<'a> Hop<'a> {
    /// Names along this hop (the link's own name first when it has a distinct one).
    pub fn names(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        if let Some(link) = self.link {
            let n = name_of(link);
            if !n.is_empty() {
                out.push(n);
            }
        }
        let n = name_of(self.node);
        if !n.is_empty() && !out.iter().any(|o| o == &n) {
            out.push(n);
        }
        out
    }

    /// Bounds of the link when it has any, otherwise of the node itself.
    pub fn bounds(&self) -> Bounds {
        match self.link.map(bounds) {
            Some(b) if !b.is_empty() => b,
            _ => bounds(self.node),
        }
    }

    /// Cost of the link when it has one, otherwise of the node.
    pub fn points(&self) -> Option<u32> {
        self.link.and_then(points).or_else(|| points(self.node))
    }

    /// The ids a group's `defaultSelectionEntryId` may refer to.
    pub fn matches_id(&self, id: &str) -> bool {
        self.link.and_then(|l| l.attr("id")) == Some(id) || self.node.attr("id") == Some(id)
    }
}

pub enum Flow {
    Descend,
    Skip,
}

/// Depth-first walk over everything selectable inside `node`: nested entries,
/// groups, and link targets. `f` gets each hop plus the chain of hops above it
/// and decides whether to descend.
///
/// Dangling links are skipped. A target already on the current path is never
/// re-entered; the visited set is per path, so the same target can still show
/// up under two sibling slots.
pub fn walk_contents<'a, F>(cat: &Catalog<'a>, doc: usize, node: &'a Node, mut f: F)
where
    F: FnMut(&Hop<'a>, &[Hop<'a>]) -> Flow,
{
    let mut chain: Vec<Hop<'a>> = Vec::new();
    let mut on_path: BTreeSet<&'a str> = BTreeSet::new();
    if let Some(id) = node.attr("id") {
        on_path.insert(id);
    }
    walk(cat, doc, node, &mut chain, &mut on_path, &mut f);
}

fn walk<'a, F>(
    cat: &Catalog<'a>,
    doc: usize,
    node: &'a Node,
    chain: &mut Vec<Hop<'a>>,
    on_path: &mut BTreeSet<&'a str>,
    f: &mut F,
) where
    F: FnMut(&Hop<'a>, &[Hop<'a>]) -> Flow,
{
    let items = node
        .children
        .iter()
        .filter(|w| CONTENT_WRAPPERS.contains(&w.name.as_str()))
        .flat_map(|w| w.children.iter());

    for item in items {
        let hop = if is_link(item) {
            let Some(target_id) = item.attr("targetId") else { continue };
            match cat.resolve(doc, target_id) {
                Some((tdoc, target)) if is_entry(target) || is_group(target) => {
                    Hop { doc: tdoc, node: target, link: Some(item) }
                }
                _ => {
                    logd!("{}: dangling link {} -> {}", cat.file(doc), item.attr_or_empty("name"), target_id);
                    continue;
                }
            }
        } else if is_entry(item) || is_group(item) {
            Hop { doc, node: item, link: None }
        } else {
            continue;
        };

        let node_id = hop.node.attr("id");
        if node_id.is_some_and(|id| on_path.contains(id)) {
            logd!("{}: cycle through {} cut", cat.file(doc), node_id.unwrap_or(""));
            continue;
        }

        if let Flow::Skip = f(&hop, chain) {
            continue;
        }

        let inserted = node_id.is_some_and(|id| on_path.insert(id));
        chain.push(hop);
        walk(cat, hop.doc, hop.node, chain, on_path, f);
        chain.pop();
        if inserted {
            if let Some(id) = node_id {
                on_path.remove(id);
            }
        }
    }
}

/// Every name along a chain, in order.
pub fn chain_names(chain: &[Hop<'_>]) -> Vec<String> {
    chain.iter().flat_map(Hop::names).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Document;
    use crate::core::xml::parse;

    fn one(doc: &str) -> Vec<Document> {
        vec![Document { file: s!("t.cat"), root: parse(doc) }]
    }

    #[test]
    fn points_and_bounds() {
        let root = parse(r#"
            <selectionEntry name="X">
              <costs><cost name="Command" value="1.0"/><cost name=" pts" value="275.0"/></costs>
              <constraints>
                <constraint field="selections" scope="roster" type="max" value="3.0"/>
                <constraint field="selections" scope="parent" type="min" value="1.0"/>
                <constraint field="selections" scope="parent" type="max" value="-1.0"/>
              </constraints>
            </selectionEntry>"#);
        let e = &root.children[0];
        assert_eq!(points(e), Some(275));
        assert_eq!(bounds(e), Bounds { min: Some(1), max: None, unlimited: true });
    }

    #[test]
    fn rules_follow_info_links_and_keep_dangling_names() {
        let d = one(r#"
            <catalogue>
              <sharedRules><rule id="r1" name="Agile"><description>Turn twice.</description></rule></sharedRules>
              <selectionEntry id="e" name="Warhound">
                <rules><rule name="Pack Hunter"/></rules>
                <infoLinks>
                  <infoLink name="Agile" targetId="r1" type="rule"/>
                  <infoLink name="Lost Rule" targetId="nope" type="rule"/>
                </infoLinks>
              </selectionEntry>
            </catalogue>"#);
        let cat = Catalog::new(&d);
        let (_, e) = cat.resolve(0, "e").unwrap();
        let names: Vec<_> = rules(&cat, 0, e).into_iter().map(|r| (r.name, r.text)).collect();
        assert_eq!(names, vec![
            (s!("Pack Hunter"), s!()),
            (s!("Agile"), s!("Turn twice.")),
            (s!("Lost Rule"), s!()),
        ]);
    }

    #[test]
    fn walk_survives_cycles_and_dangling_links() {
        let d = one(r#"
            <catalogue>
              <sharedSelectionEntryGroups>
                <selectionEntryGroup id="g1" name="Loop A">
                  <entryLinks>
                    <entryLink id="l1" targetId="g2" type="selectionEntryGroup"/>
                    <entryLink id="l2" targetId="ghost" type="selectionEntry"/>
                  </entryLinks>
                </selectionEntryGroup>
                <selectionEntryGroup id="g2" name="Loop B">
                  <entryLinks><entryLink id="l3" targetId="g1" type="selectionEntryGroup"/></entryLinks>
                  <selectionEntries><selectionEntry id="w" name="Gun"/></selectionEntries>
                </selectionEntryGroup>
              </sharedSelectionEntryGroups>
              <selectionEntry id="root" name="Root">
                <entryLinks><entryLink id="l0" targetId="g1" type="selectionEntryGroup"/></entryLinks>
              </selectionEntry>
            </catalogue>"#);
        let cat = Catalog::new(&d);
        let (_, root) = cat.resolve(0, "root").unwrap();
        let mut seen = Vec::new();
        walk_contents(&cat, 0, root, |hop, chain| {
            seen.push((name_of(hop.node), chain.len()));
            Flow::Descend
        });
        assert_eq!(seen, vec![(s!("Loop A"), 0), (s!("Loop B"), 1), (s!("Gun"), 2)]);
    }

    #[test]
    fn same_target_in_sibling_slots_is_visited_twice() {
        let d = one(r#"
            <catalogue>
              <selectionEntry id="gun" name="Gun"/>
              <selectionEntry id="root" name="Root">
                <selectionEntryGroups>
                  <selectionEntryGroup id="left" name="Left Arm">
                    <entryLinks><entryLink id="a" targetId="gun" type="selectionEntry"/></entryLinks>
                  </selectionEntryGroup>
                  <selectionEntryGroup id="right" name="Right Arm">
                    <entryLinks><entryLink id="b" targetId="gun" type="selectionEntry"/></entryLinks>
                  </selectionEntryGroup>
                </selectionEntryGroups>
              </selectionEntry>
            </catalogue>"#);
        let cat = Catalog::new(&d);
        let (_, root) = cat.resolve(0, "root").unwrap();
        let mut guns = Vec::new();
        walk_contents(&cat, 0, root, |hop, chain| {
            if name_of(hop.node) == "Gun" {
                guns.push(chain_names(chain));
            }
            Flow::Descend
        });
        assert_eq!(guns, vec![vec![s!("Left Arm")], vec![s!("Right Arm")]]);
    }

    #[test]
    fn hidden_conditions_collect_instance_of_targets() {
        let root = parse(r#"
            <selectionEntry name="Upgrade">
              <modifiers>
                <modifier type="set" field="hidden" value="true">
                  <conditionGroups><conditionGroup type="or"><conditions>
                    <condition type="instanceOf" childId="warhound-id" field="selections" scope="ancestor"/>
                    <condition type="atLeast" childId="other"/>
                  </conditions></conditionGroup></conditionGroups>
                </modifier>
                <modifier type="set" field="name" value="x">
                  <conditions><condition type="instanceOf" childId="ignored"/></conditions>
                </modifier>
              </modifiers>
            </selectionEntry>"#);
        assert_eq!(hidden_if_instance_of(&root.children[0]), vec!["warhound-id"]);
    }

    #[test]
    fn modifier_group_conditions_reach_the_modifiers_inside() {
        let root = parse(r#"
            <selectionEntry name="Upgrade">
              <modifierGroups>
                <modifierGroup>
                  <conditions><condition type="instanceOf" childId="wh" scope="ancestor"/></conditions>
                  <modifiers><modifier type="set" field="hidden" value="true"/></modifiers>
                  <modifierGroups>
                    <modifierGroup>
                      <conditions><condition type="instanceOf" childId="wl"/></conditions>
                      <modifiers>
                        <modifier type="set" field="hidden" value="true">
                          <conditions><condition type="instanceOf" childId="rv"/></conditions>
                        </modifier>
                      </modifiers>
                    </modifierGroup>
                  </modifierGroups>
                </modifierGroup>
                <modifierGroup>
                  <conditions><condition type="instanceOf" childId="ignored"/></conditions>
                  <modifiers><modifier type="increment" field="points" value="5"/></modifiers>
                </modifierGroup>
              </modifierGroups>
            </selectionEntry>"#);
        assert_eq!(hidden_if_instance_of(&root.children[0]), vec!["wh", "wh", "wl", "rv"]);
    }
}
