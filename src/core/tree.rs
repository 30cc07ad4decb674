// src/core/tree.rs
// Query helpers over the generic Node tree. Everything here is read-only.

use super::xml::Node;

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute value, or "" when absent.
    pub fn attr_or_empty(&self, key: &str) -> &str {
        self.attr(key).unwrap_or("")
    }

    /// Own text, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Node::text)
    }

    /// `<wrapper><item/>...</wrapper>` → the items. Catalog files wrap every
    /// list this way (`profiles/profile`, `rules/rule`, ...).
    pub fn grandchildren<'a>(&'a self, wrapper: &'a str, item: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children_named(wrapper).flat_map(move |w| w.children_named(item))
    }
}

/// All nodes matching `pred`, depth-first pre-order (document order).
pub fn find_all<'a, F>(root: &'a Node, mut pred: F) -> Vec<&'a Node>
where
    F: FnMut(&Node) -> bool,
{
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pred(node) {
            out.push(node);
        }
        // reversed so the leftmost child is popped first
        stack.extend(node.children.iter().rev());
    }
    out
}
