// src/core/xml.rs
//! Tolerant markup parser for catalog files.
//!
//! Produces a generic [`Node`] tree (name, attributes, children, own text).
//! This is deliberately *not* a conforming XML parser: it covers the subset
//! the catalog format actually uses (tags, attributes, text, CDATA, comments)
//! and never fails. Malformed input yields the best tree we can recover,
//! in the worst case an empty document node.
//!
//! Recovery rules:
//! - an end tag pops the open-element stack down to (and including) the
//!   nearest open element with the same name; unmatched end tags are ignored
//! - unterminated comments / CDATA / PIs / tags end the scan; whatever was
//!   open is closed at EOF
//! - a stray `<` that can't start a tag is kept as text

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Name of the synthetic root returned by [`parse`].
pub const DOCUMENT: &str = "#document";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
    /// Own character content only (never descendants').
    pub text: String,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

pub fn parse(text: &str) -> Node {
    let src = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let b = src.as_bytes();
    let n = b.len();

    let mut stack: Vec<Node> = vec![Node::new(DOCUMENT)];
    let mut i = 0usize;

    while i < n {
        if b[i] != b'<' {
            let end = find_byte(b, i, b'<').unwrap_or(n);
            push_text(&mut stack, &decode_entities(&src[i..end]));
            i = end;
            continue;
        }

        let rest = &src[i..];
        if rest.starts_with("<!--") {
            match rest[4..].find("-->") {
                Some(e) => i += 4 + e + 3,
                None => break,
            }
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            let body = &rest[9..];
            match body.find("]]>") {
                Some(e) => {
                    push_text(&mut stack, &body[..e]);
                    i += 9 + e + 3;
                }
                None => {
                    push_text(&mut stack, body);
                    break;
                }
            }
            continue;
        }
        if rest.starts_with("<?") {
            match rest[2..].find("?>") {
                Some(e) => i += 2 + e + 2,
                None => break,
            }
            continue;
        }
        if rest.starts_with("<!") {
            match skip_declaration(b, i + 2) {
                Some(after) => i = after,
                None => break,
            }
            continue;
        }

        // `a < b` in text: not a tag.
        if !b.get(i + 1).is_some_and(|&c| is_name_start(c) || c == b'/') {
            push_text(&mut stack, "<");
            i += 1;
            continue;
        }

        let Some(gt) = find_tag_end(b, i + 1) else { break };
        let inner = &src[i + 1..gt];
        i = gt + 1;

        if let Some(close) = inner.strip_prefix('/') {
            close_element(&mut stack, close.trim());
            continue;
        }

        let (body, self_closing) = match inner.trim_end().strip_suffix('/') {
            Some(body) => (body, true),
            None => (inner, false),
        };
        let (name, attrs) = split_tag(body);
        if name.is_empty() {
            continue;
        }
        let node = Node {
            name: s!(name),
            attributes: parse_attributes(attrs),
            ..Default::default()
        };
        if self_closing {
            attach(&mut stack, node);
        } else {
            stack.push(node);
        }
    }

    // Close anything left open at EOF.
    while stack.len() > 1 {
        if let Some(node) = stack.pop() {
            attach(&mut stack, node);
        }
    }
    stack.pop().unwrap_or_else(|| Node::new(DOCUMENT))
}

#[inline]
fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b':' || c >= 0x80
}

#[inline]
fn find_byte(b: &[u8], from: usize, ch: u8) -> Option<usize> {
    b.get(from..)?.iter().position(|&c| c == ch).map(|off| from + off)
}

/// Index of the `>` closing a tag opened just before `from`, skipping quoted
/// attribute values. An unbalanced quote falls back to the first raw `>`.
fn find_tag_end(b: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < b.len() {
        match (quote, b[i]) {
            (None, b'"') | (None, b'\'') => quote = Some(b[i]),
            (Some(q), c) if c == q => quote = None,
            (None, b'>') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    if quote.is_some() {
        return find_byte(b, from, b'>');
    }
    None
}

/// Skip `<!DOCTYPE ...>` (with an optional `[...]` internal subset).
/// `from` points just past `<!`; returns the index after the closing `>`.
fn skip_declaration(b: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < b.len() {
        let c = b[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Some(i + 1),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn push_text(stack: &mut [Node], text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.text.push_str(text);
    }
}

fn attach(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_element(stack: &mut Vec<Node>, name: &str) {
    // Index 0 is the document node; it never matches a real tag name.
    let Some(k) = stack.iter().rposition(|n| n.name == name) else { return };
    if k == 0 {
        return;
    }
    while stack.len() > k {
        if let Some(node) = stack.pop() {
            attach(stack, node);
        }
    }
}

fn split_tag(body: &str) -> (&str, &str) {
    let body = body.trim_start();
    match body.find(|c: char| c.is_whitespace()) {
        Some(ws) => (&body[..ws], &body[ws..]),
        None => (body, ""),
    }
}

/// `k="v"`, `k='v'` and bare `k=v` are accepted; a key with no `=` is dropped.
/// Duplicate keys: last one wins.
pub fn parse_attributes(s: &str) -> BTreeMap<String, String> {
    let b = s.as_bytes();
    let n = b.len();
    let mut out = BTreeMap::new();
    let mut i = 0usize;

    let skip_ws = |mut i: usize| {
        while i < n && b[i].is_ascii_whitespace() { i += 1; }
        i
    };

    loop {
        i = skip_ws(i);
        if i >= n { break; }

        let key_start = i;
        while i < n && !b[i].is_ascii_whitespace() && b[i] != b'=' { i += 1; }
        let key = &s[key_start..i];

        i = skip_ws(i);
        if i >= n || b[i] != b'=' {
            continue; // bare key, ignored
        }
        i = skip_ws(i + 1);

        let value = match b.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let start = i + 1;
                let end = find_byte(b, start, q).unwrap_or(n);
                i = (end + 1).min(n);
                &s[start..end]
            }
            _ => {
                let start = i;
                while i < n && !b[i].is_ascii_whitespace() { i += 1; }
                &s[start..i]
            }
        };

        if !key.is_empty() {
            out.insert(s!(key), decode_entities(value).into_owned());
        }
    }
    out
}

/// Decode the five named entities plus numeric character references.
/// Anything else starting with `&` is left as written.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        // Entities are short; don't scan the whole document for a ';'.
        let semi = tail.char_indices().take(12).find(|&(_, c)| c == ';').map(|(i, _)| i);
        let decoded = semi.and_then(|semi| decode_one(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_one(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }

    #[test]
    fn reserved_chars_roundtrip_through_attributes() {
        let original = r#"Fire & "Fury" <Mk'II>"#;
        let doc = format!(r#"<rule name="{}" alt='{}'/>"#, escape(original), escape(original));
        let root = parse(&doc);
        let rule = &root.children[0];
        assert_eq!(rule.attributes["name"], original);
        assert_eq!(rule.attributes["alt"], original);
    }

    #[test]
    fn parsing_twice_is_structurally_equal() {
        let doc = r#"<?xml version="1.0"?>
            <catalogue id="c1" name="Test">
              <!-- comment -->
              <selectionEntries>
                <selectionEntry id="e1" name="Reaver Titan" type="model">
                  <description>Big &amp; loud</description>
                </selectionEntry>
              </selectionEntries>
            </catalogue>"#;
        assert_eq!(parse(doc), parse(doc));
    }

    #[test]
    fn strips_bom_and_skips_prolog_doctype_and_comments() {
        let doc = "\u{FEFF}<?xml version=\"1.0\"?><!DOCTYPE cat [<!ENTITY x \"y\">]><!-- hi --><cat/>";
        let root = parse(doc);
        assert_eq!(root.name, DOCUMENT);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "cat");
        assert!(root.text.is_empty());
    }

    #[test]
    fn text_is_own_content_only() {
        let root = parse("<a>hello<b>inner</b> world</a>");
        let a = &root.children[0];
        assert_eq!(a.text, "hello world");
        assert_eq!(a.children[0].text, "inner");
    }

    #[test]
    fn whitespace_only_text_is_dropped() {
        let root = parse("<a>\n   <b/>\n  </a>");
        assert_eq!(root.children[0].text, "");
    }

    #[test]
    fn cdata_is_literal() {
        let root = parse("<d><![CDATA[a &amp; <b>]]></d>");
        assert_eq!(root.children[0].text, "a &amp; <b>");
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn self_closing_is_a_leaf() {
        let root = parse(r#"<a><b x="1"/><c/></a>"#);
        let a = &root.children[0];
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].name, "b");
        assert_eq!(a.children[1].name, "c");
    }

    #[test]
    fn attribute_forms_and_last_wins() {
        let attrs = parse_attributes(r#" a="1" b='2' c=3 flag d=4 a="5" "#);
        assert_eq!(attrs.get("a").map(String::as_str), Some("5"));
        assert_eq!(attrs.get("b").map(String::as_str), Some("2"));
        assert_eq!(attrs.get("c").map(String::as_str), Some("3"));
        assert_eq!(attrs.get("d").map(String::as_str), Some("4"));
        assert!(!attrs.contains_key("flag"));
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let root = parse(r#"<a note="x > y">t</a>"#);
        assert_eq!(root.children[0].attributes["note"], "x > y");
        assert_eq!(root.children[0].text, "t");
    }

    #[test]
    fn mismatched_end_tag_pops_to_matching_ancestor() {
        // </a> closes the still-open <b> as well.
        let root = parse("<a><b><c/></a><d/>");
        assert_eq!(root.children.len(), 2);
        let a = &root.children[0];
        assert_eq!(a.children[0].name, "b");
        assert_eq!(a.children[0].children[0].name, "c");
        assert_eq!(root.children[1].name, "d");
    }

    #[test]
    fn unmatched_end_tag_is_ignored() {
        let root = parse("<a></zzz><b/></a>");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children[0].name, "b");
    }

    #[test]
    fn unterminated_comment_keeps_prefix() {
        let root = parse("<a><b/></a><!-- never closed <c/>");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children[0].name, "b");
    }

    #[test]
    fn missing_closing_bracket_keeps_prefix() {
        let root = parse(r#"<a><b x="1"/><c y="2""#);
        let a = &root.children[0];
        assert_eq!(a.name, "a");
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].name, "b");
    }

    #[test]
    fn stray_lt_is_text() {
        let root = parse("<a>1 < 2</a>");
        assert_eq!(root.children[0].text, "1 < 2");
    }

    #[test]
    fn numeric_and_unknown_entities() {
        assert_eq!(decode_entities("A&#66;&#x43; &nbsp; &"), "ABC &nbsp; &");
    }

    #[test]
    fn empty_and_garbage_inputs_do_not_panic() {
        for doc in ["", "<", "<<<>>>", "</a>", "<!", "<![CDATA[", "<?x", "&&&;", "<a b='"] {
            let root = parse(doc);
            assert_eq!(root.name, DOCUMENT);
        }
    }
}
