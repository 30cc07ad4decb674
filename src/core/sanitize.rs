// src/core/sanitize.rs

/// Collapse runs of whitespace to a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Remove any `[ ... ]` bracket tags (e.g. `[Legio Mortis]`, `[FW]`).
/// Greedy within each bracket pair, no nesting.
pub fn strip_brackets(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_bracket = false;
    for ch in s.chars() {
        match ch {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            _ if !in_bracket => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Remove `+=Tag=` style variant markers. An unterminated marker runs to the end.
pub fn strip_variant_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("+=") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        rest = match after.find('=') {
            Some(end) => &after[end + 1..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Catalog display name: variant/faction markup stripped, whitespace tidied.
pub fn display_name(raw: &str) -> String {
    let s = normalize_ws(&strip_variant_tags(&strip_brackets(raw)));
    s.trim_matches(|c: char| c == '-' || c == ':' || c.is_whitespace()).to_string()
}

/// Lowercase ascii-alnum slug, everything else collapsed to single '-'.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') { out.pop(); }
    out
}

/// First (optionally signed) integer in the string: "5", "4 (3+)", "+1", "12\"".
pub fn first_int(s: &str) -> Option<i64> {
    let b = s.as_bytes();
    let mut i = 0usize;
    while i < b.len() {
        let neg = b[i] == b'-' && b.get(i + 1).is_some_and(u8::is_ascii_digit);
        let pos = b[i] == b'+' && b.get(i + 1).is_some_and(u8::is_ascii_digit);
        if b[i].is_ascii_digit() || neg || pos {
            let start = if neg || pos { i + 1 } else { i };
            let mut end = start;
            while end < b.len() && b[end].is_ascii_digit() { end += 1; }
            let v: i64 = s[start..end].parse().ok()?;
            return Some(if neg { -v } else { v });
        }
        i += 1;
    }
    None
}

/// Costs/constraint values are written as floats ("275.0", "-1.0").
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
