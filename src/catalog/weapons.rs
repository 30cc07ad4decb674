// src/catalog/weapons.rs
// Weapon skeletons: one per weapon entry reached from a chassis.

use serde::{Serialize, Serializer};

use super::classify::is_weapon_profile;
use super::ids::weapon_id;
use super::refs::{self, chain_names, characteristics, name_of, Hop};
use super::tables::*;
use super::{keep_first, union_names, Catalog, Keyed};
use crate::core::sanitize::first_int;
use crate::core::xml::Node;

/// A range/accuracy/dice/strength cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatValue {
    Number(i64),
    /// `-`, `n/a`: the stat does not apply.
    NotApplicable,
    /// `T`, `template`.
    Template,
    /// Anything else, verbatim (`D3`, `2D6`, `Special`).
    Text(String),
}

impl StatValue {
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim();
        let lc = v.to_ascii_lowercase();
        if v.is_empty() || NOT_APPLICABLE_VALUES.contains(&lc.as_str()) {
            return StatValue::NotApplicable;
        }
        if TEMPLATE_VALUES.contains(&lc.as_str()) {
            return StatValue::Template;
        }
        // 12", +1, 3+ are numbers; 2D6 is not
        let numeric_shape = v.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '"' | '\'' | ' '));
        match first_int(v) {
            Some(n) if numeric_shape => StatValue::Number(n),
            _ => StatValue::Text(s!(v)),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            StatValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Number(n) => ser.serialize_i64(*n),
            StatValue::NotApplicable => ser.serialize_str("n/a"),
            StatValue::Template => ser.serialize_str("template"),
            StatValue::Text(t) => ser.serialize_str(t),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mount {
    #[default]
    Arm,
    Carapace,
}

impl Mount {
    pub fn as_str(self) -> &'static str {
        match self {
            Mount::Arm => "arm",
            Mount::Carapace => "carapace",
        }
    }

    /// Carapace if any name on the way down mentions it.
    pub fn from_names<'s, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'s str>,
    {
        if names.into_iter().any(|n| n.to_ascii_lowercase().contains(CARAPACE_TOKEN)) {
            Mount::Carapace
        } else {
            Mount::Arm
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WeaponSkeleton {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub points: Option<u32>,
    pub short_range: Option<StatValue>,
    pub long_range: Option<StatValue>,
    pub short_accuracy: Option<StatValue>,
    pub long_accuracy: Option<StatValue>,
    pub dice: Option<StatValue>,
    pub strength: Option<StatValue>,
    pub traits: Vec<String>,
    pub mount: Mount,
}

impl Keyed for WeaponSkeleton {
    fn key(&self) -> &str { &self.id }

    fn absorb(&mut self, later: Self) {
        keep_first(&mut self.raw_id, later.raw_id);
        keep_first(&mut self.points, later.points);
        keep_first(&mut self.short_range, later.short_range);
        keep_first(&mut self.long_range, later.long_range);
        keep_first(&mut self.short_accuracy, later.short_accuracy);
        keep_first(&mut self.long_accuracy, later.long_accuracy);
        keep_first(&mut self.dice, later.dice);
        keep_first(&mut self.strength, later.strength);
        union_names(&mut self.traits, later.traits);
    }
}

/// First weapon profile on the entry (direct profiles, then linked ones).
pub fn weapon_profile<'a>(cat: &Catalog<'a>, doc: usize, node: &'a Node) -> Option<&'a Node> {
    let all: Vec<&'a Node> = refs::profiles(cat, doc, node)
        .into_iter()
        .filter(|p| is_weapon_profile(p.attr_or_empty("typeName"), p.attr_or_empty("name")))
        .collect();
    if all.len() > 1 {
        logd!("{}: {} has {} weapon profiles, using the first", cat.file(doc), name_of(node), all.len());
    }
    all.first().copied()
}

fn lookup<'p>(stats: &'p [(String, String)], keys: &[&str]) -> Option<&'p str> {
    stats
        .iter()
        .find(|(k, _)| keys.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(_, v)| v.as_str())
}

/// Separate short/long keys first, then a combined `short/long` cell.
/// Sentinels are checked on the whole cell before splitting (`n/a` has a slash).
fn short_long(stats: &[(String, String)], short: &[&str], long: &[&str], combined: &[&str]) -> (Option<StatValue>, Option<StatValue>) {
    let mut s = lookup(stats, short).map(StatValue::parse);
    let mut l = lookup(stats, long).map(StatValue::parse);
    if s.is_none() || l.is_none() {
        if let Some(cell) = lookup(stats, combined) {
            let (cs, cl) = split_combined(cell);
            keep_first(&mut s, Some(cs));
            keep_first(&mut l, Some(cl));
        }
    }
    (s, l)
}

fn split_combined(cell: &str) -> (StatValue, StatValue) {
    match StatValue::parse(cell) {
        whole @ (StatValue::NotApplicable | StatValue::Template) => (whole.clone(), whole),
        _ => match cell.split_once('/') {
            Some((a, b)) => (StatValue::parse(a), StatValue::parse(b)),
            None => {
                let v = StatValue::parse(cell);
                (v.clone(), v)
            }
        },
    }
}

fn split_traits(cell: &str) -> impl Iterator<Item = String> + '_ {
    cell.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty() && !NOT_APPLICABLE_VALUES.contains(&t.to_ascii_lowercase().as_str()))
        .map(|t| s!(t))
}

/// Build a weapon from an entry reached at `hop`. `chain` is the path above it;
/// it only decides the mount. `None` when the entry has no weapon profile.
pub fn extract<'a>(cat: &Catalog<'a>, hop: &Hop<'a>, chain: &[Hop<'a>]) -> Option<WeaponSkeleton> {
    let profile = weapon_profile(cat, hop.doc, hop.node)?;
    let stats = characteristics(profile);

    let mut name = name_of(hop.node);
    if name.is_empty() {
        name = name_of(profile);
    }
    let raw_id = hop.node.attr("id").map(|s| s!(s));
    let (short_range, long_range) = short_long(&stats, SHORT_RANGE_KEYS, LONG_RANGE_KEYS, COMBINED_RANGE_KEYS);
    let (short_accuracy, long_accuracy) = short_long(&stats, SHORT_ACC_KEYS, LONG_ACC_KEYS, COMBINED_ACC_KEYS);

    let mut traits: Vec<String> = lookup(&stats, TRAIT_KEYS).map(|c| split_traits(c).collect()).unwrap_or_default();
    union_names(&mut traits, refs::rules(cat, hop.doc, hop.node).into_iter().map(|r| r.name));

    let mut names = chain_names(chain);
    names.extend(hop.names());
    let mount = Mount::from_names(names.iter().map(String::as_str));

    Some(WeaponSkeleton {
        id: weapon_id(&name, raw_id.as_deref()),
        name,
        raw_id,
        points: hop.points(),
        short_range,
        long_range,
        short_accuracy,
        long_accuracy,
        dice: lookup(&stats, DICE_KEYS).map(StatValue::parse),
        strength: lookup(&stats, STRENGTH_KEYS).map(StatValue::parse),
        traits,
        mount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::refs::{walk_contents, Flow};
    use crate::catalog::Document;
    use crate::core::xml::parse;

    #[test]
    fn stat_values() {
        assert_eq!(StatValue::parse("12\""), StatValue::Number(12));
        assert_eq!(StatValue::parse("+1"), StatValue::Number(1));
        assert_eq!(StatValue::parse("-1"), StatValue::Number(-1));
        assert_eq!(StatValue::parse("-"), StatValue::NotApplicable);
        assert_eq!(StatValue::parse("N/A"), StatValue::NotApplicable);
        assert_eq!(StatValue::parse("T"), StatValue::Template);
        assert_eq!(StatValue::parse("2D6"), StatValue::Text(s!("2D6")));
    }

    #[test]
    fn combined_cells_split_after_sentinel_check() {
        assert_eq!(split_combined("n/a"), (StatValue::NotApplicable, StatValue::NotApplicable));
        assert_eq!(split_combined("8\"/16\""), (StatValue::Number(8), StatValue::Number(16)));
        assert_eq!(split_combined("T"), (StatValue::Template, StatValue::Template));
    }

    const DOC: &str = r#"
        <catalogue>
          <sharedProfiles>
            <profile id="p-vmb" name="Vulcan Mega-Bolter" typeName="Weapon">
              <characteristics>
                <characteristic name="Range">8"/16"</characteristic>
                <characteristic name="Acc">+1/-</characteristic>
                <characteristic name="Dice">6</characteristic>
                <characteristic name="Str">4</characteristic>
                <characteristic name="Traits">Rapid, Shieldbane</characteristic>
              </characteristics>
            </profile>
          </sharedProfiles>
          <selectionEntry id="chassis" name="Reaver">
            <selectionEntryGroups>
              <selectionEntryGroup id="g" name="Carapace">
                <selectionEntries>
                  <selectionEntry id="w1" name="Vulcan Mega-Bolter" type="upgrade">
                    <costs><cost name="Points" value="15"/></costs>
                    <infoLinks>
                      <infoLink targetId="p-vmb" type="profile"/>
                      <infoLink name="Rapid" targetId="nowhere" type="rule"/>
                      <infoLink name="Carapace Weapon" targetId="nowhere2" type="rule"/>
                    </infoLinks>
                  </selectionEntry>
                </selectionEntries>
              </selectionEntryGroup>
            </selectionEntryGroups>
          </selectionEntry>
        </catalogue>"#;

    #[test]
    fn extract_reads_linked_profile_and_mount() {
        let d = vec![Document { file: s!("t.cat"), root: parse(DOC) }];
        let cat = Catalog::new(&d);
        let (_, root) = cat.resolve(0, "chassis").unwrap();
        let mut found = Vec::new();
        walk_contents(&cat, 0, root, |hop, chain| {
            if let Some(w) = extract(&cat, hop, chain) {
                found.push(w);
            }
            Flow::Descend
        });
        assert_eq!(found.len(), 1);
        let w = &found[0];
        assert_eq!(w.id, "vulcan-mega-bolter");
        assert_eq!(w.points, Some(15));
        assert_eq!(w.mount, Mount::Carapace);
        assert_eq!(w.short_range, Some(StatValue::Number(8)));
        assert_eq!(w.long_range, Some(StatValue::Number(16)));
        assert_eq!(w.short_accuracy, Some(StatValue::Number(1)));
        assert_eq!(w.long_accuracy, Some(StatValue::NotApplicable));
        assert_eq!(w.dice, Some(StatValue::Number(6)));
        assert_eq!(w.traits, vec!["Rapid", "Shieldbane", "Carapace Weapon"]);
    }

    #[test]
    fn stat_value_json_shape() {
        let j = serde_json::to_string(&vec![StatValue::Number(3), StatValue::Template, StatValue::NotApplicable]).unwrap();
        assert_eq!(j, r#"[3,"template","n/a"]"#);
    }
}
