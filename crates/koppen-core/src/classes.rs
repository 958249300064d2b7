//! Köppen–Geiger class codes, short labels and display colours.
//!
//! Codes follow the CHELSA V2.1 `kg2` product: 1 (Af) through 31 (EF).
//! Code 0 is reserved for no-data cells and for samples that do not fit a
//! class code when a wider integer raster is decoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Integer Köppen–Geiger class code as stored in the rasters.
pub type ClassCode = u8;

/// Polar tundra. The only origin class the analysis tracks by default.
pub const ET: ClassCode = 30;
/// Polar ice cap.
pub const EF: ClassCode = 31;
/// No-data / undecodable sample.
pub const NODATA: ClassCode = 0;

/// Label used for codes missing from a [`ClassTable`].
pub const UNKNOWN_LABEL: &str = "Other";
/// Colour used for codes missing from a [`ClassTable`].
pub const UNKNOWN_COLOR: [u8; 3] = [128, 128, 128];

// ── Default CHELSA kg2 legend ─────────────────────────────────────────────────

const DEFAULT_CLASSES: [(ClassCode, &str, &str); 31] = [
    (1, "Af", "#960000"),
    (2, "Am", "#ff0000"),
    (3, "As", "#ffcccc"),
    (4, "Aw", "#ffcc00"),
    (5, "BWk", "#ffff64"),
    (6, "BWh", "#cc8d14"),
    (7, "BSk", "#ccaa54"),
    (8, "BSh", "#00ff00"),
    (9, "Cfa", "#96ff00"),
    (10, "Cfb", "#c8ff00"),
    (11, "Cfc", "#b46400"),
    (12, "Csa", "#966400"),
    (13, "Csb", "#5a3c00"),
    (14, "Csc", "#003200"),
    (15, "Cwa", "#005000"),
    (16, "Cwb", "#007800"),
    (17, "Cwc", "#ff6eff"),
    (18, "Dfa", "#ffb4ff"),
    (19, "Dfb", "#e6c8ff"),
    (20, "Dfc", "#c8c8c8"),
    (21, "Dfd", "#c8b4ff"),
    (22, "Dsa", "#9a7fb3"),
    (23, "Dsb", "#8759b3"),
    (24, "Dsc", "#6f24b3"),
    (25, "Dsd", "#320032"),
    (26, "Dwa", "#640064"),
    (27, "Dwb", "#c800c8"),
    (28, "Dwc", "#c81485"),
    (29, "Dwd", "#64ffff"),
    (30, "ET", "#6496ff"),
    (31, "EF", "#6000ff"),
];

// ── Class table ───────────────────────────────────────────────────────────────

/// Display metadata for one class code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Short Köppen symbol, e.g. `"Dfc"`.
    pub label: String,
    /// `#rrggbb` hex colour.
    pub color: String,
}

/// Lookup table from class code to label and colour.
///
/// Serialized as a JSON object keyed by the decimal code, so a config file can
/// override a subset of entries:
/// `{"30": {"label": "ET", "color": "#6496ff"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassTable {
    entries: BTreeMap<ClassCode, ClassInfo>,
}

impl Default for ClassTable {
    fn default() -> Self {
        let entries = DEFAULT_CLASSES
            .iter()
            .map(|&(code, label, color)| {
                (code, ClassInfo { label: label.to_owned(), color: color.to_owned() })
            })
            .collect();
        Self { entries }
    }
}

impl ClassTable {
    /// Table with no entries; every lookup falls back to the unknown label/colour.
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, code: ClassCode, label: &str, color: &str) {
        self.entries.insert(code, ClassInfo { label: label.to_owned(), color: color.to_owned() });
    }

    pub fn contains(&self, code: ClassCode) -> bool {
        self.entries.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Short label for `code`, or [`UNKNOWN_LABEL`].
    pub fn label(&self, code: ClassCode) -> &str {
        self.entries.get(&code).map_or(UNKNOWN_LABEL, |c| c.label.as_str())
    }

    /// RGB colour for `code`. Missing entries and malformed hex strings both
    /// resolve to [`UNKNOWN_COLOR`].
    pub fn color(&self, code: ClassCode) -> [u8; 3] {
        self.entries
            .get(&code)
            .and_then(|c| parse_hex_color(&c.color))
            .unwrap_or(UNKNOWN_COLOR)
    }

    /// `"ET -> Dfc"` style label for a transition.
    pub fn transition_label(&self, from: ClassCode, to: ClassCode) -> String {
        format!("{} -> {}", self.label(from), self.label(to))
    }

    /// Overlay `other` on top of `self`: entries in `other` win.
    pub fn merged_with(mut self, other: &ClassTable) -> Self {
        for (&code, info) in &other.entries {
            self.entries.insert(code, info.clone());
        }
        self
    }

    /// Malformed colour entries, as `(code, colour)` pairs.
    pub fn invalid_colors(&self) -> Vec<(ClassCode, String)> {
        self.entries
            .iter()
            .filter(|(_, info)| parse_hex_color(&info.color).is_none())
            .map(|(&code, info)| (code, info.color.clone()))
            .collect()
    }
}

/// Parse `#rrggbb` (leading `#` optional) into RGB.
pub fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_all_31_classes() {
        let t = ClassTable::default();
        assert_eq!(t.len(), 31);
        for code in 1..=31u8 {
            assert!(t.contains(code), "missing class {code}");
        }
        assert!(t.invalid_colors().is_empty());
    }

    #[test]
    fn et_and_ef_labels() {
        let t = ClassTable::default();
        assert_eq!(t.label(ET), "ET");
        assert_eq!(t.label(EF), "EF");
        assert_eq!(t.color(ET), [0x64, 0x96, 0xff]);
    }

    #[test]
    fn unknown_code_falls_back() {
        let t = ClassTable::default();
        assert_eq!(t.label(NODATA), UNKNOWN_LABEL);
        assert_eq!(t.color(200), UNKNOWN_COLOR);
    }

    #[test]
    fn transition_label_format() {
        let t = ClassTable::default();
        assert_eq!(t.transition_label(ET, 20), "ET -> Dfc");
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#6000ff"), Some([0x60, 0x00, 0xff]));
        assert_eq!(parse_hex_color("c8c8c8"), Some([200, 200, 200]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn json_override_merges_over_defaults() {
        let json = r##"{"30": {"label": "Tundra", "color": "#010203"}}"##;
        let overrides: ClassTable = serde_json::from_str(json).unwrap();
        let t = ClassTable::default().merged_with(&overrides);
        assert_eq!(t.label(ET), "Tundra");
        assert_eq!(t.color(ET), [1, 2, 3]);
        assert_eq!(t.label(EF), "EF");
    }

    #[test]
    fn malformed_colour_reported() {
        let mut t = ClassTable::empty();
        t.insert(5, "BWk", "yellow");
        assert_eq!(t.invalid_colors(), vec![(5, "yellow".to_owned())]);
        assert_eq!(t.color(5), UNKNOWN_COLOR);
    }
}
