//! # Source Leaning
//!
//! Maps an outlet's display name to one of five ordered political-leaning labels
//! (`left`, `center-left`, `center`, `center-right`, `right`).
//!
//! - Exact lookup against a curated outlet table (national, Spanish-language, English-language).
//! - On a miss: lower-cased substring heuristics, evaluated right → left → center.
//! - Anything else resolves to `center`.
//! - The built-in table is a process-wide immutable static; custom tables can be loaded from JSON.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path};

/// Political-leaning label of an outlet, ordered left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Leaning {
    Left,
    CenterLeft,
    Center,
    CenterRight,
    Right,
}

impl Leaning {
    pub const ALL: [Leaning; 5] = [
        Leaning::Left,
        Leaning::CenterLeft,
        Leaning::Center,
        Leaning::CenterRight,
        Leaning::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Leaning::Left => "left",
            Leaning::CenterLeft => "center-left",
            Leaning::Center => "center",
            Leaning::CenterRight => "center-right",
            Leaning::Right => "right",
        }
    }

    /// Heuristic evaluation rank: right-block fragments first, then left, then center.
    fn heuristic_rank(self) -> u8 {
        match self {
            Leaning::Right | Leaning::CenterRight => 0,
            Leaning::Left | Leaning::CenterLeft => 1,
            Leaning::Center => 2,
        }
    }
}

impl fmt::Display for Leaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label article counts. All five buckets are always present (zero by default).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaningCounts {
    pub left: u32,
    #[serde(rename = "center-left")]
    pub center_left: u32,
    pub center: u32,
    #[serde(rename = "center-right")]
    pub center_right: u32,
    pub right: u32,
}

impl LeaningCounts {
    /// Counts with a single article in `leaning`'s bucket.
    pub fn single(leaning: Leaning) -> Self {
        let mut c = Self::default();
        c.increment(leaning);
        c
    }

    pub fn increment(&mut self, leaning: Leaning) {
        *self.bucket_mut(leaning) += 1;
    }

    pub fn get(&self, leaning: Leaning) -> u32 {
        match leaning {
            Leaning::Left => self.left,
            Leaning::CenterLeft => self.center_left,
            Leaning::Center => self.center,
            Leaning::CenterRight => self.center_right,
            Leaning::Right => self.right,
        }
    }

    pub fn total(&self) -> u32 {
        Leaning::ALL.iter().map(|l| self.get(*l)).sum()
    }

    /// `left + center-left`
    pub fn left_block(&self) -> u32 {
        self.left + self.center_left
    }

    /// `right + center-right`
    pub fn right_block(&self) -> u32 {
        self.right + self.center_right
    }

    /// Number of labels with at least one article.
    pub fn distinct(&self) -> usize {
        Leaning::ALL.iter().filter(|l| self.get(**l) > 0).count()
    }

    fn bucket_mut(&mut self, leaning: Leaning) -> &mut u32 {
        match leaning {
            Leaning::Left => &mut self.left,
            Leaning::CenterLeft => &mut self.center_left,
            Leaning::Center => &mut self.center,
            Leaning::CenterRight => &mut self.center_right,
            Leaning::Right => &mut self.right,
        }
    }
}

/// One substring rule: any fragment contained in the lower-cased name yields `leaning`.
#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicRule {
    pub leaning: Leaning,
    pub fragments: Vec<String>,
}

/// Curated outlet table plus substring heuristics.
///
/// Heuristics are always held in evaluation order (right → left → center) with lower-cased
/// fragments, whether the table was built in code or deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "LeaningTableFile")]
pub struct LeaningTable {
    /// Exact outlet display names → label.
    pub outlets: HashMap<String, Leaning>,
    heuristics: Vec<HeuristicRule>,
}

/// On-disk shape of a leaning table; heuristics in any order and case.
#[derive(Deserialize)]
struct LeaningTableFile {
    #[serde(default)]
    outlets: HashMap<String, Leaning>,
    #[serde(default)]
    heuristics: Vec<HeuristicRule>,
}

impl From<LeaningTableFile> for LeaningTable {
    fn from(f: LeaningTableFile) -> Self {
        LeaningTable::new(f.outlets, f.heuristics)
    }
}

/// Process-wide built-in table. Initialized on first use, never mutated.
static DEFAULT_TABLE: Lazy<LeaningTable> = Lazy::new(LeaningTable::default_seed);

/// Classify a source name against the built-in table.
pub fn classify_source(source: &str) -> Leaning {
    DEFAULT_TABLE.classify(source)
}

/// Shared reference to the built-in table.
pub fn default_table() -> &'static LeaningTable {
    &DEFAULT_TABLE
}

impl LeaningTable {
    /// Build a table; heuristics are put in evaluation order and fragments normalized.
    pub fn new(outlets: HashMap<String, Leaning>, heuristics: Vec<HeuristicRule>) -> Self {
        Self {
            outlets,
            heuristics,
        }
        .with_ordered_heuristics()
    }

    /// Heuristic rules in evaluation order.
    pub fn heuristics(&self) -> &[HeuristicRule] {
        &self.heuristics
    }

    /// Load a table from a JSON file.
    /// Falls back to `default_seed()` on read or parse error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str::<LeaningTable>(&s).map_err(anyhow::Error::from));
        match parsed {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(
                    target: "nexus",
                    error = %e,
                    path = %path.display(),
                    "leaning table unreadable, using built-in seed"
                );
                Self::default_seed()
            }
        }
    }

    /// Resolve the label for `source`.
    ///
    /// Steps:
    /// 1. Exact match on the trimmed name.
    /// 2. Substring heuristics on the lower-cased name (right → left → center).
    /// 3. `center`.
    pub fn classify(&self, source: &str) -> Leaning {
        let clean = source.trim();

        if let Some(&l) = self.outlets.get(clean) {
            return l;
        }

        let lower = clean.to_lowercase();
        for rule in &self.heuristics {
            if rule
                .fragments
                .iter()
                .any(|f| !f.is_empty() && lower.contains(f.as_str()))
            {
                return rule.leaning;
            }
        }

        Leaning::Center
    }

    fn with_ordered_heuristics(mut self) -> Self {
        // stable: file order is kept within a rank
        self.heuristics.sort_by_key(|r| r.leaning.heuristic_rank());
        for rule in &mut self.heuristics {
            for f in &mut rule.fragments {
                *f = f.trim().to_lowercase();
            }
        }
        self
    }

    /// Built-in curated table.
    pub(crate) fn default_seed() -> Self {
        use Leaning::*;

        let mut outlets = HashMap::new();
        for (name, leaning) in [
            // Chile
            ("La Tercera", CenterRight),
            ("Emol", Right),
            ("BioBioChile", CenterRight),
            ("Radio Bío-Bío", CenterRight),
            ("El Mercurio", Right),
            ("Radio Agricultura", Right),
            ("Meganoticias", Center),
            ("24horas.cl", Center),
            ("T13", Center),
            ("ADN Radio", Center),
            ("CNN Chile", CenterLeft),
            ("Cooperativa.cl", CenterLeft),
            ("Radio Universidad de Chile", CenterLeft),
            ("El Mostrador", Left),
            ("El Desconcierto", Left),
            ("La Izquierda Diario", Left),
            ("El Ciudadano", Left),
            ("The Clinic", Left),
            ("Interferencia", Left),
            // Spanish-language international
            ("El País", CenterLeft),
            ("Página/12", Left),
            ("elDiario.es", Left),
            ("RT", Left),
            ("BBC News Mundo", Center),
            ("CNN en Español", Center),
            ("Deutsche Welle (Español)", Center),
            ("Marca", Center),
            ("Infobae", CenterRight),
            ("Clarín", CenterRight),
            ("La Nación", CenterRight),
            ("El Mundo", CenterRight),
            ("La Vanguardia", Center),
            ("ABC", Right),
            // English-language
            ("The New York Times", CenterLeft),
            ("CNN", CenterLeft),
            ("The Washington Post", CenterLeft),
            ("Al Jazeera English", CenterLeft),
            ("The Guardian", Left),
            ("MSNBC", Left),
            ("BBC News", Center),
            ("Reuters", Center),
            ("Associated Press", Center),
            ("USA Today", Center),
            ("Bloomberg", Center),
            ("Wall Street Journal", CenterRight),
            ("Fox News", Right),
            ("New York Post", Right),
        ] {
            outlets.insert(name.to_string(), leaning);
        }

        let rule = |leaning: Leaning, fragments: &[&str]| HeuristicRule {
            leaning,
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
        };

        Self::new(
            outlets,
            vec![
                rule(Right, &["tercera", "mercurio", "emol", "fox"]),
                rule(Left, &["mostrador", "izquierda", "ciudadano", "guardian"]),
                rule(Center, &["cnn", "bbc", "reuters"]),
            ],
        )
    }
}
