//! Reference entities: the small lookup tables (brand, material, color,
//! watch style, clasp type, complication) shared across products.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// An `(id, name)` row from one of the reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Brand,
    Material,
    Color,
    WatchStyle,
    ClaspType,
    Complication,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::Brand,
        ReferenceKind::Material,
        ReferenceKind::Color,
        ReferenceKind::WatchStyle,
        ReferenceKind::ClaspType,
        ReferenceKind::Complication,
    ];

    /// Backing table name. Only ever interpolated from this closed set.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Brand => "brands",
            ReferenceKind::Material => "materials",
            ReferenceKind::Color => "colors",
            ReferenceKind::WatchStyle => "watch_styles",
            ReferenceKind::ClaspType => "clasp_types",
            ReferenceKind::Complication => "complications",
        }
    }

    /// URL path segment, e.g. `watch-styles`.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            ReferenceKind::Brand => "brands",
            ReferenceKind::Material => "materials",
            ReferenceKind::Color => "colors",
            ReferenceKind::WatchStyle => "watch-styles",
            ReferenceKind::ClaspType => "clasp-types",
            ReferenceKind::Complication => "complications",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Brand => write!(f, "brand"),
            ReferenceKind::Material => write!(f, "material"),
            ReferenceKind::Color => write!(f, "color"),
            ReferenceKind::WatchStyle => write!(f, "watch style"),
            ReferenceKind::ClaspType => write!(f, "clasp type"),
            ReferenceKind::Complication => write!(f, "complication"),
        }
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceKind::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == s || kind.table() == s)
            .ok_or_else(|| format!("unknown reference kind '{s}'"))
    }
}

/// Seed lists for every reference table, loaded from YAML.
#[derive(Debug, Default, Deserialize)]
pub struct TaxonomyFile {
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub watch_styles: Vec<String>,
    #[serde(default)]
    pub clasp_types: Vec<String>,
    #[serde(default)]
    pub complications: Vec<String>,
}

impl TaxonomyFile {
    #[must_use]
    pub fn names(&self, kind: ReferenceKind) -> &[String] {
        match kind {
            ReferenceKind::Brand => &self.brands,
            ReferenceKind::Material => &self.materials,
            ReferenceKind::Color => &self.colors,
            ReferenceKind::WatchStyle => &self.watch_styles,
            ReferenceKind::ClaspType => &self.clasp_types,
            ReferenceKind::Complication => &self.complications,
        }
    }

    /// Total number of names across all lists.
    #[must_use]
    pub fn len(&self) -> usize {
        ReferenceKind::ALL
            .into_iter()
            .map(|kind| self.names(kind).len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load and validate the taxonomy seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_taxonomy(path: &Path) -> Result<TaxonomyFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TaxonomyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let taxonomy: TaxonomyFile = serde_yaml::from_str(&content)?;
    validate_taxonomy(&taxonomy)?;

    Ok(taxonomy)
}

fn validate_taxonomy(taxonomy: &TaxonomyFile) -> Result<(), ConfigError> {
    for kind in ReferenceKind::ALL {
        let mut seen = HashSet::new();
        for name in taxonomy.names(kind) {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{kind} names must be non-empty"
                )));
            }
            if !seen.insert(trimmed.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate {kind} name: '{trimmed}'"
                )));
            }
        }
    }
    Ok(())
}
