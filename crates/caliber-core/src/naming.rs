//! Slug and SKU derivation rules.

use chrono::{DateTime, Utc};

/// Generate a slug: lowercase alphanumerics (any script) joined by single
/// hyphens. Whitespace, `-`, `_`, `/` and `.` separate words; anything else
/// is dropped.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || matches!(c, '-' | '_' | '/' | '.') {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug used when none is supplied: the slugified name, or the slugified
/// model number when the name has no letters or digits.
#[must_use]
pub fn default_slug(name: &str, model_number: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        slugify(model_number)
    } else {
        slug
    }
}

/// Default SKU: the first three characters of the brand name, uppercased,
/// then a hyphen and the model number (`Rolex` + `126610LN` → `ROL-126610LN`).
#[must_use]
pub fn derive_sku(brand_name: &str, model_number: &str) -> String {
    let prefix: String = brand_name.trim().chars().take(3).collect();
    format!("{}-{}", prefix.to_uppercase(), model_number.trim())
}

/// Append the last four digits of the millisecond timestamp to a colliding
/// SKU. Best effort only: two writers in the same 10-second window can still
/// draw the same suffix, in which case the unique index rejects the second.
#[must_use]
pub fn disambiguate_sku(sku: &str, at: DateTime<Utc>) -> String {
    format!("{sku}-{:04}", at.timestamp_millis().rem_euclid(10_000))
}

/// Fallback slug for a derived slug that is already taken.
#[must_use]
pub fn slug_with_model_suffix(slug: &str, model_number: &str) -> String {
    let suffix = slugify(model_number);
    if suffix.is_empty() {
        slug.to_string()
    } else {
        format!("{slug}-{suffix}")
    }
}
