//! Admin product payload and its validation pass.
//!
//! `ProductInput` mirrors what the admin form posts: every field optional and
//! loosely typed (numbers may arrive as JSON numbers or strings, booleans as
//! `true` or `"true"`). [`ProductInput::validate`] turns it into a
//! [`ValidProduct`] or reports every problem at once.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::products::{Gender, ProductDetails, ProductStatus};

const MAX_NAME_LEN: usize = 200;
const MAX_MONEY_SCALE: u32 = 2;
// NUMERIC(12,2)
const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);
// NUMERIC(5,2)
const MAX_CASE_MM: Decimal = Decimal::from_parts(99_999, 0, 0, false, 2);
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_AVAILABILITY: &str = "in_stock";
const DEFAULT_STOCK_QUANTITY: i32 = 1;

/// A JSON number or a string holding one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    fn as_text(&self) -> String {
        match self {
            RawNumber::Number(n) => n.to_string(),
            RawNumber::Text(s) => s.trim().to_string(),
        }
    }
}

/// A JSON boolean or one of the strings `"true"` / `"false"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlexBool {
    Bool(bool),
    Text(String),
}

impl FlexBool {
    fn parse(&self) -> Option<bool> {
        match self {
            FlexBool::Bool(b) => Some(*b),
            FlexBool::Text(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageInput {
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub hover_url: Option<String>,
    pub cover_url: Option<String>,
    pub alt_text: Option<String>,
    /// Accepted for compatibility but ignored: the first image is always primary.
    pub is_primary: Option<FlexBool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub model_number: Option<String>,
    pub sku: Option<String>,
    pub slug: Option<String>,
    pub brand: Option<String>,
    pub price: Option<RawNumber>,
    pub discount_price: Option<RawNumber>,
    pub currency: Option<String>,
    pub stock_quantity: Option<RawNumber>,
    pub availability: Option<String>,
    pub status: Option<String>,
    pub is_featured: Option<FlexBool>,

    pub case_material: Option<String>,
    pub dial_color: Option<String>,
    pub watch_style: Option<String>,
    pub clasp_type: Option<String>,
    pub complication_ids: Option<Vec<i64>>,
    pub complications: Option<Vec<String>>,
    pub images: Option<Vec<ImageInput>>,

    pub case_diameter_mm: Option<RawNumber>,
    pub case_thickness_mm: Option<RawNumber>,

    pub description: Option<String>,
    pub short_description: Option<String>,
    pub gender: Option<String>,
    pub year_of_production: Option<RawNumber>,
    pub case_shape: Option<String>,
    pub case_back: Option<String>,
    pub water_resistance_m: Option<RawNumber>,
    pub dial_numerals: Option<String>,
    pub crystal: Option<String>,
    pub bezel_material: Option<String>,
    pub bezel_type: Option<String>,
    pub bracelet_material: Option<String>,
    pub bracelet_color: Option<String>,
    pub lug_width_mm: Option<RawNumber>,
    pub movement_type: Option<String>,
    pub caliber: Option<String>,
    pub power_reserve_hours: Option<RawNumber>,
    pub jewels: Option<RawNumber>,
    pub frequency_bph: Option<RawNumber>,
    pub condition: Option<String>,
    pub has_box: Option<FlexBool>,
    pub has_papers: Option<FlexBool>,
    pub service_history: Option<String>,
    pub provenance_notes: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub hover_url: Option<String>,
    pub cover_url: Option<String>,
    pub alt_text: Option<String>,
}

/// A product payload that passed validation. Strings are trimmed and blank
/// optionals are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub name: String,
    pub model_number: String,
    pub sku: Option<String>,
    pub slug: Option<String>,
    pub brand: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub currency: String,
    pub stock_quantity: i32,
    pub availability: String,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub case_material: Option<String>,
    pub dial_color: Option<String>,
    pub watch_style: Option<String>,
    pub clasp_type: Option<String>,
    /// `None` leaves existing links untouched on update.
    pub complication_ids: Option<Vec<i64>>,
    pub complication_names: Option<Vec<String>>,
    /// `None` leaves existing images untouched on update.
    pub images: Option<Vec<NewImage>>,
    pub case_diameter_mm: Option<Decimal>,
    pub case_thickness_mm: Option<Decimal>,
    pub details: ProductDetails,
}

impl ValidProduct {
    /// Whether the payload touches complication links at all.
    #[must_use]
    pub fn replaces_complications(&self) -> bool {
        self.complication_ids.is_some() || self.complication_names.is_some()
    }
}

/// Accumulates violations while fields are parsed.
#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    fn required_text(&mut self, field: &str, value: Option<&String>) -> String {
        match clean(value) {
            Some(text) if text.chars().count() > MAX_NAME_LEN => {
                self.push(field, format!("must be at most {MAX_NAME_LEN} characters"));
                text
            }
            Some(text) => text,
            None => {
                self.push(field, "is required");
                String::new()
            }
        }
    }

    fn decimal(
        &mut self,
        field: &str,
        value: Option<&RawNumber>,
        max: Decimal,
    ) -> Option<Decimal> {
        let raw = value?.as_text();
        if raw.is_empty() {
            return None;
        }
        let parsed = match Decimal::from_str(&raw) {
            Ok(d) => d,
            Err(_) => {
                self.push(field, format!("'{raw}' is not a valid decimal number"));
                return None;
            }
        };
        if parsed.is_sign_negative() && !parsed.is_zero() {
            self.push(field, "must not be negative");
            return None;
        }
        let normalized = parsed.normalize();
        if normalized.scale() > MAX_MONEY_SCALE {
            self.push(
                field,
                format!("must have at most {MAX_MONEY_SCALE} decimal places"),
            );
            return None;
        }
        if parsed > max {
            self.push(field, format!("must not exceed {max}"));
            return None;
        }
        Some(parsed)
    }

    fn integer(
        &mut self,
        field: &str,
        value: Option<&RawNumber>,
        range: std::ops::RangeInclusive<i32>,
    ) -> Option<i32> {
        let raw = value?.as_text();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i32>() {
            Ok(n) if range.contains(&n) => Some(n),
            Ok(n) => {
                self.push(
                    field,
                    format!("must be between {} and {}, got {n}", range.start(), range.end()),
                );
                None
            }
            Err(_) => {
                self.push(field, format!("'{raw}' is not a whole number"));
                None
            }
        }
    }

    fn flag(&mut self, field: &str, value: Option<&FlexBool>) -> bool {
        match value {
            None => false,
            Some(raw) => raw.parse().unwrap_or_else(|| {
                self.push(field, "must be true or false");
                false
            }),
        }
    }

    fn parsed<T: FromStr<Err = String>>(&mut self, field: &str, value: Option<&String>) -> Option<T> {
        let text = clean(value)?;
        match text.parse::<T>() {
            Ok(v) => Some(v),
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }
}

fn clean(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn clean_list(values: Option<&Vec<String>>) -> Option<Vec<String>> {
    values.map(|list| list.iter().filter_map(|s| clean(Some(s))).collect())
}

impl ProductInput {
    /// Validate the payload without touching storage.
    ///
    /// # Errors
    ///
    /// Returns every [`FieldViolation`] found, in field order.
    pub fn validate(&self) -> Result<ValidProduct, Vec<FieldViolation>> {
        let mut check = Checker::default();

        let name = check.required_text("name", self.name.as_ref());
        let model_number = check.required_text("model_number", self.model_number.as_ref());
        let brand = check.required_text("brand", self.brand.as_ref());

        let price_given = self
            .price
            .as_ref()
            .is_some_and(|raw| !raw.as_text().is_empty());
        let price = if price_given {
            check.decimal("price", self.price.as_ref(), MAX_PRICE)
        } else {
            check.push("price", "is required");
            None
        };
        let discount_price =
            check.decimal("discount_price", self.discount_price.as_ref(), MAX_PRICE);
        if let (Some(price), Some(discount)) = (price, discount_price) {
            if discount > price {
                check.push("discount_price", "must not exceed price");
            }
        }

        let currency = clean(self.currency.as_ref())
            .map_or_else(|| DEFAULT_CURRENCY.to_string(), |c| c.to_ascii_uppercase());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            check.push("currency", "must be a three-letter ISO 4217 code");
        }

        let stock_quantity = check
            .integer("stock_quantity", self.stock_quantity.as_ref(), 0..=i32::MAX)
            .unwrap_or(DEFAULT_STOCK_QUANTITY);
        let availability = clean(self.availability.as_ref())
            .unwrap_or_else(|| DEFAULT_AVAILABILITY.to_string());
        let status = check
            .parsed::<ProductStatus>("status", self.status.as_ref())
            .unwrap_or_default();
        let is_featured = check.flag("is_featured", self.is_featured.as_ref());

        let slug = match clean(self.slug.as_ref()) {
            Some(raw) => {
                let slug = crate::naming::slugify(&raw);
                if slug.is_empty() {
                    check.push("slug", "must contain at least one letter or digit");
                    None
                } else {
                    Some(slug)
                }
            }
            None => {
                if !name.is_empty()
                    && !model_number.is_empty()
                    && crate::naming::default_slug(&name, &model_number).is_empty()
                {
                    check.push("slug", "name and model_number have no letters or digits; supply a slug");
                }
                None
            }
        };

        let case_diameter_mm =
            check.decimal("case_diameter_mm", self.case_diameter_mm.as_ref(), MAX_CASE_MM);
        let case_thickness_mm =
            check.decimal("case_thickness_mm", self.case_thickness_mm.as_ref(), MAX_CASE_MM);

        let images = self.images.as_ref().map(|images| {
            images
                .iter()
                .enumerate()
                .filter_map(|(i, image)| {
                    let Some(url) = clean(Some(&image.url)) else {
                        check.push(&format!("images[{i}].url"), "is required");
                        return None;
                    };
                    Some(NewImage {
                        url,
                        thumbnail_url: clean(image.thumbnail_url.as_ref()),
                        hover_url: clean(image.hover_url.as_ref()),
                        cover_url: clean(image.cover_url.as_ref()),
                        alt_text: clean(image.alt_text.as_ref()),
                    })
                })
                .collect::<Vec<_>>()
        });

        let details = ProductDetails {
            description: clean(self.description.as_ref()),
            short_description: clean(self.short_description.as_ref()),
            gender: check.parsed::<Gender>("gender", self.gender.as_ref()),
            year_of_production: check.integer(
                "year_of_production",
                self.year_of_production.as_ref(),
                1700..=2100,
            ),
            case_shape: clean(self.case_shape.as_ref()),
            case_back: clean(self.case_back.as_ref()),
            water_resistance_m: check.integer(
                "water_resistance_m",
                self.water_resistance_m.as_ref(),
                0..=20_000,
            ),
            dial_numerals: clean(self.dial_numerals.as_ref()),
            crystal: clean(self.crystal.as_ref()),
            bezel_material: clean(self.bezel_material.as_ref()),
            bezel_type: clean(self.bezel_type.as_ref()),
            bracelet_material: clean(self.bracelet_material.as_ref()),
            bracelet_color: clean(self.bracelet_color.as_ref()),
            lug_width_mm: check.integer("lug_width_mm", self.lug_width_mm.as_ref(), 0..=100),
            movement_type: clean(self.movement_type.as_ref()),
            caliber: clean(self.caliber.as_ref()),
            power_reserve_hours: check.integer(
                "power_reserve_hours",
                self.power_reserve_hours.as_ref(),
                0..=10_000,
            ),
            jewels: check.integer("jewels", self.jewels.as_ref(), 0..=1_000),
            frequency_bph: check.integer(
                "frequency_bph",
                self.frequency_bph.as_ref(),
                0..=1_000_000,
            ),
            condition: clean(self.condition.as_ref()),
            has_box: check.flag("has_box", self.has_box.as_ref()),
            has_papers: check.flag("has_papers", self.has_papers.as_ref()),
            service_history: clean(self.service_history.as_ref()),
            provenance_notes: clean(self.provenance_notes.as_ref()),
            meta_title: clean(self.meta_title.as_ref()),
            meta_description: clean(self.meta_description.as_ref()),
        };

        if !check.violations.is_empty() {
            return Err(check.violations);
        }

        Ok(ValidProduct {
            name,
            model_number,
            sku: clean(self.sku.as_ref()),
            slug,
            brand,
            price: price.unwrap_or_default(),
            discount_price,
            currency,
            stock_quantity,
            availability,
            status,
            is_featured,
            case_material: clean(self.case_material.as_ref()),
            dial_color: clean(self.dial_color.as_ref()),
            watch_style: clean(self.watch_style.as_ref()),
            clasp_type: clean(self.clasp_type.as_ref()),
            complication_ids: self.complication_ids.clone(),
            complication_names: clean_list(self.complications.as_ref()),
            images,
            case_diameter_mm,
            case_thickness_mm,
            details,
        })
    }
}

#[cfg(test)]
#[path = "input_test.rs"]
mod tests;
