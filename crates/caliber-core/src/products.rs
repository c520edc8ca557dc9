use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::reference::Reference;

/// Publication state. Only `Published` products are visible to shoppers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Published => "published",
            ProductStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ProductStatus::Draft),
            "published" => Ok(ProductStatus::Published),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(format!(
                "status must be draft, published or archived, got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
    Unisex,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Unisex => "unisex",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "men" | "male" | "mens" => Ok(Gender::Men),
            "women" | "female" | "womens" => Ok(Gender::Women),
            "unisex" => Ok(Gender::Unisex),
            other => Err(format!("gender must be men, women or unisex, got '{other}'")),
        }
    }
}

/// Optional descriptive attributes of a watch. None of these take part in
/// identity or pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub gender: Option<Gender>,
    pub year_of_production: Option<i32>,
    pub case_shape: Option<String>,
    pub case_back: Option<String>,
    pub water_resistance_m: Option<i32>,
    pub dial_numerals: Option<String>,
    pub crystal: Option<String>,
    pub bezel_material: Option<String>,
    pub bezel_type: Option<String>,
    pub bracelet_material: Option<String>,
    pub bracelet_color: Option<String>,
    pub lug_width_mm: Option<i32>,
    pub movement_type: Option<String>,
    pub caliber: Option<String>,
    pub power_reserve_hours: Option<i32>,
    pub jewels: Option<i32>,
    pub frequency_bph: Option<i32>,
    pub condition: Option<String>,
    pub has_box: bool,
    pub has_papers: bool,
    pub service_history: Option<String>,
    pub provenance_notes: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub hover_url: Option<String>,
    pub cover_url: Option<String>,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
}

/// A catalog product with its reference entities joined in.
///
/// `images` and `complications` are only loaded by single-product lookups;
/// list queries leave them empty and carry `primary_image_url` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub model_number: String,
    pub sku: String,
    pub slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub currency: String,
    pub stock_quantity: i32,
    pub availability: String,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub brand: Reference,
    pub case_material: Option<Reference>,
    pub dial_color: Option<Reference>,
    pub watch_style: Option<Reference>,
    pub clasp_type: Option<Reference>,
    pub case_diameter_mm: Option<Decimal>,
    pub case_thickness_mm: Option<Decimal>,
    pub details: ProductDetails,
    pub primary_image_url: Option<String>,
    pub images: Vec<ProductImage>,
    pub complications: Vec<Reference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a shopper pays: the discount price when it undercuts the
    /// list price, otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.discount_price {
            Some(discount) if discount < self.price => discount,
            _ => self.price,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::PriceAsc => "price_asc",
            SortKey::PriceDesc => "price_desc",
            SortKey::Newest => "newest",
        }
    }

    /// Parse a query-string sort key; anything unrecognized sorts newest first.
    #[must_use]
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price_asc") => SortKey::PriceAsc,
            Some("price_desc") => SortKey::PriceDesc,
            _ => SortKey::Newest,
        }
    }
}

/// Shopper-facing list filter.
///
/// Fields combine with AND; values within a field combine with OR. An empty
/// set means "no constraint". Price bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub brand_ids: Vec<i64>,
    pub genders: Vec<Gender>,
    pub watch_style_ids: Vec<i64>,
    pub conditions: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &ProductFilter::default()
    }
}
