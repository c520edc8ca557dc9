use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::products::{Product, ProductDetails, ProductImage, ProductStatus};
use crate::reference::Reference;

/// JSON-ready view of a [`Product`].
///
/// Decimal columns are rendered as strings so `10500.00` never passes through
/// a float. Absent optionals serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayProduct {
    pub id: i64,
    pub name: String,
    pub model_number: String,
    pub sku: String,
    pub slug: String,
    pub price: String,
    pub discount_price: Option<String>,
    pub effective_price: String,
    pub on_sale: bool,
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
    pub case_diameter_mm: Option<String>,
    pub case_thickness_mm: Option<String>,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub primary_image_url: Option<String>,
    pub images: Vec<ProductImage>,
    pub complications: Vec<Reference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

/// Build the shopper/admin JSON view of a product.
#[must_use]
pub fn to_display_form(product: &Product) -> DisplayProduct {
    let effective = product.effective_price();
    let primary_image_url = product.primary_image_url.clone().or_else(|| {
        product
            .images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| product.images.first())
            .map(|image| image.url.clone())
    });

    DisplayProduct {
        id: product.id,
        name: product.name.clone(),
        model_number: product.model_number.clone(),
        sku: product.sku.clone(),
        slug: product.slug.clone(),
        price: decimal_text(product.price),
        discount_price: product.discount_price.map(decimal_text),
        effective_price: decimal_text(effective),
        on_sale: effective < product.price,
        currency: product.currency.clone(),
        stock_quantity: product.stock_quantity,
        availability: product.availability.clone(),
        status: product.status,
        is_featured: product.is_featured,
        brand: product.brand.clone(),
        case_material: product.case_material.clone(),
        dial_color: product.dial_color.clone(),
        watch_style: product.watch_style.clone(),
        clasp_type: product.clasp_type.clone(),
        case_diameter_mm: product.case_diameter_mm.map(decimal_text),
        case_thickness_mm: product.case_thickness_mm.map(decimal_text),
        details: product.details.clone(),
        primary_image_url,
        images: product.images.clone(),
        complications: product.complications.clone(),
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}
