//! Row types for `products` and `product_images`.

use caliber_core::{Product, ProductDetails, ProductImage, Reference};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Column list and joins shared by every product read. Expands to a string
/// literal so callers can `concat!` their `WHERE` / `ORDER BY` onto it.
macro_rules! product_select {
    () => {
        "SELECT p.id, p.name, p.model_number, p.sku, p.slug, \
                p.price, p.discount_price, p.currency, p.stock_quantity, \
                p.availability, p.status, p.is_featured, \
                p.brand_id, b.name AS brand_name, \
                p.case_material_id, cm.name AS case_material_name, \
                p.dial_color_id, dc.name AS dial_color_name, \
                p.watch_style_id, ws.name AS watch_style_name, \
                p.clasp_type_id, ct.name AS clasp_type_name, \
                p.case_diameter_mm, p.case_thickness_mm, \
                p.description, p.short_description, p.gender, p.year_of_production, \
                p.case_shape, p.case_back, p.water_resistance_m, p.dial_numerals, \
                p.crystal, p.bezel_material, p.bezel_type, p.bracelet_material, \
                p.bracelet_color, p.lug_width_mm, p.movement_type, p.caliber, \
                p.power_reserve_hours, p.jewels, p.frequency_bph, p.condition, \
                p.has_box, p.has_papers, p.service_history, p.provenance_notes, \
                p.meta_title, p.meta_description, \
                (SELECT pi.url FROM product_images pi \
                  WHERE pi.product_id = p.id \
                  ORDER BY pi.is_primary DESC, pi.display_order, pi.id \
                  LIMIT 1) AS primary_image_url, \
                p.created_at, p.updated_at \
         FROM products p \
         JOIN brands b ON b.id = p.brand_id \
         LEFT JOIN materials cm ON cm.id = p.case_material_id \
         LEFT JOIN colors dc ON dc.id = p.dial_color_id \
         LEFT JOIN watch_styles ws ON ws.id = p.watch_style_id \
         LEFT JOIN clasp_types ct ON ct.id = p.clasp_type_id "
    };
}
pub(crate) use product_select;

/// A `products` row with its reference names joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
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
    pub status: String,
    pub is_featured: bool,
    pub brand_id: i64,
    pub brand_name: String,
    pub case_material_id: Option<i64>,
    pub case_material_name: Option<String>,
    pub dial_color_id: Option<i64>,
    pub dial_color_name: Option<String>,
    pub watch_style_id: Option<i64>,
    pub watch_style_name: Option<String>,
    pub clasp_type_id: Option<i64>,
    pub clasp_type_name: Option<String>,
    pub case_diameter_mm: Option<Decimal>,
    pub case_thickness_mm: Option<Decimal>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// `men` / `women` / `unisex`, enforced by a CHECK constraint.
    pub gender: Option<String>,
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
    pub primary_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `product_images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRow {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub hover_url: Option<String>,
    pub cover_url: Option<String>,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            thumbnail_url: row.thumbnail_url,
            hover_url: row.hover_url,
            cover_url: row.cover_url,
            alt_text: row.alt_text,
            is_primary: row.is_primary,
            display_order: row.display_order,
        }
    }
}

fn reference(id: Option<i64>, name: Option<String>) -> Option<Reference> {
    Some(Reference {
        id: id?,
        name: name?,
    })
}

impl ProductRow {
    /// Convert into the domain type. `images` and `complications` are empty;
    /// detail reads fill them in afterwards.
    #[must_use]
    pub fn into_product(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            model_number: self.model_number,
            sku: self.sku,
            slug: self.slug,
            price: self.price,
            discount_price: self.discount_price,
            currency: self.currency,
            stock_quantity: self.stock_quantity,
            availability: self.availability,
            status: self.status.parse().unwrap_or_default(),
            is_featured: self.is_featured,
            brand: Reference {
                id: self.brand_id,
                name: self.brand_name,
            },
            case_material: reference(self.case_material_id, self.case_material_name),
            dial_color: reference(self.dial_color_id, self.dial_color_name),
            watch_style: reference(self.watch_style_id, self.watch_style_name),
            clasp_type: reference(self.clasp_type_id, self.clasp_type_name),
            case_diameter_mm: self.case_diameter_mm,
            case_thickness_mm: self.case_thickness_mm,
            details: ProductDetails {
                description: self.description,
                short_description: self.short_description,
                gender: self.gender.and_then(|g| g.parse().ok()),
                year_of_production: self.year_of_production,
                case_shape: self.case_shape,
                case_back: self.case_back,
                water_resistance_m: self.water_resistance_m,
                dial_numerals: self.dial_numerals,
                crystal: self.crystal,
                bezel_material: self.bezel_material,
                bezel_type: self.bezel_type,
                bracelet_material: self.bracelet_material,
                bracelet_color: self.bracelet_color,
                lug_width_mm: self.lug_width_mm,
                movement_type: self.movement_type,
                caliber: self.caliber,
                power_reserve_hours: self.power_reserve_hours,
                jewels: self.jewels,
                frequency_bph: self.frequency_bph,
                condition: self.condition,
                has_box: self.has_box,
                has_papers: self.has_papers,
                service_history: self.service_history,
                provenance_notes: self.provenance_notes,
                meta_title: self.meta_title,
                meta_description: self.meta_description,
            },
            primary_image_url: self.primary_image_url,
            images: Vec::new(),
            complications: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
