//! Write operations for products: create, full update and status changes.
//!
//! Create and update share one path. Validation runs before any statement is
//! issued; everything after it (reference resolution included) happens in a
//! single transaction, so a conflict half-way through leaves no trace.

use std::collections::BTreeSet;

use caliber_core::{
    naming, FieldViolation, NewImage, Product, ProductInput, ProductStatus, ReferenceKind,
    ValidProduct,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use super::read::get_product_on;
use crate::reference::resolve_on;
use crate::{is_unique_violation, DbError};

/// Reference ids resolved for one write.
struct ResolvedRefs {
    brand_id: i64,
    case_material_id: Option<i64>,
    dial_color_id: Option<i64>,
    watch_style_id: Option<i64>,
    clasp_type_id: Option<i64>,
}

/// Create a product from an admin payload.
///
/// # Errors
///
/// - [`DbError::Validation`] when the payload is malformed (nothing written).
/// - [`DbError::Conflict`] when the model number, a supplied slug, or a
///   concurrently inserted identity is already taken.
/// - [`DbError::Sqlx`] for any other storage failure.
pub async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<Product, DbError> {
    let valid = input.validate().map_err(DbError::Validation)?;

    let mut tx = pool.begin().await?;
    let id = persist(&mut *tx, None, &valid).await?;
    let product = get_product_on(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
    tx.commit().await?;

    tracing::info!(product_id = id, sku = %product.sku, "product created");
    Ok(product)
}

/// Replace every field of product `id` with the payload.
///
/// `images` / `complications` left out of the payload keep their current
/// rows; supplying a list (even an empty one) replaces them.
///
/// # Errors
///
/// As [`create_product`], plus [`DbError::NotFound`] when `id` does not exist.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    input: &ProductInput,
) -> Result<Product, DbError> {
    let valid = input.validate().map_err(DbError::Validation)?;

    let mut tx = pool.begin().await?;
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(DbError::NotFound);
    }

    persist(&mut *tx, Some(id), &valid).await?;
    let product = get_product_on(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
    tx.commit().await?;

    tracing::info!(product_id = id, sku = %product.sku, "product updated");
    Ok(product)
}

/// Move product `id` to `status`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn set_product_status(
    pool: &PgPool,
    id: i64,
    status: ProductStatus,
) -> Result<Product, DbError> {
    let mut tx = pool.begin().await?;
    let updated = sqlx::query_scalar::<_, i64>(
        "UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&mut *tx)
    .await?;
    if updated.is_none() {
        return Err(DbError::NotFound);
    }

    let product = get_product_on(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
    tx.commit().await?;

    tracing::info!(product_id = id, status = %status, "product status changed");
    Ok(product)
}

/// Steps shared by create and update. `existing` is the id being updated.
async fn persist(
    conn: &mut PgConnection,
    existing: Option<i64>,
    valid: &ValidProduct,
) -> Result<i64, DbError> {
    ensure_model_number_free(conn, existing, &valid.model_number).await?;
    let sku = choose_sku(conn, existing, valid).await?;
    let refs = resolve_refs(conn, valid).await?;
    let complication_ids = if valid.replaces_complications() {
        Some(collect_complications(conn, valid).await?)
    } else {
        None
    };
    let slug = choose_slug(conn, existing, valid).await?;

    let id = match existing {
        None => insert_row(conn, valid, &refs, &sku, &slug).await,
        Some(id) => update_row(conn, id, valid, &refs, &sku, &slug).await,
    }
    .map_err(identity_conflict)?;

    if let Some(ids) = complication_ids {
        replace_complications(conn, id, &ids).await?;
    }
    if let Some(images) = &valid.images {
        replace_images(conn, id, images).await?;
    }
    Ok(id)
}

/// Map a unique violation raised by the insert/update itself to `Conflict`.
fn identity_conflict(err: sqlx::Error) -> DbError {
    if is_unique_violation(&err) {
        let constraint = match &err {
            sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or("unique").to_string(),
            _ => "unique".to_string(),
        };
        return DbError::Conflict(format!(
            "product conflicts with an existing product ({constraint})"
        ));
    }
    DbError::Sqlx(err)
}

async fn ensure_model_number_free(
    conn: &mut PgConnection,
    existing: Option<i64>,
    model_number: &str,
) -> Result<(), DbError> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM products \
         WHERE model_number = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
    )
    .bind(model_number)
    .bind(existing)
    .fetch_optional(&mut *conn)
    .await?;

    if taken.is_some() {
        return Err(DbError::Conflict(format!(
            "a product with model number '{model_number}' already exists"
        )));
    }
    Ok(())
}

async fn column_taken(
    conn: &mut PgConnection,
    existing: Option<i64>,
    sql: &'static str,
    value: &str,
) -> Result<bool, DbError> {
    let taken = sqlx::query_scalar::<_, bool>(sql)
        .bind(value)
        .bind(existing)
        .fetch_one(&mut *conn)
        .await?;
    Ok(taken)
}

const SKU_TAKEN: &str = "SELECT EXISTS (SELECT 1 FROM products \
                          WHERE sku = $1 AND ($2::BIGINT IS NULL OR id <> $2))";
const SLUG_TAKEN: &str = "SELECT EXISTS (SELECT 1 FROM products \
                           WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))";

async fn choose_sku(
    conn: &mut PgConnection,
    existing: Option<i64>,
    valid: &ValidProduct,
) -> Result<String, DbError> {
    let sku = valid
        .sku
        .clone()
        .unwrap_or_else(|| naming::derive_sku(&valid.brand, &valid.model_number));

    if !column_taken(conn, existing, SKU_TAKEN, &sku).await? {
        return Ok(sku);
    }
    let fallback = naming::disambiguate_sku(&sku, Utc::now());
    tracing::warn!(sku = %sku, fallback = %fallback, "SKU taken, appending timestamp suffix");
    Ok(fallback)
}

async fn choose_slug(
    conn: &mut PgConnection,
    existing: Option<i64>,
    valid: &ValidProduct,
) -> Result<String, DbError> {
    if let Some(slug) = &valid.slug {
        if column_taken(conn, existing, SLUG_TAKEN, slug).await? {
            return Err(DbError::Conflict(format!(
                "a product with slug '{slug}' already exists"
            )));
        }
        return Ok(slug.clone());
    }

    let slug = naming::default_slug(&valid.name, &valid.model_number);
    if !column_taken(conn, existing, SLUG_TAKEN, &slug).await? {
        return Ok(slug);
    }
    let fallback = naming::slug_with_model_suffix(&slug, &valid.model_number);
    if column_taken(conn, existing, SLUG_TAKEN, &fallback).await? {
        return Err(DbError::Conflict(format!(
            "slugs '{slug}' and '{fallback}' are both taken"
        )));
    }
    tracing::warn!(slug = %slug, fallback = %fallback, "slug taken, appending model number");
    Ok(fallback)
}

async fn resolve_refs(conn: &mut PgConnection, valid: &ValidProduct) -> Result<ResolvedRefs, DbError> {
    let brand_id = resolve_on(conn, ReferenceKind::Brand, Some(&valid.brand))
        .await?
        .ok_or_else(|| {
            DbError::Validation(vec![FieldViolation::new("brand", "is required")])
        })?;

    Ok(ResolvedRefs {
        brand_id,
        case_material_id: resolve_on(conn, ReferenceKind::Material, valid.case_material.as_deref())
            .await?,
        dial_color_id: resolve_on(conn, ReferenceKind::Color, valid.dial_color.as_deref()).await?,
        watch_style_id: resolve_on(conn, ReferenceKind::WatchStyle, valid.watch_style.as_deref())
            .await?,
        clasp_type_id: resolve_on(conn, ReferenceKind::ClaspType, valid.clasp_type.as_deref())
            .await?,
    })
}

/// Union of explicit complication ids and resolved complication names,
/// deduplicated. Unknown ids are reported as a validation error.
async fn collect_complications(
    conn: &mut PgConnection,
    valid: &ValidProduct,
) -> Result<Vec<i64>, DbError> {
    let mut ids: BTreeSet<i64> = valid.complication_ids.iter().flatten().copied().collect();

    if !ids.is_empty() {
        let requested: Vec<i64> = ids.iter().copied().collect();
        let known: BTreeSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM complications WHERE id = ANY($1::BIGINT[])",
        )
        .bind(&requested)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .collect();

        let unknown: Vec<FieldViolation> = requested
            .iter()
            .filter(|id| !known.contains(*id))
            .map(|id| FieldViolation::new("complication_ids", format!("unknown complication id {id}")))
            .collect();
        if !unknown.is_empty() {
            return Err(DbError::Validation(unknown));
        }
    }

    for name in valid.complication_names.iter().flatten() {
        if let Some(id) = resolve_on(conn, ReferenceKind::Complication, Some(name)).await? {
            ids.insert(id);
        }
    }
    Ok(ids.into_iter().collect())
}

async fn insert_row(
    conn: &mut PgConnection,
    valid: &ValidProduct,
    refs: &ResolvedRefs,
    sku: &str,
    slug: &str,
) -> Result<i64, sqlx::Error> {
    let d = &valid.details;
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (name, model_number, sku, slug, price, discount_price, currency, \
              stock_quantity, availability, status, is_featured, \
              brand_id, case_material_id, dial_color_id, watch_style_id, clasp_type_id, \
              case_diameter_mm, case_thickness_mm, \
              description, short_description, gender, year_of_production, \
              case_shape, case_back, water_resistance_m, dial_numerals, crystal, \
              bezel_material, bezel_type, bracelet_material, bracelet_color, lug_width_mm, \
              movement_type, caliber, power_reserve_hours, jewels, frequency_bph, \
              condition, has_box, has_papers, service_history, provenance_notes, \
              meta_title, meta_description) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
                 $12, $13, $14, $15, $16, $17, $18, \
                 $19, $20, $21, $22, $23, $24, $25, $26, $27, \
                 $28, $29, $30, $31, $32, $33, $34, $35, $36, $37, \
                 $38, $39, $40, $41, $42, $43, $44) \
         RETURNING id",
    )
    .bind(&valid.name)
    .bind(&valid.model_number)
    .bind(sku)
    .bind(slug)
    .bind(valid.price)
    .bind(valid.discount_price)
    .bind(&valid.currency)
    .bind(valid.stock_quantity)
    .bind(&valid.availability)
    .bind(valid.status.as_str())
    .bind(valid.is_featured)
    .bind(refs.brand_id)
    .bind(refs.case_material_id)
    .bind(refs.dial_color_id)
    .bind(refs.watch_style_id)
    .bind(refs.clasp_type_id)
    .bind(valid.case_diameter_mm)
    .bind(valid.case_thickness_mm)
    .bind(&d.description)
    .bind(&d.short_description)
    .bind(d.gender.map(|g| g.as_str()))
    .bind(d.year_of_production)
    .bind(&d.case_shape)
    .bind(&d.case_back)
    .bind(d.water_resistance_m)
    .bind(&d.dial_numerals)
    .bind(&d.crystal)
    .bind(&d.bezel_material)
    .bind(&d.bezel_type)
    .bind(&d.bracelet_material)
    .bind(&d.bracelet_color)
    .bind(d.lug_width_mm)
    .bind(&d.movement_type)
    .bind(&d.caliber)
    .bind(d.power_reserve_hours)
    .bind(d.jewels)
    .bind(d.frequency_bph)
    .bind(&d.condition)
    .bind(d.has_box)
    .bind(d.has_papers)
    .bind(&d.service_history)
    .bind(&d.provenance_notes)
    .bind(&d.meta_title)
    .bind(&d.meta_description)
    .fetch_one(&mut *conn)
    .await
}

async fn update_row(
    conn: &mut PgConnection,
    id: i64,
    valid: &ValidProduct,
    refs: &ResolvedRefs,
    sku: &str,
    slug: &str,
) -> Result<i64, sqlx::Error> {
    let d = &valid.details;
    sqlx::query_scalar::<_, i64>(
        "UPDATE products SET \
             name = $2, model_number = $3, sku = $4, slug = $5, \
             price = $6, discount_price = $7, currency = $8, \
             stock_quantity = $9, availability = $10, status = $11, is_featured = $12, \
             brand_id = $13, case_material_id = $14, dial_color_id = $15, \
             watch_style_id = $16, clasp_type_id = $17, \
             case_diameter_mm = $18, case_thickness_mm = $19, \
             description = $20, short_description = $21, gender = $22, \
             year_of_production = $23, case_shape = $24, case_back = $25, \
             water_resistance_m = $26, dial_numerals = $27, crystal = $28, \
             bezel_material = $29, bezel_type = $30, bracelet_material = $31, \
             bracelet_color = $32, lug_width_mm = $33, movement_type = $34, \
             caliber = $35, power_reserve_hours = $36, jewels = $37, \
             frequency_bph = $38, condition = $39, has_box = $40, has_papers = $41, \
             service_history = $42, provenance_notes = $43, \
             meta_title = $44, meta_description = $45, \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(&valid.name)
    .bind(&valid.model_number)
    .bind(sku)
    .bind(slug)
    .bind(valid.price)
    .bind(valid.discount_price)
    .bind(&valid.currency)
    .bind(valid.stock_quantity)
    .bind(&valid.availability)
    .bind(valid.status.as_str())
    .bind(valid.is_featured)
    .bind(refs.brand_id)
    .bind(refs.case_material_id)
    .bind(refs.dial_color_id)
    .bind(refs.watch_style_id)
    .bind(refs.clasp_type_id)
    .bind(valid.case_diameter_mm)
    .bind(valid.case_thickness_mm)
    .bind(&d.description)
    .bind(&d.short_description)
    .bind(d.gender.map(|g| g.as_str()))
    .bind(d.year_of_production)
    .bind(&d.case_shape)
    .bind(&d.case_back)
    .bind(d.water_resistance_m)
    .bind(&d.dial_numerals)
    .bind(&d.crystal)
    .bind(&d.bezel_material)
    .bind(&d.bezel_type)
    .bind(&d.bracelet_material)
    .bind(&d.bracelet_color)
    .bind(d.lug_width_mm)
    .bind(&d.movement_type)
    .bind(&d.caliber)
    .bind(d.power_reserve_hours)
    .bind(d.jewels)
    .bind(d.frequency_bph)
    .bind(&d.condition)
    .bind(d.has_box)
    .bind(d.has_papers)
    .bind(&d.service_history)
    .bind(&d.provenance_notes)
    .bind(&d.meta_title)
    .bind(&d.meta_description)
    .fetch_one(&mut *conn)
    .await
}

async fn replace_complications(
    conn: &mut PgConnection,
    product_id: i64,
    complication_ids: &[i64],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_complications WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if complication_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO product_complications (product_id, complication_id) \
         SELECT $1, * FROM UNNEST($2::BIGINT[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(product_id)
    .bind(complication_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Images are stored in the supplied order; the first is always primary.
async fn replace_images(
    conn: &mut PgConnection,
    product_id: i64,
    images: &[NewImage],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if images.is_empty() {
        return Ok(());
    }

    let mut urls: Vec<&str> = Vec::with_capacity(images.len());
    let mut thumbnails: Vec<Option<&str>> = Vec::with_capacity(images.len());
    let mut hovers: Vec<Option<&str>> = Vec::with_capacity(images.len());
    let mut covers: Vec<Option<&str>> = Vec::with_capacity(images.len());
    let mut alts: Vec<Option<&str>> = Vec::with_capacity(images.len());
    let mut primaries: Vec<bool> = Vec::with_capacity(images.len());
    let mut orders: Vec<i32> = Vec::with_capacity(images.len());

    for (index, image) in images.iter().enumerate() {
        urls.push(&image.url);
        thumbnails.push(image.thumbnail_url.as_deref());
        hovers.push(image.hover_url.as_deref());
        covers.push(image.cover_url.as_deref());
        alts.push(image.alt_text.as_deref());
        primaries.push(index == 0);
        orders.push(i32::try_from(index).unwrap_or(i32::MAX));
    }

    sqlx::query(
        "INSERT INTO product_images \
             (product_id, url, thumbnail_url, hover_url, cover_url, alt_text, \
              is_primary, display_order) \
         SELECT $1, * FROM UNNEST(\
              $2::TEXT[], $3::TEXT[], $4::TEXT[], $5::TEXT[], $6::TEXT[], \
              $7::BOOLEAN[], $8::INTEGER[])",
    )
    .bind(product_id)
    .bind(&urls)
    .bind(&thumbnails)
    .bind(&hovers)
    .bind(&covers)
    .bind(&alts)
    .bind(&primaries)
    .bind(&orders)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
