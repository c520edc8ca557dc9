//! Read operations for products.

use caliber_core::{Product, ProductFilter, ProductStatus, Reference, SortKey};
use sqlx::{PgConnection, PgPool};

use super::types::{product_select, ImageRow, ProductRow};
use crate::DbError;

/// Upper bound on the featured listing; larger requests are capped.
pub const MAX_FEATURED_LIMIT: i64 = 48;

/// Published products matching `filter`, ordered by `sort`.
///
/// Ties on the sort key fall back to `created_at DESC, id DESC` so paging
/// stays stable. Images and complications are not loaded; each product
/// carries `primary_image_url` instead.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
    sort: SortKey,
) -> Result<Vec<Product>, DbError> {
    let genders: Vec<&str> = filter.genders.iter().map(|g| g.as_str()).collect();
    let conditions: Vec<String> = filter
        .conditions
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();

    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE p.status = 'published' \
           AND (cardinality($1::BIGINT[]) = 0 OR p.brand_id = ANY($1)) \
           AND (cardinality($2::TEXT[]) = 0 OR p.gender = ANY($2)) \
           AND (cardinality($3::BIGINT[]) = 0 OR p.watch_style_id = ANY($3)) \
           AND (cardinality($4::TEXT[]) = 0 OR LOWER(p.condition) = ANY($4)) \
           AND ($5::NUMERIC IS NULL OR p.price >= $5) \
           AND ($6::NUMERIC IS NULL OR p.price <= $6) \
         ORDER BY \
           CASE WHEN $7::TEXT = 'price_asc' THEN p.price END ASC, \
           CASE WHEN $7::TEXT = 'price_desc' THEN p.price END DESC, \
           p.created_at DESC, p.id DESC"
    ))
    .bind(&filter.brand_ids)
    .bind(&genders)
    .bind(&filter.watch_style_ids)
    .bind(&conditions)
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(sort.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_product).collect())
}

/// Detail lookup for shoppers. Drafts and archived products are invisible.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_published_product_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<Product>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE p.slug = $1 AND p.status = 'published'"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut conn = pool.acquire().await?;
    Ok(Some(with_children(&mut conn, row).await?))
}

/// Admin lookup by id, regardless of status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<Product>, DbError> {
    let mut conn = pool.acquire().await?;
    get_product_on(&mut conn, id).await
}

pub(crate) async fn get_product_on(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Product>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(concat!(product_select!(), "WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(with_children(conn, row).await?)),
        None => Ok(None),
    }
}

/// Every product, optionally restricted to one status, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_admin_products(
    pool: &PgPool,
    status: Option<ProductStatus>,
) -> Result<Vec<Product>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE ($1::TEXT IS NULL OR p.status = $1) \
         ORDER BY p.created_at DESC, p.id DESC"
    ))
    .bind(status.map(ProductStatus::as_str))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_product).collect())
}

/// Published, featured products, newest first, at most
/// [`MAX_FEATURED_LIMIT`] of them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_featured_products(pool: &PgPool, limit: i64) -> Result<Vec<Product>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE p.status = 'published' AND p.is_featured \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $1"
    ))
    .bind(limit.clamp(0, MAX_FEATURED_LIMIT))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_product).collect())
}

async fn with_children(conn: &mut PgConnection, row: ProductRow) -> Result<Product, DbError> {
    let mut product = row.into_product();

    let images = sqlx::query_as::<_, ImageRow>(
        "SELECT id, product_id, url, thumbnail_url, hover_url, cover_url, alt_text, \
                is_primary, display_order \
         FROM product_images \
         WHERE product_id = $1 \
         ORDER BY display_order, id",
    )
    .bind(product.id)
    .fetch_all(&mut *conn)
    .await?;

    let complications = sqlx::query_as::<_, (i64, String)>(
        "SELECT c.id, c.name \
         FROM product_complications pc \
         JOIN complications c ON c.id = pc.complication_id \
         WHERE pc.product_id = $1 \
         ORDER BY LOWER(c.name), c.id",
    )
    .bind(product.id)
    .fetch_all(&mut *conn)
    .await?;

    product.images = images.into_iter().map(Into::into).collect();
    product.complications = complications
        .into_iter()
        .map(|(id, name)| Reference { id, name })
        .collect();
    Ok(product)
}
