//! "You may also like" selection for a product detail page.

use caliber_core::Product;
use sqlx::PgPool;

use crate::products::{product_select, ProductRow};
use crate::DbError;

/// Upper bound on `limit`; larger requests are clamped.
pub const MAX_RECOMMENDATIONS: i64 = 24;

/// Published products related to `product`, best match first.
///
/// A candidate must share at least one of brand, gender or watch style.
/// Same-brand candidates rank ahead of same-gender ones, which rank ahead of
/// same-style ones; remaining ties go to the newest. A `limit` of zero or less
/// selects nothing; larger values are capped at `MAX_RECOMMENDATIONS`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recommend(
    pool: &PgPool,
    product: &Product,
    limit: i64,
) -> Result<Vec<Product>, DbError> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    let limit = limit.min(MAX_RECOMMENDATIONS);
    let gender = product.details.gender.map(|g| g.as_str());
    let watch_style_id = product.watch_style.as_ref().map(|s| s.id);

    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE p.status = 'published' \
           AND p.id <> $1 \
           AND (p.brand_id = $2 \
                OR ($3::TEXT IS NOT NULL AND p.gender = $3) \
                OR ($4::BIGINT IS NOT NULL AND p.watch_style_id = $4)) \
         ORDER BY \
           (p.brand_id = $2) DESC, \
           COALESCE(p.gender = $3, FALSE) DESC, \
           COALESCE(p.watch_style_id = $4, FALSE) DESC, \
           p.created_at DESC, p.id DESC \
         LIMIT $5"
    ))
    .bind(product.id)
    .bind(product.brand.id)
    .bind(gender)
    .bind(watch_style_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_product).collect())
}
