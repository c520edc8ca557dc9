//! Find-or-create for the reference tables (`brands`, `materials`, `colors`,
//! `watch_styles`, `clasp_types`, `complications`).
//!
//! Every table carries a unique index on `LOWER(name)`, so a lookup is a
//! case-insensitive exact match and concurrent creators of the same name
//! converge on one row.

use caliber_core::{Reference, ReferenceKind, TaxonomyFile};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

fn select_sql(kind: ReferenceKind) -> String {
    format!(
        "SELECT id FROM {} WHERE LOWER(name) = LOWER($1)",
        kind.table()
    )
}

fn insert_sql(kind: ReferenceKind) -> String {
    format!(
        "INSERT INTO {} (name) VALUES ($1) \
         ON CONFLICT (LOWER(name)) DO NOTHING \
         RETURNING id",
        kind.table()
    )
}

/// Resolve `name` to the id of a `kind` row, creating it if needed.
///
/// Blank or absent names resolve to `None` without touching the database.
/// Runs on the given connection, so passing `&mut *tx` keeps a created row
/// inside the caller's transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn resolve_on(
    conn: &mut PgConnection,
    kind: ReferenceKind,
    name: Option<&str>,
) -> Result<Option<i64>, DbError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    let select = select_sql(kind);
    if let Some(id) = sqlx::query_scalar::<_, i64>(&select)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok(Some(id));
    }

    let inserted = sqlx::query_scalar::<_, i64>(&insert_sql(kind))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = inserted {
        tracing::debug!(kind = %kind, name, id, "created reference entity");
        return Ok(Some(id));
    }

    // Lost the race to a concurrent insert; the row exists now.
    let id = sqlx::query_scalar::<_, i64>(&select)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(Some(id))
}

/// Pool-backed [`resolve_on`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a connection cannot be acquired or a query
/// fails.
pub async fn resolve(
    pool: &PgPool,
    kind: ReferenceKind,
    name: Option<&str>,
) -> Result<Option<i64>, DbError> {
    if name.is_none_or(|n| n.trim().is_empty()) {
        return Ok(None);
    }
    let mut conn = pool.acquire().await?;
    resolve_on(&mut conn, kind, name).await
}

/// All rows of one reference kind, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reference_entities(
    pool: &PgPool,
    kind: ReferenceKind,
) -> Result<Vec<Reference>, DbError> {
    let sql = format!(
        "SELECT id, name FROM {} ORDER BY LOWER(name), id",
        kind.table()
    );
    let rows = sqlx::query_as::<_, (i64, String)>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Reference { id, name })
        .collect())
}

/// Resolve every name in a taxonomy file inside one transaction.
///
/// Returns the number of names processed. Names that already exist (in any
/// casing) are left as they are.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed in
/// that case.
pub async fn seed_taxonomy(pool: &PgPool, taxonomy: &TaxonomyFile) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut processed = 0;

    for kind in ReferenceKind::ALL {
        for name in taxonomy.names(kind) {
            resolve_on(&mut *tx, kind, Some(name)).await?;
            processed += 1;
        }
    }

    tx.commit().await?;
    tracing::info!(processed, "taxonomy seeded");
    Ok(processed)
}
