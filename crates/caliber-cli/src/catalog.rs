//! Catalog command handlers: bulk import and a plain-text product listing.
//!
//! Import keeps going past conflicts and invalid payloads so one bad row does
//! not abort a batch; storage failures still stop the run.

use std::path::Path;

use anyhow::Context;
use caliber_core::{Product, ProductFilter, ProductInput, SortKey};
use caliber_db::DbError;

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ImportReport {
    pub created: usize,
    pub conflicted: usize,
    pub invalid: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created {}, conflicted {}, invalid {}",
            self.created, self.conflicted, self.invalid
        )
    }
}

/// Parse an import file: a JSON array of product payloads.
pub(crate) fn parse_import(raw: &str) -> anyhow::Result<Vec<ProductInput>> {
    serde_json::from_str(raw).context("import file must be a JSON array of product objects")
}

/// Create every product in `file`, reporting each outcome.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a storage
/// failure other than a conflict or validation error occurs.
pub(crate) async fn run_import(pool: &sqlx::PgPool, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let inputs = parse_import(&raw)?;

    let mut report = ImportReport::default();
    for (index, input) in inputs.iter().enumerate() {
        let label = input.model_number.as_deref().unwrap_or("<no model number>");
        match caliber_db::create_product(pool, input).await {
            Ok(product) => {
                report.created += 1;
                println!("[{index}] created {} ({})", product.sku, product.slug);
            }
            Err(DbError::Conflict(message)) => {
                report.conflicted += 1;
                tracing::warn!(index, model_number = label, %message, "import conflict");
                println!("[{index}] conflict: {message}");
            }
            Err(DbError::Validation(violations)) => {
                report.invalid += 1;
                let joined = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                println!("[{index}] invalid {label}: {joined}");
            }
            Err(other) => {
                return Err(anyhow::Error::new(other)
                    .context(format!("import stopped at item {index} ({label})")));
            }
        }
    }

    println!("import finished: {report}");
    Ok(())
}

/// One listing line: `SKU  effective-price currency  name [brand]`.
pub(crate) fn format_line(product: &Product) -> String {
    format!(
        "{:<20} {:>12} {}  {} [{}]",
        product.sku,
        product.effective_price(),
        product.currency,
        product.name,
        product.brand.name
    )
}

/// Print published products, optionally restricted to some brands.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_list(
    pool: &sqlx::PgPool,
    brand_ids: Vec<i64>,
    sort: Option<&str>,
) -> anyhow::Result<()> {
    let filter = ProductFilter {
        brand_ids,
        ..ProductFilter::default()
    };
    let products =
        caliber_db::list_products(pool, &filter, SortKey::parse_or_default(sort)).await?;

    if products.is_empty() {
        println!("no published products");
        return Ok(());
    }
    for product in &products {
        println!("{}", format_line(product));
    }
    println!("{} product(s)", products.len());
    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
