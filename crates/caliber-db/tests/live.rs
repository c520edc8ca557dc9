//! Live integration tests for caliber-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/caliber-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use caliber_core::{
    Gender, ProductFilter, ProductInput, ProductStatus, ReferenceKind, SortKey, TaxonomyFile,
};
use caliber_db::{
    create_product, get_product, get_published_product_by_slug, list_admin_products,
    list_featured_products, list_products, list_reference_entities, recommend, resolve,
    resolve_on, seed_taxonomy, set_product_status, update_product, DbError,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn input(value: serde_json::Value) -> ProductInput {
    serde_json::from_value(value).expect("test payload deserializes")
}

fn submariner() -> ProductInput {
    input(json!({
        "name": "Rolex Submariner Date",
        "model_number": "126610LN",
        "brand": "Rolex",
        "price": 10500
    }))
}

/// Create a published product with the given identity and facets.
async fn published(
    pool: &sqlx::PgPool,
    model: &str,
    brand: &str,
    price: &str,
    gender: Option<&str>,
    style: Option<&str>,
) -> caliber_core::Product {
    let payload = input(json!({
        "name": format!("{brand} {model}"),
        "model_number": model,
        "brand": brand,
        "price": price,
        "status": "published",
        "gender": gender,
        "watch_style": style,
    }));
    create_product(pool, &payload)
        .await
        .unwrap_or_else(|e| panic!("create_product failed for {model}: {e}"))
}

async fn count(pool: &sqlx::PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

// ---------------------------------------------------------------------------
// Section 1: Resolver
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn resolver_is_case_insensitive_and_idempotent(pool: sqlx::PgPool) {
    let first = resolve(&pool, ReferenceKind::Brand, Some("Rolex"))
        .await
        .expect("resolve failed");
    let second = resolve(&pool, ReferenceKind::Brand, Some("rolex"))
        .await
        .expect("resolve failed");
    let third = resolve(&pool, ReferenceKind::Brand, Some("  ROLEX "))
        .await
        .expect("resolve failed");

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 1);

    let brands = list_reference_entities(&pool, ReferenceKind::Brand)
        .await
        .expect("list failed");
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0].name, "Rolex", "original casing is preserved");
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolver_recovers_from_a_lost_insert_race(pool: sqlx::PgPool) {
    let mut tx = pool.begin().await.expect("begin failed");
    let first = resolve_on(&mut *tx, ReferenceKind::Brand, Some("Rolex"))
        .await
        .expect("resolve in transaction failed");

    let racer = {
        let pool = pool.clone();
        tokio::spawn(async move { resolve(&pool, ReferenceKind::Brand, Some("ROLEX")).await })
    };

    // Wait until the second insert blocks on the uncommitted index entry.
    for _ in 0..100 {
        let waiting = count(&pool, "SELECT COUNT(*) FROM pg_locks WHERE NOT granted").await;
        if waiting > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    tx.commit().await.expect("commit failed");
    let second = racer
        .await
        .expect("task panicked")
        .expect("racing resolve failed");

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn resolver_skips_blank_names(pool: sqlx::PgPool) {
    assert_eq!(
        resolve(&pool, ReferenceKind::Color, None).await.expect("resolve"),
        None
    );
    assert_eq!(
        resolve(&pool, ReferenceKind::Color, Some("   "))
            .await
            .expect("resolve"),
        None
    );
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM colors").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_taxonomy_resolves_every_name(pool: sqlx::PgPool) {
    let taxonomy = TaxonomyFile {
        brands: vec!["Rolex".into(), "Omega".into()],
        watch_styles: vec!["Diver".into()],
        complications: vec!["Date".into(), "Chronograph".into()],
        ..TaxonomyFile::default()
    };

    let processed = seed_taxonomy(&pool, &taxonomy).await.expect("seed failed");
    assert_eq!(processed, 5);
    // Re-seeding is a no-op.
    seed_taxonomy(&pool, &taxonomy).await.expect("re-seed failed");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM complications").await, 2);

    let styles = list_reference_entities(&pool, ReferenceKind::WatchStyle)
        .await
        .expect("list failed");
    assert_eq!(styles[0].name, "Diver");
}

// ---------------------------------------------------------------------------
// Section 2: Writer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_product_derives_sku_slug_and_status(pool: sqlx::PgPool) {
    let product = create_product(&pool, &submariner())
        .await
        .expect("create_product failed");

    assert_eq!(product.sku, "ROL-126610LN");
    assert_eq!(product.slug, "rolex-submariner-date");
    assert_eq!(product.status, ProductStatus::Draft);
    assert_eq!(product.brand.name, "Rolex");
    assert_eq!(product.currency, "USD");
    assert_eq!(product.price.to_string(), "10500.00");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn non_latin_name_is_accepted_and_slugged(pool: sqlx::PgPool) {
    let product = create_product(
        &pool,
        &input(json!({
            "name": "グランドセイコー",
            "model_number": "SBGA211",
            "brand": "Grand Seiko",
            "price": "5800"
        })),
    )
    .await
    .expect("create failed");

    assert_eq!(product.name, "グランドセイコー");
    assert_eq!(product.slug, "グランドセイコー");
    assert_eq!(product.sku, "GRA-SBGA211");

    let symbols = create_product(
        &pool,
        &input(json!({
            "name": "★★★",
            "model_number": "SBGA413",
            "brand": "Grand Seiko",
            "price": "6100"
        })),
    )
    .await
    .expect("create failed");
    assert_eq!(symbols.slug, "sbga413");
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_model_number_is_a_conflict(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("first create failed");

    let err = create_product(&pool, &submariner())
        .await
        .expect_err("second create must conflict");
    match err {
        DbError::Conflict(message) => assert!(message.contains("126610LN")),
        other => panic!("expected Conflict, got {other:?}"),
    }
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn conflict_rolls_back_resolved_references(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("first create failed");

    let clash = input(json!({
        "name": "Black Bay 58",
        "model_number": "M79030N",
        "brand": "Tudor",
        "dial_color": "Midnight Blue",
        "price": "4150.00",
        "slug": "rolex-submariner-date"
    }));
    let err = create_product(&pool, &clash)
        .await
        .expect_err("taken slug must conflict");
    assert!(matches!(err, DbError::Conflict(_)));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM colors").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM products").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn validation_errors_write_nothing(pool: sqlx::PgPool) {
    let bad = input(json!({ "name": "No Price", "brand": "Omega" }));
    let err = create_product(&pool, &bad)
        .await
        .expect_err("missing fields must fail");
    match err {
        DbError::Validation(violations) => {
            let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
            assert_eq!(fields, vec!["model_number", "price"]);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn colliding_sku_gets_timestamp_suffix(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("first create failed");

    let twin = input(json!({
        "name": "Submariner No Date",
        "model_number": "124060",
        "brand": "Rolex",
        "sku": "ROL-126610LN",
        "price": 9100
    }));
    let product = create_product(&pool, &twin).await.expect("create failed");

    let suffix = product
        .sku
        .strip_prefix("ROL-126610LN-")
        .expect("sku keeps the original as prefix");
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_digit()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn colliding_derived_slug_gets_model_suffix(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("first create failed");

    let same_name = input(json!({
        "name": "Rolex Submariner Date",
        "model_number": "126613LB",
        "brand": "Rolex",
        "price": 14800
    }));
    let product = create_product(&pool, &same_name)
        .await
        .expect("create failed");
    assert_eq!(product.slug, "rolex-submariner-date-126613lb");
}

#[sqlx::test(migrations = "../../migrations")]
async fn images_keep_order_and_first_is_primary(pool: sqlx::PgPool) {
    let payload = input(json!({
        "name": "Speedmaster Professional",
        "model_number": "310.30.42.50.01.001",
        "brand": "Omega",
        "price": "7000.00",
        "complications": ["Chronograph", "chronograph", "Tachymeter"],
        "images": [
            { "url": "https://cdn.example.com/front.jpg", "is_primary": false },
            { "url": "https://cdn.example.com/back.jpg", "is_primary": true },
            { "url": "https://cdn.example.com/side.jpg" }
        ]
    }));
    let product = create_product(&pool, &payload).await.expect("create failed");

    let urls: Vec<_> = product.images.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://cdn.example.com/front.jpg",
            "https://cdn.example.com/back.jpg",
            "https://cdn.example.com/side.jpg",
        ]
    );
    assert!(product.images[0].is_primary);
    assert!(!product.images[1].is_primary);
    assert_eq!(product.images[2].display_order, 2);
    assert_eq!(product.complications.len(), 2, "duplicates collapse");
    assert_eq!(
        product.primary_image_url.as_deref(),
        Some("https://cdn.example.com/front.jpg")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_complication_id_is_rejected(pool: sqlx::PgPool) {
    let payload = input(json!({
        "name": "Royal Oak",
        "model_number": "15500ST",
        "brand": "Audemars Piguet",
        "price": 35000,
        "complication_ids": [999_999]
    }));
    let err = create_product(&pool, &payload)
        .await
        .expect_err("unknown complication must fail");
    assert!(matches!(err, DbError::Validation(_)));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM brands").await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_replaces_fields_and_keeps_absent_images(pool: sqlx::PgPool) {
    let mut payload = submariner();
    payload.images = Some(vec![caliber_core::ImageInput {
        url: "https://cdn.example.com/sub.jpg".to_string(),
        ..caliber_core::ImageInput::default()
    }]);
    let created = create_product(&pool, &payload).await.expect("create failed");

    let update = input(json!({
        "name": "Rolex Submariner Date",
        "model_number": "126610LN",
        "brand": "Rolex",
        "price": "11000.00",
        "discount_price": "10750.00",
        "status": "published"
    }));
    let updated = update_product(&pool, created.id, &update)
        .await
        .expect("update failed");

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.sku, "ROL-126610LN", "own SKU is not a collision");
    assert_eq!(updated.slug, "rolex-submariner-date");
    assert_eq!(updated.price, Decimal::from_str("11000.00").unwrap());
    assert_eq!(updated.status, ProductStatus::Published);
    assert_eq!(updated.images.len(), 1);
    assert!(updated.updated_at >= created.updated_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_conflicts_on_another_products_model_number(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("create failed");
    let other = published(&pool, "5711/1A", "Patek Philippe", "120000", None, None).await;

    let err = update_product(&pool, other.id, &submariner())
        .await
        .expect_err("model number belongs to another product");
    assert!(matches!(err, DbError::Conflict(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_and_status_report_missing_ids(pool: sqlx::PgPool) {
    let err = update_product(&pool, 4242, &submariner())
        .await
        .expect_err("missing id");
    assert!(matches!(err, DbError::NotFound));

    let err = set_product_status(&pool, 4242, ProductStatus::Published)
        .await
        .expect_err("missing id");
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 3: Reader
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn drafts_are_hidden_until_published(pool: sqlx::PgPool) {
    let draft = create_product(&pool, &submariner())
        .await
        .expect("create failed");

    assert!(get_published_product_by_slug(&pool, &draft.slug)
        .await
        .expect("lookup failed")
        .is_none());
    assert!(list_products(&pool, &ProductFilter::default(), SortKey::Newest)
        .await
        .expect("list failed")
        .is_empty());
    assert!(get_product(&pool, draft.id)
        .await
        .expect("lookup failed")
        .is_some());

    set_product_status(&pool, draft.id, ProductStatus::Published)
        .await
        .expect("publish failed");
    let found = get_published_product_by_slug(&pool, &draft.slug)
        .await
        .expect("lookup failed")
        .expect("published product is visible");
    assert_eq!(found.model_number, "126610LN");
}

#[sqlx::test(migrations = "../../migrations")]
async fn brand_filter_with_price_asc(pool: sqlx::PgPool) {
    let a = published(&pool, "A1", "Omega", "9000", Some("men"), None).await;
    published(&pool, "A2", "Omega", "3000", Some("men"), None).await;
    published(&pool, "A3", "Omega", "6000.50", Some("women"), None).await;
    published(&pool, "B1", "Rolex", "1000", Some("men"), None).await;
    create_product(
        &pool,
        &input(json!({
            "name": "Omega Draft",
            "model_number": "A4",
            "brand": "Omega",
            "price": 10
        })),
    )
    .await
    .expect("draft create failed");

    let filter = ProductFilter {
        brand_ids: vec![a.brand.id],
        ..ProductFilter::default()
    };
    let products = list_products(&pool, &filter, SortKey::PriceAsc)
        .await
        .expect("list failed");

    let models: Vec<_> = products.iter().map(|p| p.model_number.as_str()).collect();
    assert_eq!(models, vec!["A2", "A3", "A1"]);
    assert!(products.windows(2).all(|w| w[0].price <= w[1].price));
    assert!(products.iter().all(|p| p.brand.id == a.brand.id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn filters_combine_across_fields(pool: sqlx::PgPool) {
    published(&pool, "G1", "Omega", "5000", Some("men"), Some("Diver")).await;
    published(&pool, "G2", "Omega", "5000", Some("women"), Some("Diver")).await;
    published(&pool, "G3", "Omega", "15000", Some("men"), Some("Diver")).await;
    published(&pool, "G4", "Omega", "5000", Some("men"), Some("Dress")).await;

    let filter = ProductFilter {
        genders: vec![Gender::Men],
        max_price: Some(Decimal::from(10_000)),
        ..ProductFilter::default()
    };
    let models: Vec<_> = list_products(&pool, &filter, SortKey::Newest)
        .await
        .expect("list failed")
        .into_iter()
        .map(|p| p.model_number)
        .collect();
    assert_eq!(models, vec!["G4", "G1"], "newest first");
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_and_featured_listings(pool: sqlx::PgPool) {
    create_product(&pool, &submariner())
        .await
        .expect("create failed");
    let featured = create_product(
        &pool,
        &input(json!({
            "name": "Nautilus",
            "model_number": "5711/1A-010",
            "brand": "Patek Philippe",
            "price": 120000,
            "status": "published",
            "is_featured": "true"
        })),
    )
    .await
    .expect("create failed");

    assert_eq!(
        list_admin_products(&pool, None).await.expect("list").len(),
        2
    );
    let drafts = list_admin_products(&pool, Some(ProductStatus::Draft))
        .await
        .expect("list");
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].model_number, "126610LN");

    let home = list_featured_products(&pool, 8).await.expect("list");
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].id, featured.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn decimals_round_trip_exactly(pool: sqlx::PgPool) {
    let payload = input(json!({
        "name": "Calatrava",
        "model_number": "5227G",
        "brand": "Patek Philippe",
        "price": "10500.00",
        "case_diameter_mm": "39.00",
        "case_thickness_mm": 9.24
    }));
    let product = create_product(&pool, &payload).await.expect("create failed");
    let view = caliber_core::to_display_form(&product);

    assert_eq!(view.price, "10500.00");
    assert_eq!(view.case_diameter_mm.as_deref(), Some("39.00"));
    assert_eq!(view.case_thickness_mm.as_deref(), Some("9.24"));
    assert_eq!(view.discount_price, None);
}

// ---------------------------------------------------------------------------
// Section 4: Recommendations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn same_brand_ranks_before_gender_only_match(pool: sqlx::PgPool) {
    let anchor = published(&pool, "R0", "Rolex", "10000", Some("men"), Some("Diver")).await;
    let same_brand = published(&pool, "R1", "Rolex", "9000", Some("women"), None).await;
    let gender_only = published(&pool, "O1", "Omega", "5000", Some("men"), None).await;
    let style_only = published(&pool, "T1", "Tudor", "4000", Some("women"), Some("Diver")).await;
    published(&pool, "C1", "Cartier", "7000", Some("women"), Some("Dress")).await;

    let picks = recommend(&pool, &anchor, 4).await.expect("recommend failed");
    let ids: Vec<_> = picks.iter().map(|p| p.id).collect();

    assert_eq!(ids, vec![same_brand.id, gender_only.id, style_only.id]);
    assert!(!ids.contains(&anchor.id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn recommendation_limit_is_bounded(pool: sqlx::PgPool) {
    let anchor = published(&pool, "L0", "Omega", "5000", None, None).await;
    for i in 1..=3 {
        published(&pool, &format!("L{i}"), "Omega", "5000", None, None).await;
    }

    assert!(recommend(&pool, &anchor, 0).await.expect("recommend").is_empty());
    assert!(recommend(&pool, &anchor, -3).await.expect("recommend").is_empty());
    assert_eq!(recommend(&pool, &anchor, 1).await.expect("recommend").len(), 1);
    assert_eq!(recommend(&pool, &anchor, 2).await.expect("recommend").len(), 2);
    assert_eq!(
        recommend(&pool, &anchor, 1_000).await.expect("recommend").len(),
        3
    );
}
