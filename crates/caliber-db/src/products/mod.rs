//! Database operations for `products`, `product_images` and
//! `product_complications`.

mod types;

mod read;
mod write;

pub use read::{
    get_product, get_published_product_by_slug, list_admin_products, list_featured_products,
    list_products, MAX_FEATURED_LIMIT,
};
pub(crate) use types::product_select;
pub use types::{ImageRow, ProductRow};
pub use write::{create_product, set_product_status, update_product};
