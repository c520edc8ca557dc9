pub mod app_config;
pub mod config;
pub mod display;
pub mod input;
pub mod naming;
pub mod products;
pub mod reference;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use display::{to_display_form, DisplayProduct};
pub use input::{FieldViolation, ImageInput, NewImage, ProductInput, ValidProduct};
pub use products::{
    Gender, Product, ProductDetails, ProductFilter, ProductImage, ProductStatus, SortKey,
};
pub use reference::{load_taxonomy, Reference, ReferenceKind, TaxonomyFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read taxonomy file {path}: {source}")]
    TaxonomyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse taxonomy file: {0}")]
    TaxonomyFileParse(#[from] serde_yaml::Error),
    #[error("taxonomy validation failed: {0}")]
    Validation(String),
}
