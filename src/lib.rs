pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{InventoryCli, NormalizerCli};

pub use adapters::{MemoryStore, PgStore};
pub use config::cli::LocalStorage;
pub use config::database::DbConfig;
pub use config::exclusion::ExclusionRules;
pub use core::etl::EtlEngine;
pub use core::inventory::{FileInventory, InventoryOptions};
pub use core::normalizer::ServiceAreaNormalizer;
pub use utils::error::{EtlError, Result};
