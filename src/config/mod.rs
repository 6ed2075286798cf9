pub mod cli;
pub mod database;
pub mod exclusion;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

/// `normalize-service-areas` 的命令列參數；連線設定一律來自環境變數
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "normalize-service-areas")]
#[command(about = "Merge business service areas into the service_areas registry")]
pub struct NormalizerCli {
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Run every merge, then roll the transaction back
    #[arg(long)]
    pub dry_run: bool,

    /// Log CPU and memory usage per phase
    #[arg(long)]
    pub monitor: bool,
}

/// `file-inventory` 的命令列參數；預設值等同無參數執行
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "file-inventory")]
#[command(about = "Write a JSON manifest of the non-trivial files under a directory")]
pub struct InventoryCli {
    /// Directory to inventory
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Directory receiving file_mapping.json and detailed_file_mapping.json
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// TOML file extending or replacing the built-in exclusion rules
    #[arg(long)]
    pub rules: Option<String>,

    /// Number of sorted entries printed in the summary
    #[arg(long, default_value = "10")]
    pub preview: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log CPU and memory usage per phase
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl Validate for InventoryCli {
    fn validate(&self) -> Result<()> {
        validate_path("root", &self.root)?;
        validate_path("output_dir", &self.output_dir)?;
        if let Some(rules) = &self.rules {
            validate_path("rules", rules)?;
        }
        Ok(())
    }
}
