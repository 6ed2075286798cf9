use area_etl::config::toml_config::RulesConfig;
use area_etl::core::inventory::print_summary;
use area_etl::utils::logger;
use area_etl::utils::validation::Validate;
use area_etl::{
    EtlEngine, EtlError, ExclusionRules, FileInventory, InventoryCli, InventoryOptions,
    LocalStorage,
};
use clap::Parser;

fn load_rules(path: Option<&str>) -> Result<ExclusionRules, EtlError> {
    match path {
        Some(path) => {
            tracing::info!("📁 Loading exclusion rules from: {}", path);
            let config = RulesConfig::from_file(path)?;
            config.validate()?;
            Ok(config.into_rules())
        }
        None => Ok(ExclusionRules::default()),
    }
}

async fn run(args: &InventoryCli) -> Result<(), EtlError> {
    args.validate()?;
    let rules = load_rules(args.rules.as_deref())?;
    tracing::debug!(
        "Excluding {} directories, {} extensions, {} file names",
        rules.directories().len(),
        rules.extensions().len(),
        rules.files().len()
    );

    let options = InventoryOptions::new(&args.root, rules)
        .with_preview(args.preview)
        .with_output_dir(&args.output_dir);
    let storage = LocalStorage::new(&args.output_dir);
    let mut engine =
        EtlEngine::new_with_monitoring(FileInventory::new(storage, options), args.monitor);

    let report = engine.run().await?;
    print_summary(&report);
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = InventoryCli::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Building file inventory for {}", args.root);

    // 任何錯誤都以退出碼 1 結束
    if let Err(e) = run(&args).await {
        tracing::error!("❌ File inventory failed: {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }
}
