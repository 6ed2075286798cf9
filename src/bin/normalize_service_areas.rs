use area_etl::utils::logger;
use area_etl::utils::validation::Validate;
use area_etl::{DbConfig, EtlEngine, EtlError, NormalizerCli, PgStore, ServiceAreaNormalizer};
use clap::Parser;

fn report_failure(context: &str, e: &EtlError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code());
}

#[tokio::main]
async fn main() {
    let args = NormalizerCli::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting service area normalization");

    // 連線設定全部來自環境變數，缺少時立即失敗
    let db_config = match DbConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => report_failure("Configuration validation failed", &e),
    };
    tracing::info!("🔧 Database: {}", db_config.describe());

    let mut store = match PgStore::connect(&db_config).await {
        Ok(store) => store,
        Err(e) => report_failure("Could not connect to database", &e),
    };
    tracing::info!("✅ Database connection established");

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - changes will be rolled back");
    }

    let result = {
        let normalizer = ServiceAreaNormalizer::new(&mut store).dry_run(args.dry_run);
        let mut engine = EtlEngine::new_with_monitoring(normalizer, args.monitor);
        engine.run().await
    };

    // 不論成功與否都先釋放連線
    store.close().await;

    match result {
        Ok(report) => {
            tracing::info!(
                "✅ Processed {} businesses: {} inserted, {} appended, {} unchanged",
                report.businesses_seen,
                report.inserted,
                report.appended,
                report.unchanged
            );
            if report.committed {
                println!("✅ Service area normalization committed");
            } else {
                println!("🔍 Dry run complete, nothing committed");
            }
        }
        Err(e) => report_failure("Service area normalization failed", &e),
    }
}
