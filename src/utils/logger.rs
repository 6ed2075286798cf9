use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 程式庫與兩個執行檔的 target
const CRATE_TARGETS: &[&str] = &["area_etl", "file_inventory", "normalize_service_areas"];

/// 預設日誌過濾器，`RUST_LOG` 可覆蓋
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    if verbose {
        directives.push("info".to_string());
    }
    directives.join(",")
}

pub fn init_cli_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(
            default_filter(false),
            "area_etl=info,file_inventory=info,normalize_service_areas=info"
        );
        assert!(default_filter(true).contains("area_etl=debug"));
        assert!(default_filter(true).ends_with(",info"));
    }

    /// 執行檔自己的 info 日誌 (例如啟動訊息) 不能被預設過濾器吃掉
    #[test]
    fn test_binary_targets_are_enabled_by_default() {
        for verbose in [false, true] {
            let filter = default_filter(verbose);
            assert!(filter.contains("file_inventory="));
            assert!(filter.contains("normalize_service_areas="));
            assert!(EnvFilter::try_new(&filter).is_ok());
        }
    }
}
