use anyhow::Result;
use area_etl::core::{AreaKey, Business, SlugSet};
use area_etl::{EtlEngine, MemoryStore, ServiceAreaNormalizer};
use serde_json::json;

fn business(slug: &str, areas: serde_json::Value) -> Business {
    Business::new(slug, Some(areas))
}

async fn run_normalizer(store: &mut MemoryStore) -> area_etl::Result<area_etl::domain::model::NormalizeReport> {
    let mut engine = EtlEngine::new(ServiceAreaNormalizer::new(store));
    engine.run().await
}

fn reno() -> AreaKey {
    AreaKey::new("Reno", "NV", Some("89501"))
}

/// 兩個 business 共用同一區域，最後的 slug 集合恰為兩者
#[tokio::test]
async fn test_shared_area_collects_both_slugs() -> Result<()> {
    let mut store = MemoryStore::new(vec![
        business("acme", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
        business("beta", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
    ]);

    let report = run_normalizer(&mut store).await?;

    assert!(report.committed);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.appended, 1);
    assert_eq!(store.registry().len(), 1);
    assert_eq!(
        store.entry(&reno()).map(SlugSet::as_slice),
        Some(&["acme".to_string(), "beta".to_string()][..])
    );
    Ok(())
}

#[tokio::test]
async fn test_input_order_does_not_change_membership() -> Result<()> {
    let rows = vec![
        business("beta", json!([{"city": "Reno", "state": "NV", "zip": 89501}])),
        business("acme", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
        business("beta", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
    ];
    let mut store = MemoryStore::new(rows);

    run_normalizer(&mut store).await?;

    let slugs = store.entry(&reno()).expect("entry exists");
    assert_eq!(slugs.len(), 2);
    assert!(slugs.contains("acme"));
    assert!(slugs.contains("beta"));
    Ok(())
}

/// 第二次執行不應改變任何資料
#[tokio::test]
async fn test_second_run_is_a_no_op() -> Result<()> {
    let mut store = MemoryStore::new(vec![
        business("acme", json!([
            {"city": "Reno", "state": "NV", "zip": "89501"},
            {"city": "Sparks", "state": "NV"}
        ])),
        business("beta", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
    ]);

    run_normalizer(&mut store).await?;
    let after_first = store.registry().clone();

    let second = run_normalizer(&mut store).await?;

    assert_eq!(second.changed(), 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(store.registry(), &after_first);
    Ok(())
}

#[tokio::test]
async fn test_incomplete_descriptors_are_skipped_individually() -> Result<()> {
    let mut store = MemoryStore::new(vec![business(
        "acme",
        json!([
            {"city": "Reno"},
            {"state": "NV", "zip": "89501"},
            {"city": "", "state": "NV"},
            {"city": "Carson City", "state": "NV"}
        ]),
    )]);

    let report = run_normalizer(&mut store).await?;

    assert_eq!(report.descriptors_skipped, 3);
    assert_eq!(store.registry().len(), 1);
    assert!(store
        .entry(&AreaKey::new("Carson City", "NV", None))
        .is_some_and(|s| s.contains("acme")));
    Ok(())
}

#[tokio::test]
async fn test_businesses_without_areas_are_skipped() -> Result<()> {
    let mut store = MemoryStore::new(vec![
        Business::new("ghost", None),
        business("empty", json!([])),
        business("nulls", serde_json::Value::Null),
    ]);

    let report = run_normalizer(&mut store).await?;

    assert_eq!(report.businesses_seen, 3);
    assert_eq!(report.businesses_skipped, 3);
    assert!(store.registry().is_empty());
    Ok(())
}

/// 缺 zip 是獨立的鍵：與有 zip 的同城市項目分開保存
#[tokio::test]
async fn test_absent_zip_is_its_own_entry() -> Result<()> {
    let mut store = MemoryStore::new(vec![
        business("acme", json!([{"city": "Reno", "state": "NV"}])),
        business("beta", json!([{"city": "Reno", "state": "NV", "zip": null}])),
        business("gamma", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
    ]);

    run_normalizer(&mut store).await?;

    assert_eq!(store.registry().len(), 2);
    let no_zip = store.entry(&AreaKey::new("Reno", "NV", None)).unwrap();
    assert_eq!(no_zip.as_slice(), &["acme".to_string(), "beta".to_string()]);
    assert_eq!(store.entry(&reno()).unwrap().as_slice(), &["gamma".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_existing_entries_are_extended_not_replaced() -> Result<()> {
    let mut store = MemoryStore::new(vec![business(
        "acme",
        json!([{"city": "Reno", "state": "NV", "zip": "89501"}]),
    )])
    .with_entry(reno(), SlugSet::from(vec!["legacy".to_string()]));

    let report = run_normalizer(&mut store).await?;

    assert_eq!(report.appended, 1);
    assert_eq!(
        store.entry(&reno()).unwrap().as_slice(),
        &["legacy".to_string(), "acme".to_string()]
    );
    Ok(())
}

/// 中途失敗時註冊表維持原狀
#[tokio::test]
async fn test_failure_midway_leaves_registry_untouched() -> Result<()> {
    let rows = vec![
        business("acme", json!([{"city": "Reno", "state": "NV", "zip": "89501"}])),
        business("beta", json!([{"city": "Sparks", "state": "NV"}])),
        business("gamma", json!([{"city": "Elko", "state": "NV"}])),
    ];
    let existing = SlugSet::from(vec!["legacy".to_string()]);
    let mut store = MemoryStore::new(rows)
        .with_entry(reno(), existing.clone())
        .fail_after_writes(2);

    let result = run_normalizer(&mut store).await;

    assert!(result.is_err());
    assert!(!store.in_transaction());
    assert_eq!(store.registry().len(), 1);
    assert_eq!(store.entry(&reno()), Some(&existing));
    Ok(())
}
