use crate::domain::model::{
    AreaAssignment, AreaKey, Business, MergeOutcome, NormalizePlan, NormalizeReport, SlugSet,
};
use crate::domain::ports::{Pipeline, ServiceAreaStore};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 把每個 business 的 service_areas 拆開，合併進 `service_areas` 註冊表。
/// 所有寫入在同一個交易中完成，任何錯誤都會整批回滾。
pub struct ServiceAreaNormalizer<'a, S: ServiceAreaStore> {
    store: &'a mut S,
    dry_run: bool,
}

impl<'a, S: ServiceAreaStore> ServiceAreaNormalizer<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// 照常執行所有合併，最後 ROLLBACK 而不 COMMIT
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    async fn merge_all(&mut self, plan: &NormalizePlan, report: &mut NormalizeReport) -> Result<()> {
        for assignment in &plan.assignments {
            let outcome = merge_slug(&mut *self.store, &assignment.key, &assignment.slug).await?;
            match outcome {
                MergeOutcome::Inserted => report.inserted += 1,
                MergeOutcome::Appended => report.appended += 1,
                MergeOutcome::Unchanged => report.unchanged += 1,
            }
            log_merge(assignment, outcome);
        }
        Ok(())
    }
}

/// 展開所有 business。沒有 service_areas 的整筆略過；
/// 缺 city 或 state 的描述個別略過，其餘照常處理。
pub fn plan_assignments(businesses: &[Business]) -> NormalizePlan {
    let mut plan = NormalizePlan {
        businesses_seen: businesses.len(),
        ..NormalizePlan::default()
    };

    for business in businesses {
        let Some(descriptors) = business.descriptors() else {
            tracing::debug!("Skipping {}: no service areas", business.slug);
            plan.businesses_skipped += 1;
            continue;
        };

        for descriptor in descriptors {
            match AreaKey::from_descriptor(descriptor) {
                Some(key) => plan.assignments.push(AreaAssignment {
                    key,
                    slug: business.slug.clone(),
                }),
                None => {
                    tracing::debug!(
                        "Skipping service area of {} without city/state: {}",
                        business.slug,
                        descriptor
                    );
                    plan.descriptors_skipped += 1;
                }
            }
        }
    }

    plan
}

/// 確保 key 對應的項目存在且包含 slug。已包含時不寫入。
pub async fn merge_slug<S: ServiceAreaStore>(
    store: &mut S,
    key: &AreaKey,
    slug: &str,
) -> Result<MergeOutcome> {
    match store.find_slugs(key).await? {
        None => {
            store.insert_entry(key, &SlugSet::single(slug)).await?;
            Ok(MergeOutcome::Inserted)
        }
        Some(mut slugs) => {
            if !slugs.insert(slug) {
                return Ok(MergeOutcome::Unchanged);
            }
            store.update_slugs(key, &slugs).await?;
            Ok(MergeOutcome::Appended)
        }
    }
}

/// 每次合併輸出一行，已存在的 slug 標為 unchanged
pub fn merge_line(assignment: &AreaAssignment, outcome: MergeOutcome) -> String {
    let key = &assignment.key;
    let (marker, action) = match outcome {
        MergeOutcome::Inserted => ("✅", "inserted"),
        MergeOutcome::Appended => ("✅", "appended"),
        MergeOutcome::Unchanged => ("⏭️", "unchanged"),
    };
    format!(
        "{} {}: city={} state={} zip={} slug={}",
        marker,
        action,
        key.city,
        key.state,
        key.zip.as_deref().unwrap_or("null"),
        assignment.slug
    )
}

fn log_merge(assignment: &AreaAssignment, outcome: MergeOutcome) {
    println!("{}", merge_line(assignment, outcome));
}

#[async_trait]
impl<'a, S: ServiceAreaStore> Pipeline for ServiceAreaNormalizer<'a, S> {
    type Extracted = Vec<Business>;
    type Transformed = NormalizePlan;
    type Report = NormalizeReport;

    fn name(&self) -> &str {
        "service area normalization"
    }

    async fn extract(&mut self) -> Result<Vec<Business>> {
        let businesses = self.store.fetch_businesses().await?;
        println!("Fetched {} businesses", businesses.len());
        Ok(businesses)
    }

    async fn transform(&self, data: Vec<Business>) -> Result<NormalizePlan> {
        let plan = plan_assignments(&data);
        println!(
            "Planned {} merges ({} businesses without service areas, {} incomplete areas skipped)",
            plan.assignments.len(),
            plan.businesses_skipped,
            plan.descriptors_skipped
        );
        Ok(plan)
    }

    async fn load(&mut self, plan: NormalizePlan) -> Result<NormalizeReport> {
        let mut report = NormalizeReport {
            businesses_seen: plan.businesses_seen,
            businesses_skipped: plan.businesses_skipped,
            descriptors_skipped: plan.descriptors_skipped,
            ..NormalizeReport::default()
        };

        self.store.begin().await?;

        if let Err(e) = self.merge_all(&plan, &mut report).await {
            tracing::error!("❌ Merge failed, rolling back: {}", e);
            if let Err(rollback_err) = self.store.rollback().await {
                tracing::warn!("⚠️ Rollback failed: {}", rollback_err);
            }
            return Err(e);
        }

        if self.dry_run {
            self.store.rollback().await?;
            tracing::info!("🔍 Dry run: rolled back {} changes", report.changed());
        } else {
            self.store.commit().await?;
            report.committed = true;
        }

        println!(
            "Inserted {} / appended {} / unchanged {}",
            report.inserted, report.appended, report.unchanged
        );
        Ok(report)
    }
}
