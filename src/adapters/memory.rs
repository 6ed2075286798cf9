use crate::domain::model::{AreaKey, Business, SlugSet};
use crate::domain::ports::ServiceAreaStore;
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;

/// 記憶體內的註冊表。交易期間的寫入只作用在暫存副本上，
/// commit 時才取代已提交的狀態。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    businesses: Vec<Business>,
    committed: BTreeMap<AreaKey, SlugSet>,
    staged: Option<BTreeMap<AreaKey, SlugSet>>,
    fail_after_writes: Option<usize>,
    writes: usize,
}

impl MemoryStore {
    pub fn new(businesses: Vec<Business>) -> Self {
        Self {
            businesses,
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, key: AreaKey, slugs: SlugSet) -> Self {
        self.committed.insert(key, slugs);
        self
    }

    /// 第 n 次寫入之後的寫入都會失敗，用來驗證原子性
    pub fn fail_after_writes(mut self, n: usize) -> Self {
        self.fail_after_writes = Some(n);
        self
    }

    /// 已提交的狀態
    pub fn registry(&self) -> &BTreeMap<AreaKey, SlugSet> {
        &self.committed
    }

    pub fn entry(&self, key: &AreaKey) -> Option<&SlugSet> {
        self.committed.get(key)
    }

    pub fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    fn staged_mut(&mut self) -> Result<&mut BTreeMap<AreaKey, SlugSet>> {
        if let Some(limit) = self.fail_after_writes {
            if self.writes >= limit {
                return Err(EtlError::processing(format!(
                    "injected failure after {} writes",
                    limit
                )));
            }
        }
        self.writes += 1;
        self.staged.as_mut().ok_or_else(|| {
            EtlError::processing("service_areas writes must happen inside a transaction")
        })
    }
}

impl ServiceAreaStore for MemoryStore {
    async fn fetch_businesses(&mut self) -> Result<Vec<Business>> {
        Ok(self.businesses.clone())
    }

    async fn begin(&mut self) -> Result<()> {
        if self.staged.is_some() {
            return Err(EtlError::processing("transaction already in progress"));
        }
        self.staged = Some(self.committed.clone());
        Ok(())
    }

    async fn find_slugs(&mut self, key: &AreaKey) -> Result<Option<SlugSet>> {
        let view = self.staged.as_ref().unwrap_or(&self.committed);
        Ok(view.get(key).cloned())
    }

    async fn insert_entry(&mut self, key: &AreaKey, slugs: &SlugSet) -> Result<()> {
        let staged = self.staged_mut()?;
        if staged.contains_key(key) {
            return Err(EtlError::processing(format!(
                "duplicate key value violates unique constraint: {}",
                key
            )));
        }
        staged.insert(key.clone(), slugs.clone());
        Ok(())
    }

    async fn update_slugs(&mut self, key: &AreaKey, slugs: &SlugSet) -> Result<()> {
        let staged = self.staged_mut()?;
        match staged.get_mut(key) {
            Some(existing) => {
                *existing = slugs.clone();
                Ok(())
            }
            None => Err(EtlError::processing(format!(
                "service_areas row {} disappeared during update",
                key
            ))),
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| EtlError::processing("commit without an open transaction"))?;
        self.committed = staged;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged = None;
        Ok(())
    }
}
