use crate::domain::model::{AreaKey, Business, SlugSet};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 寫入後檔案的完整位置，用於輸出摘要
    fn location(&self, path: &str) -> String;
}

/// 服務區域註冊表的持久層。寫入操作只在 `begin` 與
/// `commit`/`rollback` 之間呼叫。
pub trait ServiceAreaStore: Send + Sync {
    fn fetch_businesses(&mut self)
        -> impl std::future::Future<Output = Result<Vec<Business>>> + Send;

    fn begin(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    fn find_slugs(
        &mut self,
        key: &AreaKey,
    ) -> impl std::future::Future<Output = Result<Option<SlugSet>>> + Send;

    fn insert_entry(
        &mut self,
        key: &AreaKey,
        slugs: &SlugSet,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn update_slugs(
        &mut self,
        key: &AreaKey,
        slugs: &SlugSet,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send + 'static;
    type Transformed: Send + 'static;
    type Report: Send + 'static;

    fn name(&self) -> &str;
    async fn extract(&mut self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&mut self, data: Self::Transformed) -> Result<Self::Report>;
}
