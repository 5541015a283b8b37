use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ScraperError;

/// ページ取得の抽象化
///
/// 本番は [`crate::fetch::HttpFetcher`]、テストはメモリ上の実装を使う。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URLを1回だけ取得してHTML本文を返す（リトライなし）
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        (**self).fetch(url).await
    }
}
