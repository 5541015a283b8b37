use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{self, StreamExt};
use tower::Service;
use tracing::info;

use crate::cache::save_or_reuse;
use crate::error::ScraperError;
use crate::traits::PageFetcher;
use crate::types::{FetchOutcome, PageRequest};

/// キャッシュファイルのパス
pub fn cache_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.html"))
}

/// 1ページを取得してキャッシュに保存する tower::Service
///
/// 取得失敗は `FetchStatus::Failed` として返すので、`call` 自体は失敗しない。
#[derive(Clone)]
pub struct PageService {
    fetcher: Arc<dyn PageFetcher>,
    dir: PathBuf,
    force: bool,
}

impl PageService {
    pub fn new(fetcher: Arc<dyn PageFetcher>, dir: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            fetcher,
            dir: dir.into(),
            force,
        }
    }
}

impl Service<PageRequest> for PageService {
    type Response = FetchOutcome;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PageRequest) -> Self::Future {
        let fetcher = Arc::clone(&self.fetcher);
        let path = cache_path(&self.dir, &req.name);
        let force = self.force;

        Box::pin(async move {
            let url = req.url;
            Ok(save_or_reuse(&path, force, || async move { fetcher.fetch(&url).await }).await)
        })
    }
}

/// 全ページを最大 `workers` 件同時に取得する
///
/// 全タスクの完了を待ってから返す。結果は入力の名前ごとに1件ずつ。
pub async fn fetch_all(
    fetcher: Arc<dyn PageFetcher>,
    requests: Vec<PageRequest>,
    dir: &Path,
    workers: usize,
    force: bool,
) -> Result<BTreeMap<String, FetchOutcome>, ScraperError> {
    tokio::fs::create_dir_all(dir).await?;

    let total = requests.len();
    info!(
        "Fetching {} pages with {} workers into {:?}",
        total,
        workers.max(1),
        dir
    );

    let service = PageService::new(fetcher, dir, force);
    let results: Vec<(String, Result<FetchOutcome, ScraperError>)> = stream::iter(requests)
        .map(|req| {
            let mut service = service.clone();
            async move {
                let name = req.name.clone();
                (name, service.call(req).await)
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut outcomes = BTreeMap::new();
    for (name, result) in results {
        outcomes.insert(name, result?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::types::FetchStatus;

    /// URLごとの本文を返すテスト用フェッチャー
    struct MockFetcher {
        pages: HashMap<String, String>,
        fail: Option<String>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockFetcher {
        fn new(count: usize, fail: Option<&str>) -> Self {
            let pages = (1..=count)
                .map(|i| (format!("http://test/{i}"), format!("<p>{i}</p>")))
                .collect();
            Self {
                pages,
                fail: fail.map(str::to_string),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail.as_deref() == Some(url) {
                return Err(ScraperError::Status {
                    status: 500,
                    url: url.to_string(),
                });
            }
            self.pages.get(url).cloned().ok_or(ScraperError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn requests(count: usize) -> Vec<PageRequest> {
        (1..=count)
            .map(|i| PageRequest::new(i, format!("page{i}"), format!("http://test/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new(10, Some("http://test/5")));

        let outcomes = fetch_all(fetcher.clone(), requests(10), dir.path(), 3, false)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 10);
        for i in 1..=10 {
            let outcome = &outcomes[&format!("page{i}")];
            if i == 5 {
                assert_eq!(outcome.status, FetchStatus::Failed);
                assert!(!outcome.path.exists());
            } else {
                assert_eq!(outcome.status, FetchStatus::Written);
            }
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new(12, None));

        fetch_all(fetcher.clone(), requests(12), dir.path(), 4, false)
            .await
            .unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 12);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_rerun_makes_no_network_calls() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(MockFetcher::new(6, None));
        fetch_all(first, requests(6), dir.path(), 2, false)
            .await
            .unwrap();

        let second = Arc::new(MockFetcher::new(6, None));
        let outcomes = fetch_all(second.clone(), requests(6), dir.path(), 2, false)
            .await
            .unwrap();

        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert!(outcomes
            .values()
            .all(|o| o.status == FetchStatus::AlreadyExists));
    }

    #[tokio::test]
    async fn test_page_service_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = PageService::new(Arc::new(MockFetcher::new(1, None)), dir.path(), false);

        let outcome = service.call(requests(1).remove(0)).await.unwrap();

        assert_eq!(outcome.status, FetchStatus::Written);
        assert_eq!(outcome.path, dir.path().join("page1.html"));
        assert_eq!(std::fs::read_to_string(&outcome.path).unwrap(), "<p>1</p>");
    }
}
