//! キャッシュファイルの書き込み判定

use std::future::Future;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ScraperError;
use crate::types::{FetchOutcome, FetchStatus};

/// `path` が既にあり `force` でなければ `producer` を呼ばずに `AlreadyExists` を返す
///
/// それ以外は `producer` の結果を書き込む。取得や書き込みに失敗した場合は
/// 書きかけのファイルを消して `Failed` を返す。リトライはしない。
pub async fn save_or_reuse<F, Fut>(path: &Path, force: bool, producer: F) -> FetchOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, ScraperError>>,
{
    let outcome = |status| FetchOutcome {
        status,
        path: path.to_path_buf(),
    };

    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!("Reusing cached file {:?}", path);
        return outcome(FetchStatus::AlreadyExists);
    }

    let content = match producer().await {
        Ok(content) => content,
        Err(e) => {
            warn!("Fetch for {:?} failed: {}", path, e);
            return outcome(FetchStatus::Failed);
        }
    };

    if let Err(e) = tokio::fs::write(path, content).await {
        warn!("Writing {:?} failed: {}", path, e);
        let _ = tokio::fs::remove_file(path).await;
        return outcome(FetchStatus::Failed);
    }

    outcome(FetchStatus::Written)
}
