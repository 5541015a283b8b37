//! 件数取得 → 並列取得 → テーブル抽出 → 集約 → 書き出し

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::dataset::{write as write_dataset, Dataset, PageRecords, WrittenFiles};
use crate::error::ScraperError;
use crate::extract::{Page, TableExtractor};
use crate::pages::{build_page_requests, discover_page_count};
use crate::service::fetch_all;
use crate::traits::PageFetcher;
use crate::types::{FetchOutcome, PageRequest};

/// 抽出に失敗したページ
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub name: String,
    pub reason: String,
}

/// 実行結果のまとめ
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub page_count: usize,
    pub outcomes: BTreeMap<String, FetchOutcome>,
    pub extracted_pages: usize,
    pub failed_extractions: Vec<ExtractionFailure>,
    pub record_count: usize,
    pub column_count: usize,
    pub files: WrittenFiles,
}

impl RunReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// キャッシュ済みページをページ番号順に抽出する
///
/// 失敗したページは記録して飛ばす。
pub async fn extract_pages(
    extractor: &TableExtractor,
    requests: &[PageRequest],
    outcomes: &BTreeMap<String, FetchOutcome>,
) -> (Vec<PageRecords>, Vec<ExtractionFailure>) {
    let mut pages = Vec::new();
    let mut failures = Vec::new();

    let mut ordered: Vec<&PageRequest> = requests.iter().collect();
    ordered.sort_by_key(|r| r.index);

    for request in ordered {
        let Some(outcome) = outcomes.get(&request.name) else {
            continue;
        };
        if !outcome.status.is_available() {
            continue;
        }

        let result = match Page::load(request, &outcome.path).await {
            Ok(page) => extractor.extract_page(&page),
            Err(e) => Err(e),
        };
        match result {
            Ok(table) => pages.push(PageRecords {
                index: request.index,
                table,
            }),
            Err(e) => {
                warn!("Skipping {}: {}", request.name, e);
                failures.push(ExtractionFailure {
                    name: request.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (pages, failures)
}

/// パイプライン全体を実行する
///
/// 件数が取れなければ何も取得せずにエラーを返す。
pub async fn run(
    config: &ScraperConfig,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<RunReport, ScraperError> {
    let started_at = Utc::now();
    let extractor = TableExtractor::new(&config.markers)?;

    let page_count = discover_page_count(fetcher.as_ref(), config).await?;
    let requests = build_page_requests(config, page_count)?;

    let outcomes = fetch_all(
        fetcher,
        requests.clone(),
        &config.html_dir,
        config.workers,
        config.force,
    )
    .await?;

    let (pages, failed_extractions) = extract_pages(&extractor, &requests, &outcomes).await;
    let extracted_pages = pages.len();

    let dataset = Dataset::aggregate(pages);
    let csv_path = config.csv_path();
    let files = write_dataset(
        &dataset,
        &config.json_path(),
        config
            .write_csv
            .then_some((csv_path.as_path(), config.csv_delimiter)),
        config.json_layout,
    )?;

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        page_count,
        outcomes,
        extracted_pages,
        failed_extractions,
        record_count: dataset.len(),
        column_count: dataset.columns().len(),
        files,
    };
    info!(
        "Done: {} records from {}/{} pages",
        report.record_count, report.extracted_pages, report.page_count
    );
    Ok(report)
}
