//! ページ数の算出とページ一覧の生成

use regex::Regex;
use reqwest::Url;
use tracing::info;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::query::RecordsPerPage;
use crate::traits::PageFetcher;
use crate::types::PageRequest;

/// トップページのデータベース統計（例: "72514 approved meteorite names"）
pub const DATABASE_STATS_PATTERN: &str = r"(?i)(\d[\d,]*)\s+approved\s+meteorite\s+names";

fn base_url(config: &ScraperConfig) -> Result<Url, ScraperError> {
    Url::parse(&config.base_url)
        .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", config.base_url, e)))
}

/// 本文から件数を取り出す。桁区切りのカンマは無視する
pub fn parse_record_count(body: &str, pattern: &Regex) -> Option<usize> {
    let caps = pattern.captures(body)?;
    caps.get(1)?.as_str().replace(',', "").parse().ok()
}

/// 切り上げ除算でページ数を出す。0件なら0ページ
pub fn page_count(records: usize, per_page: usize) -> usize {
    records.div_ceil(per_page.max(1))
}

/// 最小ページサイズで1回だけ検索し、総件数を返す
///
/// パターンに一致しなければ `CountNotFound`。呼び出し側は処理全体を中断する。
pub async fn discover_record_count(
    fetcher: &dyn PageFetcher,
    config: &ScraperConfig,
) -> Result<usize, ScraperError> {
    let pattern = Regex::new(&config.count_pattern)?;
    let probe = config
        .query
        .clone()
        .with_per_page(RecordsPerPage::smallest());
    let url = probe.page_url(&base_url(config)?, 1);

    let body = fetcher.fetch(url.as_str()).await?;
    let records = parse_record_count(&body, &pattern)
        .ok_or_else(|| ScraperError::CountNotFound(url.to_string()))?;

    info!("Search reports {} records", records);
    Ok(records)
}

/// 総件数から本番のページ数を算出する
pub async fn discover_page_count(
    fetcher: &dyn PageFetcher,
    config: &ScraperConfig,
) -> Result<usize, ScraperError> {
    let records = discover_record_count(fetcher, config).await?;
    let pages = page_count(records, config.query.per_page.count());
    info!(
        "{} records at {} per page -> {} pages",
        records,
        config.query.per_page.count(),
        pages
    );
    Ok(pages)
}

/// トップページの統計からデータベース全体の件数を取る
pub async fn discover_database_total(
    fetcher: &dyn PageFetcher,
    config: &ScraperConfig,
) -> Result<usize, ScraperError> {
    let pattern = Regex::new(DATABASE_STATS_PATTERN)?;
    let url = base_url(config)?;
    let body = fetcher.fetch(url.as_str()).await?;
    parse_record_count(&body, &pattern).ok_or_else(|| ScraperError::CountNotFound(url.to_string()))
}

/// 1..=page_count のページ要求を作る。名前は `page{n}`
pub fn build_page_requests(
    config: &ScraperConfig,
    page_count: usize,
) -> Result<Vec<PageRequest>, ScraperError> {
    let base = base_url(config)?;
    Ok((1..=page_count)
        .map(|index| {
            let url = config.query.page_url(&base, index);
            PageRequest::new(index, format!("page{index}"), url.to_string())
        })
        .collect())
}
