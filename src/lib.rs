//! Meteoritical Bulletin スクレイパーライブラリ
//!
//! - 検索結果の総件数からページ数を算出
//! - 全ページを並列に取得してHTMLをキャッシュ（既存ファイルは再取得しない）
//! - 結果テーブルを抽出し、質量・年代・座標を型付きの値に正規化
//! - JSON（入れ子）と CSV（平坦）で書き出し
//!
//! # 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metbull_scraper::{run, HttpFetcher, ScraperConfig, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new(SearchQuery::default())
//!         .with_html_dir("./data/html")
//!         .with_workers(8);
//!
//!     let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
//!     let report = run(&config, fetcher).await.unwrap();
//!     println!("Records: {}", report.record_count);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod pages;
pub mod pipeline;
pub mod query;
pub mod service;
pub mod traits;
pub mod types;

// 主要な型をリエクスポート
pub use config::{JsonLayout, ScraperConfig, TableMarkers};
pub use dataset::Dataset;
pub use error::ScraperError;
pub use extract::{Page, TableExtractor};
pub use fetch::HttpFetcher;
pub use normalize::{normalize, ColumnKind};
pub use pipeline::{run, RunReport};
pub use query::{RecordsPerPage, SearchQuery};
pub use service::{fetch_all, PageService};
pub use traits::PageFetcher;
pub use types::{FetchOutcome, FetchStatus, FieldValue, NormalizedRecord, PageRequest};
