//! 検索結果テーブルの抽出

use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::config::TableMarkers;
use crate::error::ScraperError;
use crate::normalize::{clean_text, normalize, ColumnKind};
use crate::types::{NormalizedRecord, PageRequest, PageTable};

/// 解析済みのページ
///
/// HTMLドキュメントは独立した値として持つ。
pub struct Page {
    pub index: usize,
    pub name: String,
    pub document: Html,
}

impl Page {
    pub fn parse(index: usize, name: impl Into<String>, html: &str) -> Self {
        Self {
            index,
            name: name.into(),
            document: Html::parse_document(html),
        }
    }

    /// キャッシュ済みのHTMLファイルを読み込む
    pub async fn load(request: &PageRequest, path: &Path) -> Result<Self, ScraperError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ScraperError::MissingCache(path.to_path_buf()));
        }
        let html = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(request.index, request.name.clone(), &html))
    }
}

/// コンパイル済みのセレクタ
pub struct TableExtractor {
    table: Selector,
    row: Selector,
    header_cell: Selector,
    data_cell: Selector,
}

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::InvalidSelector(format!("{css:?}: {e}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>()
}

impl TableExtractor {
    pub fn new(markers: &TableMarkers) -> Result<Self, ScraperError> {
        Ok(Self {
            table: selector(&markers.table)?,
            row: selector(&markers.row)?,
            header_cell: selector(&markers.header_cell)?,
            data_cell: selector(&markers.data_cell)?,
        })
    }

    /// テーブルを探し、1行目をヘッダーとして各行を正規化する
    ///
    /// テーブルがない、または列数が合わない行があればページ全体を失敗とする。
    pub fn extract(&self, document: &Html) -> Result<PageTable, ScraperError> {
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ScraperError::TableNotFound("results table".to_string()))?;

        let mut rows = table.select(&self.row);
        let header = rows
            .next()
            .ok_or_else(|| ScraperError::TableNotFound("header row".to_string()))?;

        let columns: Vec<String> = header
            .select(&self.header_cell)
            .map(|cell| clean_text(&cell_text(cell)))
            .collect();
        if columns.is_empty() {
            return Err(ScraperError::TableNotFound("header cells".to_string()));
        }
        let kinds: Vec<ColumnKind> = columns.iter().map(|c| ColumnKind::from_column(c)).collect();
        debug!("Columns: {:?}", columns);

        let mut records = Vec::new();
        for (row_index, row) in rows.enumerate() {
            let cells: Vec<String> = row.select(&self.data_cell).map(cell_text).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() != columns.len() {
                return Err(ScraperError::RowShape {
                    row: row_index + 1,
                    expected: columns.len(),
                    found: cells.len(),
                });
            }

            let mut record = NormalizedRecord::new();
            for ((column, kind), raw) in columns.iter().zip(&kinds).zip(&cells) {
                if let Some(value) = normalize(raw, *kind) {
                    record.insert(column.clone(), value);
                }
            }
            records.push(record);
        }

        Ok(PageTable { columns, records })
    }

    pub fn extract_page(&self, page: &Page) -> Result<PageTable, ScraperError> {
        self.extract(&page.document)
    }
}
