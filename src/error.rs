use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTPステータスエラー: {status} {url}")]
    Status { status: u16, url: String },

    #[error("不正なヘッダー: {0}")]
    InvalidHeader(String),

    #[error("不正なURL: {0}")]
    InvalidUrl(String),

    #[error("不正な正規表現: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("不正なセレクタ: {0}")]
    InvalidSelector(String),

    #[error("レコード件数が見つかりません: {0}")]
    CountNotFound(String),

    #[error("結果テーブルが見つかりません: {0}")]
    TableNotFound(String),

    #[error("行の列数が一致しません: 行{row}は{found}列 (ヘッダーは{expected}列)")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("キャッシュファイルがありません: {0:?}")]
    MissingCache(PathBuf),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),
}
