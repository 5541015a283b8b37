use std::path::PathBuf;
use std::time::Duration;

use crate::query::SearchQuery;

pub const DEFAULT_BASE_URL: &str = "https://www.lpi.usra.edu/meteor/metbull.php";

/// 検索結果ページの件数表示（例: "72514 records found"）
pub const RECORDS_FOUND_PATTERN: &str = r"(?i)(\d[\d,]*)\s+records\s+found";

/// ブラウザ風のデフォルトヘッダー
pub fn default_headers() -> Vec<(String, String)> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Connection", "keep-alive"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// 結果テーブルを特定するCSSセレクタ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMarkers {
    pub table: String,
    pub row: String,
    pub header_cell: String,
    pub data_cell: String,
}

impl Default for TableMarkers {
    fn default() -> Self {
        Self {
            table: "table#maintable".to_string(),
            row: "tr".to_string(),
            header_cell: "th".to_string(),
            data_cell: "td".to_string(),
        }
    }
}

/// JSON出力の形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonLayout {
    /// レコードの配列
    #[default]
    Records,
    /// `"<page>-<row>"` をキーにしたオブジェクト
    Keyed,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub query: SearchQuery,
    pub headers: Vec<(String, String)>,
    pub html_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
    pub workers: usize,
    pub force: bool,
    pub write_csv: bool,
    pub csv_delimiter: u8,
    pub json_layout: JsonLayout,
    pub timeout: Duration,
    pub markers: TableMarkers,
    pub count_pattern: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: SearchQuery::default(),
            headers: default_headers(),
            html_dir: PathBuf::from("./data/html"),
            output_dir: PathBuf::from("./data"),
            output_name: "output".to_string(),
            workers: 8,
            force: false,
            write_csv: true,
            csv_delimiter: b';',
            json_layout: JsonLayout::Records,
            timeout: Duration::from_secs(120),
            markers: TableMarkers::default(),
            count_pattern: RECORDS_FOUND_PATTERN.to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn new(query: SearchQuery) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// ヘッダーを追加（同名があれば置き換える）
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_html_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_dir = path.into();
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// 0 は 1 として扱う
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    pub fn with_json_layout(mut self, layout: JsonLayout) -> Self {
        self.json_layout = layout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_markers(mut self, markers: TableMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_count_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.count_pattern = pattern.into();
        self
    }

    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.output_name))
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.output_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::default()
            .with_output_dir("/tmp/out")
            .with_output_name("meteorites")
            .with_workers(0)
            .with_force(true);

        assert_eq!(config.workers, 1);
        assert!(config.force);
        assert_eq!(config.json_path(), PathBuf::from("/tmp/out/meteorites.json"));
        assert_eq!(config.csv_path(), PathBuf::from("/tmp/out/meteorites.csv"));
    }

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let config = ScraperConfig::default().with_header("user-agent", "metbull-test");

        let agents: Vec<_> = config
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
            .collect();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].1, "metbull-test");
    }
}
