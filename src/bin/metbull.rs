use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use metbull_scraper::dataset::write_atomic;
use metbull_scraper::{run, FetchStatus, HttpFetcher, JsonLayout, ScraperConfig, SearchQuery};
use tracing_subscriber::EnvFilter;

/// Meteoritical Bulletin の検索結果を取得して JSON / CSV に変換する
#[derive(Parser, Debug)]
#[command(name = "metbull", version)]
struct Cli {
    /// 同時に取得するページ数
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// 既存のキャッシュを上書きする
    #[arg(short, long)]
    force: bool,

    /// 検索文字列 (sea)
    #[arg(long, default_value = "*")]
    sea: String,

    /// 検索対象: names|text|places|classes|years (sfor)
    #[arg(long, default_value = "names")]
    sfor: String,

    /// 承認済みのみ: yes|no (valids)
    #[arg(long, default_value = "yes")]
    valids: String,

    /// 検索方法: contains|starts|exact|sounds (stype)
    #[arg(long, default_value = "contains")]
    stype: String,

    /// 1ページの件数: 20|50|100|200|500|1000|2000|5000|50000 (lrec)
    #[arg(long, default_value = "5000")]
    lrec: String,

    /// 位置の表示形式: ll (map)
    #[arg(long, default_value = "ll")]
    map: String,

    /// HTMLキャッシュの保存先
    #[arg(long, default_value = "data/html")]
    html_dir: PathBuf,

    /// 出力先ディレクトリ
    #[arg(short, long, default_value = "data")]
    output_dir: PathBuf,

    /// 出力ファイル名（拡張子なし）
    #[arg(long, default_value = "output")]
    output_name: String,

    /// CSVを書き出さない
    #[arg(long)]
    no_csv: bool,

    /// CSVの区切り文字
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// JSONを "<page>-<row>" キーのオブジェクトで書き出す
    #[arg(long)]
    keyed: bool,

    /// 追加のHTTPヘッダー "Name: value"（複数可）
    #[arg(long = "header")]
    headers: Vec<String>,

    /// リクエストのタイムアウト（秒）
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// 実行レポート(JSON)の保存先
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ScraperConfig, String> {
        let query = SearchQuery::from_params([
            ("sea", self.sea.as_str()),
            ("sfor", self.sfor.as_str()),
            ("valids", self.valids.as_str()),
            ("stype", self.stype.as_str()),
            ("lrec", self.lrec.as_str()),
            ("map", self.map.as_str()),
        ]);

        if !self.delimiter.is_ascii() {
            return Err(format!("delimiter must be ASCII: {:?}", self.delimiter));
        }

        let mut config = ScraperConfig::new(query)
            .with_workers(self.workers)
            .with_force(self.force)
            .with_html_dir(self.html_dir)
            .with_output_dir(self.output_dir)
            .with_output_name(self.output_name)
            .with_csv(!self.no_csv)
            .with_csv_delimiter(self.delimiter as u8)
            .with_json_layout(if self.keyed {
                JsonLayout::Keyed
            } else {
                JsonLayout::Records
            })
            .with_timeout(Duration::from_secs(self.timeout));

        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .ok_or_else(|| format!("header must be \"Name: value\": {header}"))?;
            config = config.with_header(name.trim(), value.trim());
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let report_path = cli.report.clone();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Aborting: {e}");
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::new(&config) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            eprintln!("Aborting: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = match run(&config, fetcher).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Aborting: {e}");
            return ExitCode::FAILURE;
        }
    };

    for (name, outcome) in &report.outcomes {
        match outcome.status {
            FetchStatus::Failed => println!("{name}: failed to save {:?}", outcome.path),
            FetchStatus::AlreadyExists => println!("{name}: using existing {:?}", outcome.path),
            FetchStatus::Written => println!("{name}: saved to {:?}", outcome.path),
        }
    }
    for failure in &report.failed_extractions {
        println!("{}: skipped ({})", failure.name, failure.reason);
    }

    let elapsed = report.elapsed();
    println!(
        "{} records, {} columns from {}/{} pages in {}.{:03}s",
        report.record_count,
        report.column_count,
        report.extracted_pages,
        report.page_count,
        elapsed.num_seconds(),
        elapsed.num_milliseconds() % 1000
    );
    println!("JSON: {:?}", report.files.json);
    if let Some(csv) = &report.files.csv {
        println!("CSV:  {:?}", csv);
    }

    if let Some(path) = report_path {
        let written = serde_json::to_vec_pretty(&report)
            .map_err(Into::into)
            .and_then(|bytes| write_atomic(&path, &bytes));
        if let Err(e) = written {
            eprintln!("Failed to write report {:?}: {e}", path);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
