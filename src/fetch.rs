//! HTTP によるページ取得

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::PageFetcher;

/// reqwest を使った [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// 設定のヘッダーとタイムアウトでクライアントを作る
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScraperError::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScraperError::InvalidHeader(format!("{value}: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_accepts_default_headers() {
        assert!(HttpFetcher::new(&ScraperConfig::default()).is_ok());
    }

    #[test]
    fn test_http_fetcher_rejects_invalid_header() {
        let config = ScraperConfig::default().with_header("Bad Header", "x");
        let err = HttpFetcher::new(&config).unwrap_err();
        assert!(matches!(err, ScraperError::InvalidHeader(_)));
    }
}
