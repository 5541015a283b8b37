//! 検索クエリの定義
//!
//! metbull.php の GET パラメータ（sea / sfor / valids / stype / lrec / map / page）を型で表す。

use std::str::FromStr;

use reqwest::Url;
use tracing::debug;

/// 検索対象 (`sfor`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Names,
    Text,
    Places,
    Classes,
    Years,
}

impl SearchField {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Names => "names",
            Self::Text => "text",
            Self::Places => "places",
            Self::Classes => "classes",
            Self::Years => "years",
        }
    }
}

impl FromStr for SearchField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "names" => Ok(Self::Names),
            "text" => Ok(Self::Text),
            "places" => Ok(Self::Places),
            "classes" => Ok(Self::Classes),
            "years" => Ok(Self::Years),
            _ => Err(()),
        }
    }
}

/// 検索方法 (`stype`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Contains,
    Starts,
    Exact,
    Sounds,
}

impl SearchType {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Starts => "starts",
            Self::Exact => "exact",
            Self::Sounds => "sounds",
        }
    }
}

impl FromStr for SearchType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Self::Contains),
            "starts" => Ok(Self::Starts),
            "exact" => Ok(Self::Exact),
            "sounds" => Ok(Self::Sounds),
            _ => Err(()),
        }
    }
}

/// 1ページあたりの件数 (`lrec`)
///
/// サイト側が受け付ける値のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordsPerPage {
    R20,
    R50,
    R100,
    R200,
    R500,
    R1000,
    R2000,
    R5000,
    R50000,
}

impl RecordsPerPage {
    pub const ALL: [RecordsPerPage; 9] = [
        Self::R20,
        Self::R50,
        Self::R100,
        Self::R200,
        Self::R500,
        Self::R1000,
        Self::R2000,
        Self::R5000,
        Self::R50000,
    ];

    /// 件数取得用の最小ページサイズ
    pub fn smallest() -> Self {
        Self::R20
    }

    pub fn count(self) -> usize {
        match self {
            Self::R20 => 20,
            Self::R50 => 50,
            Self::R100 => 100,
            Self::R200 => 200,
            Self::R500 => 500,
            Self::R1000 => 1_000,
            Self::R2000 => 2_000,
            Self::R5000 => 5_000,
            Self::R50000 => 50_000,
        }
    }

    pub fn from_count(count: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.count() == count)
    }
}

impl FromStr for RecordsPerPage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<usize>()
            .ok()
            .and_then(Self::from_count)
            .ok_or(())
    }
}

/// 位置情報の表示形式 (`map`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationFormat {
    /// 10進数の緯度経度 `(lat, long)`
    DecimalDegrees,
}

impl LocationFormat {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::DecimalDegrees => "ll",
        }
    }
}

impl FromStr for LocationFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ll" => Ok(Self::DecimalDegrees),
            _ => Err(()),
        }
    }
}

/// 検索クエリ
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub search: String,
    pub field: Option<SearchField>,
    pub approved_only: bool,
    pub kind: Option<SearchType>,
    pub per_page: RecordsPerPage,
    pub location: Option<LocationFormat>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            search: "*".to_string(),
            field: Some(SearchField::Names),
            approved_only: true,
            kind: Some(SearchType::Contains),
            per_page: RecordsPerPage::R5000,
            location: Some(LocationFormat::DecimalDegrees),
        }
    }
}

impl SearchQuery {
    /// 文字列のキーと値からクエリを組み立てる
    ///
    /// 受け付けられない値は黙って捨て、そのパラメータはURLに含めない。
    /// `lrec` は省略できないので、不正な値ならデフォルトの件数を使う。
    pub fn from_params<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let accepted = match key {
                "sea" => {
                    query.search = value.to_string();
                    true
                }
                "sfor" => {
                    query.field = value.parse().ok();
                    query.field.is_some()
                }
                "valids" => {
                    query.approved_only = value == "yes";
                    matches!(value, "yes" | "no" | "")
                }
                "stype" => {
                    query.kind = value.parse().ok();
                    query.kind.is_some()
                }
                "lrec" => value.parse().map(|r| query.per_page = r).is_ok(),
                "map" => {
                    query.location = value.parse().ok();
                    query.location.is_some()
                }
                _ => false,
            };
            if !accepted {
                debug!("Dropping query parameter {}={:?}", key, value);
            }
        }
        query
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_per_page(mut self, per_page: RecordsPerPage) -> Self {
        self.per_page = per_page;
        self
    }

    /// クエリパラメータの一覧（`page` を除く）
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("sea", self.search.clone())];
        if let Some(field) = self.field {
            params.push(("sfor", field.as_param().to_string()));
        }
        if self.approved_only {
            params.push(("valids", "yes".to_string()));
        }
        if let Some(kind) = self.kind {
            params.push(("stype", kind.as_param().to_string()));
        }
        params.push(("lrec", self.per_page.count().to_string()));
        if let Some(location) = self.location {
            params.push(("map", location.as_param().to_string()));
        }
        params
    }

    /// 指定ページのURLを組み立てる
    pub fn page_url(&self, base: &Url, page: usize) -> Url {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in self.params() {
                pairs.append_pair(key, &value);
            }
            pairs.append_pair("page", &page.to_string());
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_url() {
        let base = Url::parse("https://www.lpi.usra.edu/meteor/metbull.php").unwrap();
        let url = SearchQuery::default().page_url(&base, 3);

        assert_eq!(
            url.as_str(),
            "https://www.lpi.usra.edu/meteor/metbull.php?sea=*&sfor=names&valids=yes&stype=contains&lrec=5000&map=ll&page=3"
        );
    }

    #[test]
    fn test_from_params_drops_invalid_values() {
        let query = SearchQuery::from_params([
            ("sea", "Allende"),
            ("sfor", "planets"),
            ("stype", "exact"),
            ("lrec", "42"),
            ("unknown", "x"),
        ]);

        assert_eq!(query.search, "Allende");
        assert_eq!(query.field, None);
        assert_eq!(query.kind, Some(SearchType::Exact));
        assert_eq!(query.per_page, RecordsPerPage::R5000);
    }

    #[test]
    fn test_rejected_values_are_left_out_of_url() {
        let base = Url::parse("https://www.lpi.usra.edu/meteor/metbull.php").unwrap();
        let query = SearchQuery::from_params([
            ("sfor", "planets"),
            ("stype", "bogus"),
            ("map", "utm"),
            ("valids", "maybe"),
        ]);

        assert_eq!(
            query.page_url(&base, 1).as_str(),
            "https://www.lpi.usra.edu/meteor/metbull.php?sea=*&lrec=5000&page=1"
        );
    }

    #[test]
    fn test_valids_no_omits_parameter() {
        let query = SearchQuery::from_params([("valids", "no")]);
        assert!(!query.approved_only);
        assert!(query.params().iter().all(|(k, _)| *k != "valids"));
    }

    #[test]
    fn test_records_per_page_parse() {
        assert_eq!("20".parse(), Ok(RecordsPerPage::R20));
        assert_eq!("50000".parse(), Ok(RecordsPerPage::R50000));
        assert!("21".parse::<RecordsPerPage>().is_err());
        assert_eq!(RecordsPerPage::smallest().count(), 20);
    }
}
