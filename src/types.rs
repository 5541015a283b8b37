//! パイプライン全体で使う型定義

use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// 取得対象ページ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// ページ番号（1始まり）
    pub index: usize,
    /// 一意なキー。キャッシュファイル名にもなる
    pub name: String,
    pub url: String,
}

impl PageRequest {
    pub fn new(index: usize, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            url: url.into(),
        }
    }
}

/// キャッシュゲートの判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Failed,
    AlreadyExists,
    Written,
}

impl FetchStatus {
    /// キャッシュファイルが使える状態か
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// 1ページ分の取得結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub path: PathBuf,
}

/// 正規化後のセル値
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    /// (緯度, 経度)
    Coordinates(f64, f64),
}

impl FieldValue {
    /// CSVセル用の文字列
    ///
    /// 浮動小数点はJSONと同じく最短表現で出す。
    pub fn to_cell(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Text(s) => s.clone(),
            Self::Coordinates(lat, lon) => format!("({lat:?}, {lon:?})"),
        }
    }
}

/// 正規化済みの1行
///
/// 値がないフィールドはキーごと持たない。キーは列順を保つ。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同じキーがあれば値を置き換える
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 1ページから抽出したテーブル
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTable {
    pub columns: Vec<String>,
    pub records: Vec<NormalizedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut record = NormalizedRecord::new();
        record.insert("Name", FieldValue::Text("Allende".into()));
        record.insert("Mass", FieldValue::Float(2_000_000.0));
        record.insert("Name", FieldValue::Text("Murchison".into()));

        let keys: Vec<_> = record.keys().collect();
        assert_eq!(keys, vec!["Name", "Mass"]);
        assert_eq!(
            record.get("Name"),
            Some(&FieldValue::Text("Murchison".into()))
        );

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Name":"Murchison","Mass":2000000.0}"#);
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(FieldValue::Integer(1920).to_cell(), "1920");
        assert_eq!(FieldValue::Float(1500.0).to_cell(), "1500.0");
        assert_eq!(
            FieldValue::Coordinates(-12.345, 67.89).to_cell(),
            "(-12.345, 67.89)"
        );
        let json = serde_json::to_string(&FieldValue::Coordinates(-12.345, 67.89)).unwrap();
        assert_eq!(json, "[-12.345,67.89]");
    }
}
