//! ページごとのレコードを1つのデータセットにまとめて書き出す

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::config::JsonLayout;
use crate::error::ScraperError;
use crate::types::{NormalizedRecord, PageTable};

/// 1ページ分の抽出結果
#[derive(Debug, Clone)]
pub struct PageRecords {
    pub index: usize,
    pub table: PageTable,
}

/// 出典（ページ番号・行番号）付きのレコード
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub page: usize,
    pub row: usize,
    pub record: NormalizedRecord,
}

impl DatasetRow {
    pub fn key(&self) -> String {
        format!("{}-{}", self.page, self.row)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
    columns: Vec<String>,
}

impl Dataset {
    /// ページ番号順に連結し、列名の和集合を初出順で集める
    pub fn aggregate(mut pages: Vec<PageRecords>) -> Self {
        pages.sort_by_key(|p| p.index);

        let mut rows = Vec::new();
        let mut columns = Vec::new();
        let mut seen = HashSet::new();

        for page in pages {
            for (row, record) in page.table.records.into_iter().enumerate() {
                for key in record.keys() {
                    if seen.insert(key.to_string()) {
                        columns.push(key.to_string());
                    }
                }
                rows.push(DatasetRow {
                    page: page.index,
                    row: row + 1,
                    record,
                });
            }
        }

        Self { rows, columns }
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 入れ子形式（JSON）
    pub fn to_json(&self, layout: JsonLayout) -> Result<Vec<u8>, ScraperError> {
        let bytes = match layout {
            JsonLayout::Records => {
                let records: Vec<&NormalizedRecord> = self.rows.iter().map(|r| &r.record).collect();
                serde_json::to_vec_pretty(&records)?
            }
            JsonLayout::Keyed => {
                let mut map = Map::new();
                for row in &self.rows {
                    map.insert(row.key(), serde_json::to_value(&row.record)?);
                }
                serde_json::to_vec_pretty(&Value::Object(map))?
            }
        };
        Ok(bytes)
    }

    /// 平坦な表形式。ないフィールドは空文字
    ///
    /// 列が1つもなくてもレコードごとに1行書くので、行数はJSONと一致する。
    pub fn to_csv(&self, delimiter: u8) -> Result<Vec<u8>, ScraperError> {
        if self.is_empty() && self.columns.is_empty() {
            return Ok(Vec::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(self.columns.iter().map(|column| {
                row.record
                    .get(column)
                    .map(|value| value.to_cell())
                    .unwrap_or_default()
            }))?;
        }

        writer
            .into_inner()
            .map_err(|e| ScraperError::FileIO(e.into_error()))
    }
}

/// 一時ファイルに書いてからリネームする
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// 書き出したファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFiles {
    pub json: PathBuf,
    pub csv: Option<PathBuf>,
}

/// JSON と（指定があれば）CSV を同じデータセットから書き出す
pub fn write(
    dataset: &Dataset,
    json_path: &Path,
    csv_path: Option<(&Path, u8)>,
    layout: JsonLayout,
) -> Result<WrittenFiles, ScraperError> {
    write_atomic(json_path, &dataset.to_json(layout)?)?;
    info!("Wrote {} records to {:?}", dataset.len(), json_path);

    let csv = match csv_path {
        Some((path, delimiter)) => {
            write_atomic(path, &dataset.to_csv(delimiter)?)?;
            info!(
                "Wrote {} rows x {} columns to {:?}",
                dataset.len(),
                dataset.columns().len(),
                path
            );
            Some(path.to_path_buf())
        }
        None => None,
    };

    Ok(WrittenFiles {
        json: json_path.to_path_buf(),
        csv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn record(fields: &[(&str, FieldValue)]) -> NormalizedRecord {
        let mut record = NormalizedRecord::new();
        for (k, v) in fields {
            record.insert(*k, v.clone());
        }
        record
    }

    fn page(index: usize, records: Vec<NormalizedRecord>) -> PageRecords {
        PageRecords {
            index,
            table: PageTable {
                columns: Vec::new(),
                records,
            },
        }
    }

    fn sample() -> Dataset {
        let a = record(&[
            ("X", FieldValue::Integer(1)),
            ("Y", FieldValue::Text("a".into())),
        ]);
        let b = record(&[
            ("Y", FieldValue::Text("b".into())),
            ("Z", FieldValue::Float(1.5)),
        ]);
        // 完了順ではなくページ番号順になる
        Dataset::aggregate(vec![page(2, vec![b]), page(1, vec![a])])
    }

    #[test]
    fn test_union_columns_first_seen_order() {
        let dataset = sample();

        assert_eq!(dataset.columns(), ["X", "Y", "Z"]);
        assert_eq!(dataset.rows()[0].page, 1);
        assert_eq!(dataset.rows()[1].key(), "2-1");
    }

    #[test]
    fn test_csv_has_empty_cells_for_missing_fields() {
        let csv = String::from_utf8(sample().to_csv(b';').unwrap()).unwrap();
        assert_eq!(csv, "X;Y;Z\n1;a;\n;b;1.5\n");
    }

    #[test]
    fn test_json_layouts() {
        let dataset = sample();

        let records: Value = serde_json::from_slice(&dataset.to_json(JsonLayout::Records).unwrap()).unwrap();
        assert_eq!(records, serde_json::json!([{"X": 1, "Y": "a"}, {"Y": "b", "Z": 1.5}]));

        let keyed: Value = serde_json::from_slice(&dataset.to_json(JsonLayout::Keyed).unwrap()).unwrap();
        assert_eq!(keyed["2-1"]["Z"], serde_json::json!(1.5));
        assert_eq!(keyed["1-1"]["X"], serde_json::json!(1));
    }

    #[test]
    fn test_write_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("out").join("output.json");
        let csv = dir.path().join("out").join("output.csv");

        let written = write(&sample(), &json, Some((csv.as_path(), b';')), JsonLayout::Records).unwrap();
        let first = std::fs::read(&json).unwrap();
        write(&sample(), &json, Some((csv.as_path(), b';')), JsonLayout::Records).unwrap();

        assert_eq!(first, std::fs::read(&json).unwrap());
        assert_eq!(written.csv.as_deref(), Some(csv.as_path()));
        assert!(!dir.path().join("out").join("output.json.tmp").exists());
    }

    #[test]
    fn test_records_without_fields_keep_row_count() {
        let dataset = Dataset::aggregate(vec![page(
            1,
            vec![NormalizedRecord::new(), NormalizedRecord::new()],
        )]);
        assert!(dataset.columns().is_empty());

        let json: Value = serde_json::from_slice(&dataset.to_json(JsonLayout::Records).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);

        let csv = dataset.to_csv(b';').unwrap();
        let rows = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(csv.as_slice())
            .records()
            .count();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::aggregate(Vec::new());
        assert!(dataset.is_empty());
        assert_eq!(dataset.to_json(JsonLayout::Records).unwrap(), b"[]");
    }
}
