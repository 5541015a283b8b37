//! セル値の正規化
//!
//! 表のセル文字列と列の種類から型付きの値を作る。解釈できない値は `None`
//! （フィールドなし）として捨て、エラーにはしない。

use std::sync::LazyLock;

use regex::Regex;

use crate::types::FieldValue;

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer pattern"));

/// 最初の数値と、その直後の任意の単位 (a / ka / Ma / Ga)
///
/// 単位は `[mkg]?a` に限り、`\b` で "and" などの単語を単位と読まないようにする。
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d+(?:\.\d+)?)(?:\s*([mkg]?a)\b)?").expect("year pattern")
});

static MASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?) (t|T|g|kg|mg)$").expect("mass pattern")
});

static COORDINATES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(([-+]?\d+(?:\.\d+)?), ([-+]?\d+(?:\.\d+)?)\)$").expect("coordinates pattern")
});

/// 列の種類。ヘッダー解析時に一度だけ決める
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 年（隕石）または年代（クレーター）
    Year,
    /// 質量。グラムに換算する
    Mass,
    /// `(lat, long)` 形式の座標
    Coordinates,
    Text,
}

impl ColumnKind {
    pub fn from_column(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("year") || lower.contains("age") {
            Self::Year
        } else if lower.contains("mass") {
            Self::Mass
        } else if lower.contains("lat") && lower.contains("long") {
            Self::Coordinates
        } else {
            Self::Text
        }
    }
}

/// 非ASCII文字を落とし、空白を1つのスペースにまとめる
///
/// NBSPなどのUnicode空白はスペースとして残す。
pub fn clean_text(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_ascii() && !c.is_ascii_control() {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_unknown(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("unknown") || s.eq_ignore_ascii_case("(unknown)")
}

/// セル1つを正規化する
pub fn normalize(raw: &str, kind: ColumnKind) -> Option<FieldValue> {
    let text = clean_text(raw);
    if is_unknown(&text) {
        return None;
    }

    // 数字だけの値は列に関係なく整数
    if INTEGER_RE.is_match(&text) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(FieldValue::Integer(i));
        }
    }

    match kind {
        ColumnKind::Year => normalize_year(&text),
        ColumnKind::Mass => normalize_mass(&text),
        ColumnKind::Coordinates => normalize_coordinates(&text),
        ColumnKind::Text => normalize_text(&text),
    }
}

/// 桁数が多すぎて無限大になった値は捨てる
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// 年・年代
///
/// 複数の数値がある場合（"1967 or 1927"）は最初の数値を採用する。
/// 単位付き、または小数点付きの値は年代として浮動小数点で返す。
pub fn normalize_year(text: &str) -> Option<FieldValue> {
    let caps = YEAR_RE.captures(text)?;
    let number = caps.get(1)?.as_str();
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());

    let multiplier = match unit.as_deref() {
        Some("ga") => 1_000_000_000.0,
        Some("ma") => 1_000_000.0,
        Some("ka") => 1_000.0,
        _ => 1.0,
    };

    if unit.is_none() && !number.contains('.') {
        if let Ok(i) = number.parse::<i64>() {
            return Some(FieldValue::Integer(i));
        }
    }
    let value: f64 = number.parse().ok()?;
    finite(value * multiplier).map(FieldValue::Float)
}

/// 質量（グラム）
pub fn normalize_mass(text: &str) -> Option<FieldValue> {
    let caps = MASS_RE.captures(text)?;
    let amount: f64 = caps[1].parse().ok()?;
    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "t" => 1_000_000.0,
        "kg" => 1_000.0,
        "g" => 1.0,
        "mg" => 0.001,
        _ => return None,
    };
    finite(amount * multiplier).map(FieldValue::Float)
}

pub fn normalize_coordinates(text: &str) -> Option<FieldValue> {
    let caps = COORDINATES_RE.captures(text)?;
    let lat = finite(caps[1].parse().ok()?)?;
    let lon = finite(caps[2].parse().ok()?)?;
    Some(FieldValue::Coordinates(lat, lon))
}

/// 末尾の `*` `#` と空白を除く
pub fn normalize_text(text: &str) -> Option<FieldValue> {
    let trimmed = text.trim_end_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());
    if is_unknown(trimmed) {
        return None;
    }
    Some(FieldValue::Text(trimmed.to_string()))
}
