/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! 問い合わせ結果を表現する型を定義するモジュール
//!

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

///
/// カラム値を表す列挙型
///
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    /// NULL
    Null,

    /// 文字列
    Text(String),

    /// 整数
    Integer(i64),

    /// 浮動小数点数
    Float(f64),

    /// バイナリ
    Bytes(Vec<u8>),
}

impl Value {
    ///
    /// NULLか否かの判定
    ///
    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// Displayトレイトの実装
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}

// Fromトレイトの実装
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

// Fromトレイトの実装
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

///
/// 結果セットのカラム情報
///
#[derive(Clone, Debug)]
pub(crate) struct ColumnInfo {
    /// カラム名(ドライバが報告したまま)
    name: String,
}

impl ColumnInfo {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self { name: name.into() }
    }

    ///
    /// カラム名へのアクセサ
    ///
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

///
/// カラム名をキーとした行データ
///
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Row(BTreeMap<String, Value>);

// Derefトレイトの実装
impl Deref for Row {
    type Target = BTreeMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// 位置指定の行データを名前付きの行データに変換する関数
pub(crate) type RowFactory = Box<dyn Fn(Vec<Value>) -> Row>;

///
/// ロウファクトリの生成
///
/// # 引数
/// * `columns` - 実行済みの問い合わせのカラム情報
///
/// # 戻り値
/// 行データの変換関数を返す。
///
/// # 注記
/// カラム名は生成時に一度だけ読み取り、小文字化する。変換時にはNULLを空文
/// 字列に置き換え、それ以外の値は型変換せずにそのまま格納する。
///
pub(crate) fn make_row_factory(columns: &[ColumnInfo]) -> RowFactory {
    let names: Vec<String> = columns.iter()
        .map(|col| col.name().to_lowercase())
        .collect();

    Box::new(move |values: Vec<Value>| {
        Row(names.iter()
            .cloned()
            .zip(values.into_iter().map(|val| {
                if val.is_null() {
                    Value::Text(String::new())
                } else {
                    val
                }
            }))
            .collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<ColumnInfo> {
        names.iter().map(|name| ColumnInfo::new(*name)).collect()
    }

    ///
    /// NULLが空文字に置き換わり、キーが小文字化されること
    ///
    #[test]
    fn null_becomes_empty_string() {
        let factory = make_row_factory(&columns(&["COL1", "COL2"]));
        let row = factory(vec![Value::Null, "x".into()]);

        let mut expected = BTreeMap::new();
        expected.insert("col1".to_string(), Value::Text(String::new()));
        expected.insert("col2".to_string(), Value::Text("x".to_string()));

        assert_eq!(*row, expected);
    }

    ///
    /// NULL以外の値は型を保ったまま格納されること
    ///
    #[test]
    fn values_pass_through_unchanged() {
        let factory = make_row_factory(&columns(&["Id", "RATE", "RAW_COL"]));
        let row = factory(vec![
            Value::Integer(7),
            Value::Float(0.5),
            Value::Bytes(vec![0xde, 0xad]),
        ]);

        assert_eq!(row.get("id"), Some(&Value::Integer(7)));
        assert_eq!(row.get("rate"), Some(&Value::Float(0.5)));
        assert_eq!(row.get("raw_col"), Some(&Value::Bytes(vec![0xde, 0xad])));
    }

    #[test]
    fn factory_is_reusable() {
        let factory = make_row_factory(&columns(&["A"]));

        assert_eq!(factory(vec![1.into()]).get("a"), Some(&Value::Integer(1)));
        assert_eq!(factory(vec![Value::Null]).get("a"), Some(&Value::Text("".into())));
    }

    #[test]
    fn bytes_display_as_hex() {
        assert_eq!(Value::Bytes(vec![0x0a, 0xff]).to_string(), "0AFF");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
