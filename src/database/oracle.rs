/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! oracleクレートによるドライバ実装
//!

use std::sync::Arc;

use anyhow::Result;
use oracle::sql_type::OracleType;
use oracle::{Connection, ResultSet, Version};

use crate::bootstrap::EnvReady;
use crate::error::AppError;
use super::types::{ColumnInfo, Value};
use super::{Credentials, Cursor, DbConnection, Driver, DriverFactory};

///
/// oracleクレートのエラーをConnectionErrorに変換する
///
fn to_connection_error(err: oracle::Error) -> anyhow::Error {
    let msg = err.to_string();

    // DPI-1047はクライアントライブラリのロード失敗
    if msg.contains("DPI-1047") {
        AppError::Connection(format!("Oracle client library could not be loaded: {}", msg))
            .into()
    } else {
        AppError::Connection(msg).into()
    }
}

///
/// Oracleドライバのファクトリ
///
pub(crate) struct OracleDriverFactory;

// DriverFactoryトレイトの実装
impl DriverFactory for OracleDriverFactory {
    fn create(&self, _ready: &EnvReady) -> Result<Box<dyn Driver>> {
        // クライアントライブラリは最初の呼び出しでロードされる
        let version = Version::client().map_err(to_connection_error)?;
        Ok(Box::new(OracleDriver { version }))
    }
}

///
/// ロード済みのOracleドライバ
///
struct OracleDriver {
    /// クライアントライブラリのバージョン
    version: Version,
}

// Driverトレイトの実装
impl Driver for OracleDriver {
    fn client_version(&self) -> Result<String> {
        Ok(self.version.to_string())
    }

    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn DbConnection>> {
        let conn = Connection::connect(
            credentials.login(),
            credentials.password(),
            credentials.connect_string(),
        )
        .map_err(to_connection_error)?;

        Ok(Box::new(OracleConnection { conn: Arc::new(conn) }))
    }
}

///
/// Oracleへの接続
///
struct OracleConnection {
    conn: Arc<Connection>,
}

// DbConnectionトレイトの実装
impl DbConnection for OracleConnection {
    fn cursor(&self) -> Result<Box<dyn Cursor>> {
        Ok(Box::new(OracleCursor {
            conn: self.conn.clone(),
            rows: None,
            columns: Vec::new(),
        }))
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.commit().map_err(to_connection_error)
    }

    fn close(&mut self) -> Result<()> {
        self.conn.close().map_err(to_connection_error)
    }
}

///
/// Oracleのカーソル
///
struct OracleCursor {
    /// 接続
    conn: Arc<Connection>,

    /// 実行中の問い合わせの結果セット
    rows: Option<ResultSet<'static, oracle::Row>>,

    /// 実行中の問い合わせのカラム情報(型情報付き)
    columns: Vec<(ColumnInfo, OracleType)>,
}

impl OracleCursor {
    ///
    /// 1カラム分の値の取り出し
    ///
    /// # 注記
    /// NUMBERは38桁まで格納できるため、整数スケールのものも一旦文字列で受
    /// け取り、i64に収まる場合のみ整数として扱う。
    ///
    fn value(row: &oracle::Row, idx: usize, oracle_type: &OracleType) -> Result<Value> {
        let value = match oracle_type {
            OracleType::Number(_, 0) | OracleType::Int64 => {
                row.get::<usize, Option<String>>(idx)
                    .map_err(to_connection_error)?
                    .map(|text| integer_or_text(&text))
            }

            OracleType::Number(_, _) | OracleType::Float(_) => {
                row.get::<usize, Option<String>>(idx)
                    .map_err(to_connection_error)?
                    .map(Value::Text)
            }

            OracleType::BinaryFloat | OracleType::BinaryDouble => {
                row.get::<usize, Option<f64>>(idx)
                    .map_err(to_connection_error)?
                    .map(Value::Float)
            }

            OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
                row.get::<usize, Option<Vec<u8>>>(idx)
                    .map_err(to_connection_error)?
                    .map(Value::Bytes)
            }

            _ => {
                row.get::<usize, Option<String>>(idx)
                    .map_err(to_connection_error)?
                    .map(Value::Text)
            }
        };

        Ok(value.unwrap_or(Value::Null))
    }
}

///
/// 整数スケールのNUMBERの文字列表現から値への変換
///
/// # 戻り値
/// i64に収まる場合は`Value::Integer`を、収まらない場合は桁を落とさずに
/// `Value::Text`を返す。
///
fn integer_or_text(text: &str) -> Value {
    match text.trim().parse::<i64>() {
        Ok(n) => Value::Integer(n),
        Err(_) => Value::Text(text.to_string()),
    }
}

// Cursorトレイトの実装
impl Cursor for OracleCursor {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.rows = None;
        self.columns.clear();

        let mut stmt = self.conn.statement(sql).build().map_err(to_connection_error)?;

        if stmt.is_query() {
            // 解析済みの文をそのまま結果セットに変換する
            let rows = stmt.into_result_set::<oracle::Row>(&[])
                .map_err(to_connection_error)?;
            self.columns = rows.column_info()
                .iter()
                .map(|info| (ColumnInfo::new(info.name()), info.oracle_type().clone()))
                .collect();
            self.rows = Some(rows);

        } else {
            stmt.execute(&[]).map_err(to_connection_error)?;
            log::debug!("{} row(s) affected", stmt.row_count().unwrap_or(0));
        }

        Ok(())
    }

    fn columns(&self) -> Result<Vec<ColumnInfo>> {
        Ok(self.columns.iter().map(|(info, _)| info.clone()).collect())
    }

    fn fetch_raw(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };

        match rows.next() {
            Some(row) => {
                let row = row.map_err(to_connection_error)?;
                let values = self.columns.iter()
                    .enumerate()
                    .map(|(idx, (_, oracle_type))| Self::value(&row, idx, oracle_type))
                    .collect::<Result<Vec<Value>>>()?;

                Ok(Some(values))
            }

            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.rows = None;
        self.columns.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    ///
    /// i64の範囲を超える整数は桁を保ったまま文字列として扱うこと
    ///
    #[test]
    fn wide_integer_falls_back_to_text() {
        assert_eq!(integer_or_text("42"), Value::Integer(42));
        assert_eq!(integer_or_text("-9223372036854775808"), Value::Integer(i64::MIN));
        assert_eq!(
            integer_or_text("100000000000000000000"),
            Value::Text("100000000000000000000".into())
        );
    }

    #[test]
    fn driver_errors_are_connection_errors() {
        let err = to_connection_error(
            oracle::Error::new(oracle::ErrorKind::InvalidColumnIndex, "column index 3")
        );
        assert_eq!(
            crate::error::app_error(&err).map(AppError::kind),
            Some("ConnectionError")
        );
    }
}
