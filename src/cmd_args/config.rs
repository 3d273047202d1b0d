/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! コンフィギュレーション情報の定義
//!

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::database::Credentials;
use crate::error::AppError;

///
/// コンフィギュレーションデータを集約する構造体
///
#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    main: MainInfo,
    syslog: SyslogInfo,
    email: EmailInfo,
    oracle: OracleInfo,
}

impl Config {
    ///
    /// プログラム名へのアクセサ
    ///
    pub(crate) fn program(&self) -> String {
        self.main.program.clone()
    }

    ///
    /// ログ出力先ディレクトリへのアクセサ
    ///
    pub(crate) fn log_dir(&self) -> PathBuf {
        self.main.log_dir.clone()
    }

    ///
    /// syslog出力の有無
    ///
    /// # 注記
    /// `syslog_enable`が"Y"の場合のみ有効とする。
    ///
    pub(crate) fn syslog_enabled(&self) -> bool {
        self.syslog.syslog_enable == "Y"
    }

    ///
    /// syslogに付与するタグ
    ///
    pub(crate) fn syslog_pname(&self) -> String {
        self.syslog.syslog_pname.clone()
    }

    ///
    /// syslogサーバのホスト名
    ///
    pub(crate) fn syslog_server(&self) -> String {
        self.syslog.syslog_server.clone()
    }

    pub(crate) fn mail_host(&self) -> String {
        self.email.mail_host.clone()
    }

    pub(crate) fn sender_mail(&self) -> String {
        self.email.sender_mail.clone()
    }

    ///
    /// クライアントライブラリのパス(マーカ)へのアクセサ
    ///
    pub(crate) fn ic_path(&self) -> String {
        self.oracle.ic_path.clone()
    }

    ///
    /// データベースへの接続情報
    ///
    pub(crate) fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.oracle.login,
            &self.oracle.password,
            &self.oracle.host,
            &self.oracle.sid,
        )
    }
}

///
/// [main]セクション
///
#[derive(Debug, Deserialize)]
struct MainInfo {
    /// プログラム名(ログや通知に使用)
    program: String,

    /// ログファイルの出力先
    log_dir: PathBuf,
}

///
/// [syslog]セクション
///
#[derive(Debug, Deserialize)]
struct SyslogInfo {
    syslog_enable: String,
    syslog_pname: String,
    syslog_server: String,
}

///
/// [email]セクション
///
#[derive(Debug, Deserialize)]
struct EmailInfo {
    mail_host: String,
    sender_mail: String,
}

///
/// [oracle]セクション
///
#[derive(Deserialize)]
struct OracleInfo {
    /// クライアントライブラリのパス(空の場合はシステムの設定を使う)
    #[serde(default)]
    ic_path: String,

    login: String,
    password: String,
    host: String,
    sid: String,
}

// Debugトレイトの実装(パスワードは出力しない)
impl std::fmt::Debug for OracleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleInfo")
            .field("ic_path", &self.ic_path)
            .field("login", &self.login)
            .field("host", &self.host)
            .field("sid", &self.sid)
            .finish_non_exhaustive()
    }
}

///
/// 実行ファイルと同じ場所にあるコンフィギュレーションファイルのパス
///
/// # 注記
/// ファイル名は実行ファイル名の拡張子を".toml"に置き換えたもの。
///
pub(crate) fn default_path(exe: &Path) -> PathBuf {
    exe.with_extension("toml")
}

///
/// コンフィギュレーション情報の読み込み
///
/// # 戻り値
/// 読み込みに失敗した場合は`AppError::Config`を`Err()`でラップして返す。
///
pub(crate) fn load<P>(path: P) -> Result<Config>
where
    P: AsRef<Path>
{
    let path = path.as_ref();

    let text = std::fs::read_to_string(path)
        .map_err(|err| AppError::Config(format!("{}: {}", path.display(), err)))?;

    parse(&text)
        .map_err(|err| AppError::Config(format!("{}: {}", path.display(), err)).into())
}

///
/// コンフィギュレーション文字列の解析
///
pub(crate) fn parse(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
pub(crate) const SAMPLE: &str = r#"
[main]
program = "orabase"
log_dir = "/var/log/orabase"

[syslog]
syslog_enable = "N"
syslog_pname = "orabase"
syslog_server = "localhost"

[email]
mail_host = "mail.example.com"
sender_mail = "orabase@example.com"

[oracle]
ic_path = "/opt/oracle/instantclient_19_8"
login = "scott"
password = "tiger"
host = "dbhost"
sid = "ORCL"
"#;
