/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! コマンドライン引数を取り扱うモジュール
//!

pub(crate) mod config;
pub(crate) mod logger;
pub(crate) mod syslog;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::error::AppError;
use config::Config;
use logger::LogSettings;

///
/// グローバルオプション情報を格納する構造体
///
#[derive(Parser, Debug, Clone)]
#[command(
    name = "orabase",
    about = "Oracle application template",
    version,
    long_about = None,
)]
pub struct Options {
    /// デバッグログを出力する
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// コンフィギュレーションファイルのパス
    #[arg(short = 'c', long = "config")]
    config_path: Option<PathBuf>,

    /// 実行するサブコマンド
    #[command(subcommand)]
    command: Command,
}

impl Options {
    ///
    /// デバッグ指定の有無
    ///
    pub(crate) fn debug(&self) -> bool {
        self.debug
    }

    ///
    /// サブコマンドへのアクセサ
    ///
    pub(crate) fn command(&self) -> &Command {
        &self.command
    }

    ///
    /// コンフィギュレーションファイルのパス
    ///
    /// # 戻り値
    /// オプションで指定されていればそのパスを、指定されていなければ実行ファ
    /// イルと同じ場所にある`<実行ファイル名>.toml`を返す。
    ///
    pub(crate) fn config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config_path {
            return Ok(path.clone());
        }

        let exe = std::env::current_exe()
            .map_err(|err| AppError::Config(format!("current_exe: {}", err)))?;

        Ok(config::default_path(&exe))
    }

    ///
    /// コンフィギュレーションの読み込み
    ///
    pub(crate) fn load_config(&self) -> Result<Config> {
        config::load(self.config_path()?)
    }

    ///
    /// ログ出力設定の生成
    ///
    pub(crate) fn log_settings(&self, config: &Config) -> LogSettings {
        LogSettings {
            log_dir: config.log_dir(),
            debug: self.debug,
            syslog: config.syslog_enabled()
                .then(|| (config.syslog_server(), config.syslog_pname())),
        }
    }
}

///
/// サブコマンドの定義
///
#[derive(Clone, Debug, Subcommand)]
pub(crate) enum Command {
    /// 引数を持たない単純なコマンド
    CmdNoArg(PosOpts),

    /// 引数を1つ持つ単純なコマンド
    CmdWithArg(WithArgOpts),

    /// Oracleへの接続を確認するコマンド
    CmdDbCheck(PosOpts),
}

impl Command {
    ///
    /// コマンド名
    ///
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::CmdNoArg(_) => "cmd-no-arg",
            Self::CmdWithArg(_) => "cmd-with-arg",
            Self::CmdDbCheck(_) => "cmd-db-check",
        }
    }
}

///
/// 位置引数のみを持つサブコマンドのオプション
///
#[derive(Clone, Args, Debug)]
pub(crate) struct PosOpts {
    /// 位置引数
    #[arg()]
    pos_arg: String,
}

impl PosOpts {
    ///
    /// 位置引数へのアクセサ
    ///
    pub(crate) fn pos_arg(&self) -> String {
        self.pos_arg.clone()
    }

    #[cfg(test)]
    ///
    /// テスト用のコンストラクタ
    ///
    pub(crate) fn new_for_test(pos_arg: impl Into<String>) -> Self {
        Self { pos_arg: pos_arg.into() }
    }
}

///
/// サブコマンドcmd-with-argのオプション
///
#[derive(Clone, Args, Debug)]
pub(crate) struct WithArgOpts {
    /// コマンド固有の必須引数
    #[arg()]
    arg1: String,

    /// 位置引数
    #[arg()]
    pos_arg: String,
}

impl WithArgOpts {
    pub(crate) fn arg1(&self) -> String {
        self.arg1.clone()
    }

    pub(crate) fn pos_arg(&self) -> String {
        self.pos_arg.clone()
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(arg1: impl Into<String>, pos_arg: impl Into<String>) -> Self {
        Self {
            arg1: arg1.into(),
            pos_arg: pos_arg.into(),
        }
    }
}

///
/// コマンドライン引数のパース処理
///
/// # 注記
/// 不正な引数の場合はclapがエラーを表示し、非0のステータスで終了する。
///
pub(crate) fn parse() -> Options {
    Options::parse()
}
