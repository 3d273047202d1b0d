/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! ネイティブクライアントライブラリの実行環境を整えるモジュール
//!
//! ライブラリ検索パスにクライアントライブラリのパス(マーカ)が含まれていない
//! 場合は、検索パスを補正した環境で自分自身を再起動する。再起動後のプロセス
//! は補正済みの環境を引き継ぐため、再起動は高々1回で収束する。
//!

pub(crate) mod privilege;

use std::convert::Infallible;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;

use crate::error::AppError;

/// ライブラリ検索パスを表す環境変数名
pub(crate) const SEARCH_PATH_VAR: &str = if cfg!(windows) {
    "PATH"
} else {
    "LD_LIBRARY_PATH"
};

/// パスリストの区切り文字
pub(crate) const PATH_LIST_SEPARATOR: char = if cfg!(windows) {
    ';'
} else {
    ':'
};

///
/// 検索パスにマーカが含まれているか否かの判定
///
/// # 引数
/// * `marker` - クライアントライブラリのパス(空文字の場合は判定不要)
/// * `search_path` - 検索パス環境変数の値(未定義の場合は`None`)
///
/// # 戻り値
/// マーカが空文字か、検索パスにマーカが含まれている場合は`true`を返す。
///
pub(crate) fn probe(marker: &str, search_path: Option<&str>) -> bool {
    marker.is_empty() || search_path.unwrap_or("").contains(marker)
}

///
/// 検索パスへのマーカの追記
///
/// # 戻り値
/// 補正後の検索パスを返す。元の値が未定義(または空)の場合はマーカのみを返
/// す。
///
/// # 注記
/// 元の値はUTF-8として解釈せず、バイト列のまま引き継ぐ。
///
pub(crate) fn extend_search_path(current: Option<&OsStr>, marker: &str) -> OsString {
    match current {
        Some(path) if !path.is_empty() => {
            let mut value = path.to_os_string();
            value.push(PATH_LIST_SEPARATOR.to_string());
            value.push(marker);
            value
        }
        _ => OsString::from(marker),
    }
}

///
/// 実行環境が整っていることを表すトークン
///
/// # 注記
/// このモジュールの外からは生成できない。ドライバのロードはこのトークンを要
/// 求するため、環境の確認を経ずにドライバをロードすることはできない。
///
#[derive(Debug)]
pub(crate) struct EnvReady {
    _private: (),
}

///
/// 再起動の内容をパックした構造体
///
#[derive(Debug, Clone)]
pub(crate) struct RelaunchPlan {
    /// 実行ファイルのパス
    program: PathBuf,

    /// 起動時の引数ベクタ(先頭はargv[0])
    argv: Vec<OsString>,

    /// 補正対象の環境変数名
    var: &'static str,

    /// 補正後の環境変数の値
    value: OsString,
}

impl RelaunchPlan {
    ///
    /// 実行ファイルのパスへのアクセサ
    ///
    #[cfg(test)]
    pub(crate) fn program(&self) -> PathBuf {
        self.program.clone()
    }

    ///
    /// 引数ベクタへのアクセサ
    ///
    pub(crate) fn argv(&self) -> Vec<OsString> {
        self.argv.clone()
    }

    ///
    /// 再起動後のプロセスに渡す環境変数(名前と値)
    ///
    pub(crate) fn env(&self) -> (&'static str, OsString) {
        (self.var, self.value.clone())
    }

    ///
    /// 再起動用のコマンドオブジェクトの生成
    ///
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);

        if let Some(args) = self.argv.get(1..) {
            cmd.args(args);
        }

        #[cfg(unix)]
        if let Some(arg0) = self.argv.first() {
            use std::os::unix::process::CommandExt;
            cmd.arg0(arg0);
        }

        cmd.env(self.var, &self.value);
        cmd
    }

    ///
    /// プロセスイメージの置き換え
    ///
    /// # 戻り値
    /// 成功した場合は制御が戻らない。新しいイメージを起動できなかった場合は
    /// エラー情報を`Err()`でラップして返す。
    ///
    /// # 注記
    /// Windowsにはexec相当の機能が無いため、子プロセスとして起動して終了を待
    /// ち、その終了ステータスで自プロセスを終了する。
    ///
    pub(crate) fn exec(&self) -> Result<Infallible> {
        log::debug!(
            "relaunch {} with {}={}",
            self.program.display(),
            self.var,
            self.value.to_string_lossy()
        );

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            let err = self.command().exec();
            Err(AppError::Relaunch(
                format!("{}: {}", self.program.display(), err)
            ).into())
        }

        #[cfg(not(unix))]
        {
            match self.command().status() {
                Ok(status) => std::process::exit(status.code().unwrap_or(1)),
                Err(err) => Err(AppError::Relaunch(
                    format!("{}: {}", self.program.display(), err)
                ).into()),
            }
        }
    }

    ///
    /// 再起動後のプロセスが観測するブートストラップコンテキストの生成
    ///
    #[cfg(test)]
    pub(crate) fn successor(&self, marker: &str) -> BootstrapContext {
        BootstrapContext::new(
            marker,
            Some(self.value.clone()),
            self.program.clone(),
            self.argv.clone(),
        )
    }
}

///
/// ブートストラップの判定結果
///
#[derive(Debug)]
pub(crate) enum Bootstrap {
    /// 環境は整っている(そのまま処理を継続する)
    Proceed(EnvReady),

    /// 環境を補正して再起動する必要がある
    Relaunch(RelaunchPlan),
}

///
/// ブートストラップに必要なプロセス情報を集約する構造体
///
#[derive(Debug, Clone)]
pub(crate) struct BootstrapContext {
    /// クライアントライブラリのパス
    marker: String,

    /// 起動時点の検索パスの値
    search_path: Option<OsString>,

    /// 実行ファイルのパス
    program: PathBuf,

    /// 起動時の引数ベクタ
    argv: Vec<OsString>,
}

impl BootstrapContext {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new<S>(
        marker: S,
        search_path: Option<OsString>,
        program: PathBuf,
        argv: Vec<OsString>,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            marker: marker.into(),
            search_path,
            program,
            argv,
        }
    }

    ///
    /// 現在のプロセスの情報からのオブジェクトの生成
    ///
    /// # 戻り値
    /// 実行ファイルのパスが取得できなかった場合はエラー情報を`Err()`でラップ
    /// して返す(再起動が不可能なため)。
    ///
    pub(crate) fn from_process<S>(marker: S) -> Result<Self>
    where
        S: Into<String>,
    {
        let program = std::env::current_exe()
            .map_err(|err| AppError::Relaunch(format!("current_exe: {}", err)))?;

        Ok(Self::new(
            marker,
            std::env::var_os(SEARCH_PATH_VAR),
            program,
            std::env::args_os().collect(),
        ))
    }

    ///
    /// 引数ベクタ(ログ出力用)
    ///
    pub(crate) fn argv_lossy(&self) -> Vec<String> {
        self.argv.iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    ///
    /// 検索パスの判定
    ///
    pub(crate) fn probe(&self) -> bool {
        let search_path = self.search_path.as_ref().map(|val| val.to_string_lossy());
        probe(&self.marker, search_path.as_deref())
    }

    ///
    /// 実行環境の確認
    ///
    /// # 戻り値
    /// 環境が整っていれば`Bootstrap::Proceed`を、整っていなければ再起動の内
    /// 容を`Bootstrap::Relaunch`でラップして返す。
    ///
    pub(crate) fn ensure(&self) -> Bootstrap {
        if self.probe() {
            return Bootstrap::Proceed(EnvReady { _private: () });
        }

        log::info!(
            "{} doesn't contain {}, relaunch required",
            SEARCH_PATH_VAR,
            self.marker
        );

        Bootstrap::Relaunch(RelaunchPlan {
            program: self.program.clone(),
            argv: self.argv.clone(),
            var: SEARCH_PATH_VAR,
            value: extend_search_path(self.search_path.as_deref(), &self.marker),
        })
    }
}

#[cfg(test)]
pub(crate) fn ready_for_test() -> EnvReady {
    EnvReady { _private: () }
}
