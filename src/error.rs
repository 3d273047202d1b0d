/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! アプリケーション固有のエラー種別を定義するモジュール
//!

use thiserror::Error;

///
/// エラー種別を表す列挙型
///
/// # 注記
/// 各エラーは`anyhow::Error`の根本原因として格納され、呼び出し側では
/// `downcast_ref()`で種別を判定する。
///
#[derive(Debug, Error)]
pub(crate) enum AppError {
    /// 管理者(root)権限での起動
    #[error("user has admin/root rights")]
    Privilege,

    /// コンフィギュレーションの不備
    #[error("config error: {0}")]
    Config(String),

    /// 再起動イメージの起動失敗
    #[error("relaunch failed: {0}")]
    Relaunch(String),

    /// ドライバ/セッション関連の失敗
    #[error("connection error: {0}")]
    Connection(String),

    /// その他のコマンド処理の失敗
    #[error("command error: {0}")]
    Command(String),
}

impl AppError {
    ///
    /// エラー種別名の取得
    ///
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Privilege => "PrivilegeError",
            Self::Config(_) => "ConfigError",
            Self::Relaunch(_) => "RelaunchError",
            Self::Connection(_) => "ConnectionError",
            Self::Command(_) => "CommandError",
        }
    }
}

///
/// anyhowエラーからエラー種別を取り出す
///
/// # 戻り値
/// エラーチェーン中に`AppError`が含まれていればその参照を返す。
///
pub(crate) fn app_error(err: &anyhow::Error) -> Option<&AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>())
}
