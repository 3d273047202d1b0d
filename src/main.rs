/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! プログラムのエントリポイント
//!

mod bootstrap;
mod cmd_args;
pub(crate) mod command;
pub(crate) mod database;
mod error;
mod notify;

use anyhow::Result;

use bootstrap::privilege;
use bootstrap::BootstrapContext;
use cmd_args::{logger, Options};
use command::{App, Outcome};
use database::oracle::OracleDriverFactory;
use database::SessionManager;
use notify::SmtpNotifier;

///
/// プログラムのエントリポイント
///
fn main() {
    /*
     * 実行権限のチェック(ログの初期化前に行う)
     */
    if let Err(err) = privilege::check_admin() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    /*
     * コマンドラインオプションのパース
     */
    let opts = cmd_args::parse();

    match run(opts) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(1);
        }
    }
}

///
/// プログラムの実行関数
///
/// # 引数
/// * `opts` - オプション情報をパックしたオブジェクト
///
/// # 戻り値
/// 処理を完了した場合は終了ステータスを`Ok()`でラップして返す。処理に失敗
/// した場合はエラー情報を`Err()`でラップして返す。
///
/// # 注記
/// 再起動が必要な場合はこの関数から制御が戻らない。
///
fn run(opts: Options) -> Result<i32> {
    let config = opts.load_config()?;

    // ハンドルはプログラムの終了まで保持する
    let _logger = logger::init(&opts.log_settings(&config))?;

    let bootstrap = BootstrapContext::from_process(config.ic_path())?;
    let notifier = SmtpNotifier::new(config.mail_host());

    let mut app = App::new(
        config,
        bootstrap,
        SessionManager::new(Box::new(OracleDriverFactory)),
        Box::new(notifier),
    );

    let outcome = app.run(opts.command(), &mut std::io::stdout())?;

    match outcome {
        Outcome::Success => Ok(0),
        Outcome::Failed => Ok(1),
        Outcome::Relaunch(plan) => {
            // プロセスイメージの置き換え前にログを吐き出しておく
            log::logger().flush();
            match plan.exec()? {}
        }
    }
}
