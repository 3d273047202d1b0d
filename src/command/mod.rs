/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! サブコマンドの処理を提供するモジュール
//!

pub(crate) mod db_check;
pub(crate) mod no_arg;
pub(crate) mod with_arg;

use std::io::Write;
use std::time::Instant;

use anyhow::Result;

use crate::bootstrap::{Bootstrap, BootstrapContext, RelaunchPlan};
use crate::cmd_args::config::Config;
use crate::cmd_args::Command;
use crate::database::{Session, SessionManager};
use crate::error::AppError;
use crate::notify::{notify_text, Mail, Notifier, PRIORITY_HIGH};

///
/// コマンドの実行結果
///
#[derive(Debug)]
pub(crate) enum Control {
    /// 処理完了
    Done,

    /// 環境を補正して再起動する
    Relaunch(RelaunchPlan),
}

///
/// コマンドの実行に必要な情報を集約する構造体
///
pub(crate) struct CommandContext<'a> {
    /// コンフィギュレーション
    pub(crate) config: &'a Config,

    /// ブートストラップ情報
    pub(crate) bootstrap: &'a BootstrapContext,

    /// セッションマネージャ
    pub(crate) sessions: &'a mut SessionManager,

    /// オープン中のセッション(DBを使うコマンドのみ)
    pub(crate) session: Option<Session>,

    /// 結果の出力先
    pub(crate) out: &'a mut dyn Write,
}

impl CommandContext<'_> {
    ///
    /// オープン中のセッションへのアクセサ
    ///
    pub(crate) fn session(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| AppError::Command("no database session".into()).into())
    }
}

/// コマンドのハンドラ
pub(crate) type Handler = Box<dyn Fn(&mut CommandContext<'_>) -> Result<Control>>;

///
/// 処理時間をログに出力するラッパー
///
pub(crate) fn with_timing(handler: Handler) -> Handler {
    Box::new(move |ctx: &mut CommandContext<'_>| {
        let start = Instant::now();
        let control = handler(ctx)?;

        log::info!("Time elapsed (sec): {}", start.elapsed().as_secs_f64());
        Ok(control)
    })
}

///
/// 実行環境の確認とセッションの開閉を行うラッパー
///
/// # 注記
/// 実行環境が整っていない場合はセッションをオープンせずに再起動を要求する。
/// セッションはハンドラの成否にかかわらずクローズし、コミットはハンドラが
/// 要求し、かつ成功した場合にのみ行う。
///
pub(crate) fn with_session_bootstrap(handler: Handler) -> Handler {
    Box::new(move |ctx: &mut CommandContext<'_>| {
        let ready = match ctx.bootstrap.ensure() {
            Bootstrap::Proceed(ready) => ready,
            Bootstrap::Relaunch(plan) => return Ok(Control::Relaunch(plan)),
        };

        let credentials = ctx.config.credentials();
        ctx.session = Some(ctx.sessions.open(&ready, &credentials)?);

        let result = handler(ctx);

        let Some(mut session) = ctx.session.take() else {
            return result;
        };

        match result {
            Ok(control) => {
                let commit = session.commit_requested();
                session.close(commit)?;
                Ok(control)
            }

            Err(err) => {
                if let Err(close_err) = session.close(false) {
                    log::error!("close after failure: {:#}", close_err);
                }
                Err(err)
            }
        }
    })
}

///
/// ディスパッチテーブルの参照
///
/// # 戻り値
/// サブコマンドに対応するハンドラ(ラッパー適用済み)を返す。
///
pub(crate) fn handler_for(command: &Command) -> Handler {
    match command {
        Command::CmdNoArg(opts) => no_arg::handler(opts),
        Command::CmdWithArg(opts) => with_timing(with_arg::handler(opts)),
        Command::CmdDbCheck(opts) => with_session_bootstrap(db_check::handler(opts)),
    }
}

///
/// 実行全体の結果
///
#[derive(Debug)]
pub(crate) enum Outcome {
    /// 正常終了
    Success,

    /// 失敗(ログ出力と通知は済んでいる)
    Failed,

    /// 再起動が必要
    Relaunch(RelaunchPlan),
}

///
/// アプリケーション本体
///
pub(crate) struct App {
    /// コンフィギュレーション
    config: Config,

    /// ブートストラップ情報
    bootstrap: BootstrapContext,

    /// セッションマネージャ
    sessions: SessionManager,

    /// 障害通知の手段
    notifier: Box<dyn Notifier>,
}

impl App {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new(
        config: Config,
        bootstrap: BootstrapContext,
        sessions: SessionManager,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self { config, bootstrap, sessions, notifier }
    }

    ///
    /// コマンドの実行
    ///
    /// # 引数
    /// * `command` - 実行するサブコマンド
    /// * `out` - 結果の出力先
    ///
    /// # 戻り値
    /// 実行結果を返す。コマンドの失敗は`Outcome::Failed`として返し、通知の
    /// 送信に失敗した場合のみエラー情報を`Err()`でラップして返す。
    ///
    pub(crate) fn run(&mut self, command: &Command, out: &mut dyn Write) -> Result<Outcome> {
        log::info!("Start {}", self.config.program());
        log::info!("Command line - {:?}", self.bootstrap.argv_lossy());
        log::debug!(">>>>> Begin {} <<<<<", command.name());

        let handler = handler_for(command);
        let mut ctx = CommandContext {
            config: &self.config,
            bootstrap: &self.bootstrap,
            sessions: &mut self.sessions,
            session: None,
            out,
        };

        match handler(&mut ctx) {
            Ok(Control::Done) => {
                log::debug!(">>>>> End {} <<<<<", command.name());
                Ok(Outcome::Success)
            }

            Ok(Control::Relaunch(plan)) => Ok(Outcome::Relaunch(plan)),

            Err(err) => {
                drop(ctx);
                self.report(&err)?;
                Ok(Outcome::Failed)
            }
        }
    }

    ///
    /// 失敗のログ出力と通知
    ///
    fn report(&self, err: &anyhow::Error) -> Result<()> {
        let trace = format!("{:?}", err);

        log::error!("EXCEPTION - {}", err);
        log::error!("{}", trace);

        let program = self.config.program();
        let sender = self.config.sender_mail();

        self.notifier.send(&Mail {
            from: sender.clone(),
            to: sender,
            subject: format!("EXCEPTION - {}", program),
            body: notify_text(&program, "EXCEPTION", &format!("{}.", trace)),
            priority: PRIORITY_HIGH.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testlog {
    //! テスト用のログ収集

    use std::sync::{Mutex, Once};
    use std::thread::ThreadId;

    use log::{Level, LevelFilter, Log, Metadata, Record};

    static RECORDS: Mutex<Vec<(ThreadId, Level, String)>> = Mutex::new(Vec::new());
    static INIT: Once = Once::new();

    struct Collector;

    impl Log for Collector {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if let Ok(mut records) = RECORDS.lock() {
                records.push((
                    std::thread::current().id(),
                    record.level(),
                    record.args().to_string(),
                ));
            }
        }

        fn flush(&self) {}
    }

    ///
    /// ログ収集の開始
    ///
    pub(crate) fn install() {
        INIT.call_once(|| {
            let _ = log::set_logger(&Collector);
            log::set_max_level(LevelFilter::Debug);
        });
    }

    ///
    /// 現在のスレッドで出力された指定レベルのログ
    ///
    pub(crate) fn lines(level: Level) -> Vec<String> {
        let me = std::thread::current().id();

        RECORDS.lock()
            .map(|records| {
                records.iter()
                    .filter(|(id, lvl, _)| *id == me && *lvl == level)
                    .map(|(_, _, msg)| msg.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
