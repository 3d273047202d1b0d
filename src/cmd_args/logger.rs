/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! ロガーの初期化処理をまとめたモジュール
//!

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use flexi_logger::writers::{FileLogWriter, LogWriter};
use flexi_logger::{
    DeferredNow, Duplicate, FileSpec, Logger, LoggerHandle, WriteMode
};
use log::{LevelFilter, Record};

use super::syslog::SyslogWriter;

///
/// ログ出力の設定をパックした構造体
///
#[derive(Debug, Clone)]
pub(crate) struct LogSettings {
    /// ログファイルの出力先ディレクトリ
    pub(crate) log_dir: PathBuf,

    /// デバッグログを出力するか否か
    pub(crate) debug: bool,

    /// syslogの送信先とタグ
    pub(crate) syslog: Option<(String, String)>,
}

///
/// ログファイル名に付与するタイムスタンプ
///
/// # 注記
/// `YYYYMMDD-HHMMSSffffff`の形式(マイクロ秒まで)。
///
pub(crate) fn timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S%6f").to_string()
}

///
/// ロガーの初期化
///
/// # 引数
/// * `settings` - ログ出力の設定
///
/// # 戻り値
/// 初期化に成功した場合はロガーハンドルを`Ok()`でラップして返す。ハンドル
/// はプログラムの終了まで保持すること。
///
/// # 注記
/// 出力先は以下の通り。
///
///  - 標準出力 (INFO以上、メッセージのみ)
///  - info-<timestamp>.log (INFO以上)
///  - syslog (INFO以上、設定で有効な場合のみ)
///  - debug-<timestamp>.log (DEBUG以上、デバッグ指定時のみ)
///
pub(crate) fn init(settings: &LogSettings) -> Result<LoggerHandle> {
    let level = if settings.debug { "debug" } else { "info" };
    let writer = build_writer(settings, &timestamp(&Local::now()))?;

    let handle = Logger::try_with_str(level)?
        .log_to_writer(Box::new(writer))
        .duplicate_to_stdout(Duplicate::Info)
        .format_for_stdout(console_format)
        .write_mode(WriteMode::Direct)
        .start()?;

    Ok(handle)
}

///
/// ファイル/syslog出力を束ねたライターの生成
///
fn build_writer(settings: &LogSettings, stamp: &str) -> Result<FanoutWriter> {
    std::fs::create_dir_all(&settings.log_dir)
        .with_context(|| format!("create {}", settings.log_dir.display()))?;

    let dir = std::fs::canonicalize(&settings.log_dir)?;
    let mut writer = FanoutWriter::default();

    writer.push(
        LevelFilter::Info,
        Box::new(file_writer(&dir.join(format!("info-{}.log", stamp)))?),
    );

    if let Some((server, tag)) = &settings.syslog {
        writer.push(LevelFilter::Info, Box::new(SyslogWriter::connect(server, tag)?));
    }

    if settings.debug {
        writer.push(
            LevelFilter::Debug,
            Box::new(file_writer(&dir.join(format!("debug-{}.log", stamp)))?),
        );
    }

    Ok(writer)
}

///
/// ファイルライターの生成
///
fn file_writer(path: &Path) -> Result<FileLogWriter> {
    Ok(FileLogWriter::builder(FileSpec::try_from(path)?.use_timestamp(false))
        .format(file_format)
        .append()
        .try_build()?)
}

///
/// ファイル出力用のフォーマット関数
///
fn file_format(writer: &mut dyn Write, now: &mut DeferredNow, record: &Record)
    -> std::io::Result<()>
{
    write!(
        writer,
        "[{}] {:<8} {}",
        now.format("%Y-%m-%d %H:%M:%S,%3f"),
        record.level(),
        record.args(),
    )
}

///
/// 標準出力用のフォーマット関数(メッセージのみ)
///
fn console_format(writer: &mut dyn Write, _now: &mut DeferredNow, record: &Record)
    -> std::io::Result<()>
{
    write!(writer, "{}", record.args())
}

///
/// 出力レベルの異なる複数のライターへ振り分けるライター
///
#[derive(Default)]
pub(crate) struct FanoutWriter {
    sinks: Vec<(LevelFilter, Box<dyn LogWriter>)>,
}

impl FanoutWriter {
    ///
    /// 出力先の追加
    ///
    pub(crate) fn push(&mut self, level: LevelFilter, writer: Box<dyn LogWriter>) {
        self.sinks.push((level, writer));
    }
}

// LogWriterトレイトの実装
impl LogWriter for FanoutWriter {
    fn write(&self, now: &mut DeferredNow, record: &Record) -> std::io::Result<()> {
        let mut result = Ok(());

        // 一つの出力先の失敗で他の出力先への出力を止めない
        for (level, sink) in &self.sinks {
            if record.level() <= *level {
                if let Err(err) = sink.write(now, record) {
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
        }

        result
    }

    fn flush(&self) -> std::io::Result<()> {
        for (_, sink) in &self.sinks {
            sink.flush()?;
        }

        Ok(())
    }

    fn max_log_level(&self) -> LevelFilter {
        self.sinks.iter()
            .map(|(level, _)| *level)
            .max()
            .unwrap_or(LevelFilter::Off)
    }

    fn shutdown(&self) {
        for (_, sink) in &self.sinks {
            sink.shutdown();
        }
    }
}
