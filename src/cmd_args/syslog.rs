/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! UDPでsyslogサーバにログを送信するライター
//!

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::{anyhow, Result};
use flexi_logger::DeferredNow;
use flexi_logger::writers::LogWriter;
use log::{Level, LevelFilter, Record};

/// syslogのポート番号
pub(crate) const SYSLOG_PORT: u16 = 514;

/// ファシリティ(user)
const FACILITY_USER: u8 = 1;

///
/// ログレベルからsyslogのseverityへの変換
///
fn severity(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

///
/// 送信するメッセージの組み立て
///
/// # 注記
/// `<PRI>タグ: メッセージ`の形式とする。
///
pub(crate) fn frame(tag: &str, level: Level, message: &str) -> String {
    let pri = FACILITY_USER * 8 + severity(level);
    format!("<{}>{}: {}", pri, tag, message)
}

///
/// syslogライター
///
pub(crate) struct SyslogWriter {
    /// 送信用ソケット(接続済み)
    socket: UdpSocket,

    /// メッセージに付与するタグ
    tag: String,

    /// 出力するログレベルの上限
    level: LevelFilter,
}

impl SyslogWriter {
    ///
    /// サーバ名を指定したライターの生成
    ///
    /// # 引数
    /// * `server` - syslogサーバのホスト名(ポートは514固定)
    /// * `tag` - メッセージに付与するタグ
    ///
    pub(crate) fn connect(server: &str, tag: &str) -> Result<Self> {
        let addr = (server, SYSLOG_PORT)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| anyhow!("can't resolve syslog server {}", server))?;

        Self::connect_to(addr, tag)
    }

    ///
    /// アドレスを指定したライターの生成
    ///
    pub(crate) fn connect_to(addr: SocketAddr, tag: &str) -> Result<Self> {
        let local: SocketAddr = if addr.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(addr)?;

        Ok(Self {
            socket,
            tag: tag.to_string(),
            level: LevelFilter::Info,
        })
    }
}

// LogWriterトレイトの実装
impl LogWriter for SyslogWriter {
    fn write(&self, _now: &mut DeferredNow, record: &Record) -> std::io::Result<()> {
        let msg = frame(&self.tag, record.level(), &record.args().to_string());
        self.socket.send(msg.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }

    fn max_log_level(&self) -> LevelFilter {
        self.level
    }
}
