/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! メールによる障害通知を提供するモジュール
//!

use anyhow::{Context, Result};
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};

/// SMTPのポート番号
pub(crate) const SMTP_PORT: u16 = 25;

/// 例外通知の優先度
pub(crate) const PRIORITY_HIGH: &str = "1";

///
/// 通知本文の生成
///
/// # 引数
/// * `from_name` - 送信元のプログラム名
/// * `subject` - 見出し
/// * `text` - 本文
///
pub(crate) fn notify_text(from_name: &str, subject: &str, text: &str) -> String {
    format!(
        "Message from: {}\n\
         Subject: {}\n\
         \n\
         {}\n\
         \n\
         --\n\
         This message was generated automatically, please do not reply.\n",
        from_name, subject, text
    )
}

///
/// 送信するメールの内容
///
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Mail {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) body: String,
    pub(crate) priority: String,
}

///
/// 通知手段のインタフェース
///
pub(crate) trait Notifier {
    ///
    /// メールの送信
    ///
    fn send(&self, mail: &Mail) -> Result<()>;
}

///
/// X-Priorityヘッダ
///
#[derive(Debug, Clone)]
struct XPriority(String);

// Headerトレイトの実装
impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

///
/// 平文SMTPで送信する通知手段
///
pub(crate) struct SmtpNotifier {
    /// メールサーバのホスト名
    host: String,
}

impl SmtpNotifier {
    pub(crate) fn new<S>(host: S) -> Self
    where
        S: Into<String>,
    {
        Self { host: host.into() }
    }
}

///
/// 送信用メッセージの組み立て
///
fn build_message(mail: &Mail) -> Result<Message> {
    // 宛先はカンマ区切りで複数指定できる
    let mut builder = Message::builder()
        .from(mail.from.parse::<Mailbox>().context("sender address")?)
        .subject(mail.subject.clone())
        .header(XPriority(mail.priority.clone()));

    for to in mail.to.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        builder = builder.to(to.parse::<Mailbox>().with_context(|| format!("recipient {}", to))?);
    }

    Ok(builder.body(mail.body.clone())?)
}

// Notifierトレイトの実装
impl Notifier for SmtpNotifier {
    fn send(&self, mail: &Mail) -> Result<()> {
        let message = build_message(mail)?;

        let transport = SmtpTransport::builder_dangerous(&self.host)
            .port(SMTP_PORT)
            .build();

        transport.send(&message)
            .with_context(|| format!("send mail via {}:{}", self.host, SMTP_PORT))?;

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> Mail {
        Mail {
            from: "orabase@example.com".into(),
            to: to.into(),
            subject: "EXCEPTION - orabase".into(),
            body: notify_text("orabase", "EXCEPTION", "trace."),
            priority: PRIORITY_HIGH.into(),
        }
    }

    ///
    /// 組み立てたメッセージにX-Priorityヘッダと件名が含まれること
    ///
    #[test]
    fn message_has_priority_header() {
        let message = build_message(&mail("orabase@example.com")).unwrap();
        let text = String::from_utf8(message.formatted()).unwrap();

        assert!(text.contains("X-Priority: 1"));
        assert!(text.contains("Subject: EXCEPTION - orabase"));
        assert!(text.contains("From: orabase@example.com"));
        assert!(text.contains("To: orabase@example.com"));
    }

    #[test]
    fn multiple_recipients() {
        let message = build_message(&mail("a@example.com, b@example.com")).unwrap();
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn invalid_sender_is_error() {
        let mut bad = mail("orabase@example.com");
        bad.from = "not an address".into();
        assert!(build_message(&bad).is_err());
    }

    #[test]
    fn notify_text_contains_trace() {
        let text = notify_text("orabase", "EXCEPTION", "line1\nline2.");
        assert!(text.starts_with("Message from: orabase\nSubject: EXCEPTION\n"));
        assert!(text.contains("line1\nline2."));
    }
}
