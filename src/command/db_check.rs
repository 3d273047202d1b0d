/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! cmd-db-checkサブコマンドの実装
//!

use crate::cmd_args::PosOpts;
use crate::error::AppError;
use super::{CommandContext, Control, Handler};

/// 接続確認用の問い合わせ
pub(crate) const SELECT_FROM_DUAL_SQL: &str = "SELECT 1 AS column1 FROM dual";

///
/// ハンドラの生成
///
/// # 注記
/// セッションの開閉はディスパッチテーブル側でラップする。
///
pub(crate) fn handler(opts: &PosOpts) -> Handler {
    let pos_arg = opts.pos_arg();

    Box::new(move |ctx: &mut CommandContext<'_>| {
        log::debug!("positional argument - {}", pos_arg);

        let cursor = ctx.session()?.read()?;

        // ロウファクトリはexecute()の中で設定される
        cursor.execute(SELECT_FROM_DUAL_SQL)?;

        let Some(row) = cursor.fetch_one()? else {
            return Err(AppError::Command("query returned no rows".into()).into());
        };

        if row.contains_key("column1") {
            writeln!(ctx.out, "Test Oracle - OK")?;
        } else {
            writeln!(ctx.out, "Test Oracle - ERROR")?;
        }

        Ok(Control::Done)
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::*;
    use crate::bootstrap::{ready_for_test, BootstrapContext};
    use crate::cmd_args::config::{parse, SAMPLE};
    use crate::database::mock::{Behavior, MockFactory};
    use crate::database::types::Value;
    use crate::database::SessionManager;

    ///
    /// セッションを用意した上でハンドラを直接実行する
    ///
    fn run_with(behavior: Behavior) -> (anyhow::Result<Control>, String) {
        let config = parse(SAMPLE).unwrap();
        let bootstrap = BootstrapContext::new(
            "",
            None,
            PathBuf::from("/opt/app/orabase"),
            vec![OsString::from("orabase")],
        );
        let (factory, _events) = MockFactory::new(behavior);
        let mut sessions = SessionManager::new(Box::new(factory));
        let session = sessions.open(&ready_for_test(), &config.credentials()).unwrap();

        let mut out = Vec::new();
        let result = {
            let mut ctx = CommandContext {
                config: &config,
                bootstrap: &bootstrap,
                sessions: &mut sessions,
                session: Some(session),
                out: &mut out,
            };

            handler(&PosOpts::new_for_test("pos"))(&mut ctx)
        };

        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn ok_when_column_present() {
        let (result, out) = run_with(Behavior {
            columns: vec!["COLUMN1".into()],
            rows: vec![vec![Value::Integer(1)]],
            ..Default::default()
        });

        assert!(matches!(result, Ok(Control::Done)));
        assert_eq!(out, "Test Oracle - OK\n");
    }

    ///
    /// 期待するカラムが無い場合はERRORを表示すること
    ///
    #[test]
    fn error_when_column_missing() {
        let (result, out) = run_with(Behavior {
            columns: vec!["OTHER".into()],
            rows: vec![vec![Value::Null]],
            ..Default::default()
        });

        assert!(matches!(result, Ok(Control::Done)));
        assert_eq!(out, "Test Oracle - ERROR\n");
    }

    #[test]
    fn empty_result_fails() {
        let (result, out) = run_with(Behavior {
            columns: vec!["COLUMN1".into()],
            ..Default::default()
        });

        let err = result.unwrap_err();
        assert_eq!(crate::error::app_error(&err).map(|e| e.kind()), Some("CommandError"));
        assert!(out.is_empty());
    }
}
