/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! cmd-with-argサブコマンドの実装
//!

use crate::cmd_args::WithArgOpts;
use super::{CommandContext, Control, Handler};

///
/// ハンドラの生成
///
/// # 注記
/// 処理時間の計測はディスパッチテーブル側でラップする。
///
pub(crate) fn handler(opts: &WithArgOpts) -> Handler {
    let arg1 = opts.arg1();
    let pos_arg = opts.pos_arg();

    Box::new(move |ctx: &mut CommandContext<'_>| {
        writeln!(
            ctx.out,
            "Hello cmd-with-arg! Arg - {}. Positional argument - {}",
            arg1,
            pos_arg
        )?;
        writeln!(ctx.out, "See time elapsed!")?;

        Ok(Control::Done)
    })
}
