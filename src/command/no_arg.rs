/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! cmd-no-argサブコマンドの実装
//!

use crate::cmd_args::PosOpts;
use super::{CommandContext, Control, Handler};

///
/// ハンドラの生成
///
pub(crate) fn handler(opts: &PosOpts) -> Handler {
    let pos_arg = opts.pos_arg();

    Box::new(move |ctx: &mut CommandContext<'_>| {
        writeln!(ctx.out, "Hello cmd-no-arg! Positional argument - {}", pos_arg)?;
        Ok(Control::Done)
    })
}
