/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! 実行権限のチェック
//!

use anyhow::Result;

use crate::error::AppError;

///
/// 管理者(root)権限で起動されていないことの確認
///
/// # 戻り値
/// 管理者権限で起動されている場合は`AppError::Privilege`を`Err()`でラップし
/// て返す。
///
pub(crate) fn check_admin() -> Result<()> {
    if is_admin() {
        return Err(AppError::Privilege.into());
    }

    Ok(())
}

#[cfg(unix)]
fn is_admin() -> bool {
    // SAFETY: geteuid()は常に成功し、副作用を持たない
    unsafe { libc::geteuid() == 0 }
}

// TODO: WindowsではIsUserAnAdmin()相当の判定を行う
#[cfg(not(unix))]
fn is_admin() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    ///
    /// 判定結果が実効UIDと一致すること
    ///
    #[cfg(unix)]
    #[test]
    fn check_admin_follows_euid() {
        let root = unsafe { libc::geteuid() } == 0;
        assert_eq!(check_admin().is_err(), root);
    }
}
