/*
 * Oracle application template
 *
 *  Copyright (C) 2025 Hiroshi KUWAGATA
 */

//!
//! データベースセッションの管理をまとめたモジュール
//!
//! セッションは1本の接続と、読み込み用/書き込み用の2本のカーソルで構成する。
//! 1回の実行でオープンできるセッションは1つだけである。
//!

pub(crate) mod oracle;
pub(crate) mod types;

use std::fmt::{Debug, Formatter};

use anyhow::{anyhow, Result};

use crate::bootstrap::EnvReady;
use crate::error::{app_error, AppError};
use types::{make_row_factory, ColumnInfo, Row, RowFactory, Value};

///
/// ドライバが提供するカーソルのインタフェース
///
pub(crate) trait Cursor {
    ///
    /// SQL文の実行
    ///
    fn execute(&mut self, sql: &str) -> Result<()>;

    ///
    /// 直前に実行した問い合わせのカラム情報
    ///
    /// # 注記
    /// 問い合わせ以外の文を実行した場合は空のリストを返す。
    ///
    fn columns(&self) -> Result<Vec<ColumnInfo>>;

    ///
    /// 1行分のデータの取得(位置指定)
    ///
    fn fetch_raw(&mut self) -> Result<Option<Vec<Value>>>;

    ///
    /// カーソルのクローズ
    ///
    fn close(&mut self) -> Result<()>;
}

///
/// ドライバが提供する接続のインタフェース
///
pub(crate) trait DbConnection {
    ///
    /// カーソルの割り当て
    ///
    fn cursor(&self) -> Result<Box<dyn Cursor>>;

    ///
    /// トランザクションのコミット
    ///
    fn commit(&mut self) -> Result<()>;

    ///
    /// 接続のクローズ
    ///
    fn close(&mut self) -> Result<()>;
}

///
/// ロード済みのネイティブドライバのインタフェース
///
pub(crate) trait Driver {
    ///
    /// ネイティブクライアントのバージョン文字列
    ///
    fn client_version(&self) -> Result<String>;

    ///
    /// データベースへの接続
    ///
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn DbConnection>>;
}

///
/// ネイティブドライバのロードを行うファクトリ
///
pub(crate) trait DriverFactory {
    ///
    /// ドライバのロード
    ///
    /// # 引数
    /// * `ready` - 実行環境が整っていることを表すトークン
    ///
    fn create(&self, ready: &EnvReady) -> Result<Box<dyn Driver>>;
}

///
/// 接続情報をパックした構造体
///
#[derive(Clone)]
pub(crate) struct Credentials {
    /// ログインユーザ
    login: String,

    /// パスワード
    password: String,

    /// ホスト
    host: String,

    /// SID(サービス名)
    sid: String,
}

impl Credentials {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new(login: &str, password: &str, host: &str, sid: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            sid: sid.to_string(),
        }
    }

    pub(crate) fn login(&self) -> &str {
        &self.login
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    ///
    /// 接続文字列(`host/sid`)の生成
    ///
    pub(crate) fn connect_string(&self) -> String {
        format!("{}/{}", self.host, self.sid)
    }
}

// Debugトレイトの実装(パスワードは出力しない)
impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("host", &self.host)
            .field("sid", &self.sid)
            .finish_non_exhaustive()
    }
}

///
/// ConnectionErrorへの変換
///
/// # 注記
/// 既に種別が付与されているエラーはそのまま返す。
///
fn connection_error(err: anyhow::Error) -> anyhow::Error {
    if app_error(&err).is_some() {
        err
    } else {
        AppError::Connection(format!("{:#}", err)).into()
    }
}

///
/// セッションが保持するカーソル
///
pub(crate) struct SessionCursor {
    /// ドライバのカーソル
    inner: Box<dyn Cursor>,

    /// 直前の問い合わせに対応するロウファクトリ
    factory: Option<RowFactory>,
}

impl SessionCursor {
    fn new(inner: Box<dyn Cursor>) -> Self {
        Self { inner, factory: None }
    }

    ///
    /// SQL文の実行
    ///
    /// # 注記
    /// 実行後、フェッチの前にカラム情報からロウファクトリを生成して設定する。
    ///
    pub(crate) fn execute(&mut self, sql: &str) -> Result<()> {
        self.factory = None;

        log::debug!("execute: {}", sql);
        self.inner.execute(sql)?;

        let columns = self.inner.columns()?;
        if !columns.is_empty() {
            self.factory = Some(make_row_factory(&columns));
        }

        Ok(())
    }

    ///
    /// 1行の取得
    ///
    /// # 戻り値
    /// 行が残っていれば変換済みの行データを`Some()`でラップして返す。
    ///
    pub(crate) fn fetch_one(&mut self) -> Result<Option<Row>> {
        let Some(factory) = &self.factory else {
            return Err(AppError::Command("fetch without executed query".into()).into());
        };

        Ok(self.inner.fetch_raw()?.map(|values| factory(values)))
    }

    ///
    /// 残りの全行の取得
    ///
    #[allow(dead_code)]
    pub(crate) fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();

        while let Some(row) = self.fetch_one()? {
            rows.push(row);
        }

        Ok(rows)
    }

    fn close(&mut self) -> Result<()> {
        self.factory = None;
        self.inner.close()
    }
}

///
/// データベースセッション
///
pub(crate) struct Session {
    /// 接続
    conn: Option<Box<dyn DbConnection>>,

    /// 読み込み用カーソル
    read: Option<SessionCursor>,

    /// 書き込み用カーソル
    write: Option<SessionCursor>,

    /// コマンド側からのコミット要求
    commit_requested: bool,
}

impl Session {
    ///
    /// 読み込み用カーソルへのアクセサ
    ///
    pub(crate) fn read(&mut self) -> Result<&mut SessionCursor> {
        self.read.as_mut()
            .ok_or_else(|| anyhow!(AppError::Command("session already closed".into())))
    }

    ///
    /// 書き込み用カーソルへのアクセサ
    ///
    #[allow(dead_code)]
    pub(crate) fn write(&mut self) -> Result<&mut SessionCursor> {
        self.write.as_mut()
            .ok_or_else(|| anyhow!(AppError::Command("session already closed".into())))
    }

    ///
    /// セッション終了時のコミットを要求する
    ///
    #[allow(dead_code)]
    pub(crate) fn request_commit(&mut self) {
        self.commit_requested = true;
    }

    ///
    /// コミット要求の有無
    ///
    pub(crate) fn commit_requested(&self) -> bool {
        self.commit_requested
    }

    ///
    /// クローズ済みか否か
    ///
    pub(crate) fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    ///
    /// セッションのクローズ
    ///
    /// # 引数
    /// * `commit` - クローズ前にコミットを行う場合は`true`
    ///
    /// # 戻り値
    /// 処理中に発生した最初のエラーを返す。
    ///
    /// # 注記
    /// コミット、書き込み用カーソル、読み込み用カーソル、接続の順に処理する。
    /// 途中でエラーが発生しても残りの資源は必ず解放する。クローズ済みのセッ
    /// ションに対しては何もしない。
    ///
    pub(crate) fn close(&mut self, commit: bool) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        let mut first_err: Option<anyhow::Error> = None;
        let mut keep = |res: Result<()>| {
            if let Err(err) = res {
                log::error!("session close: {:#}", err);
                first_err.get_or_insert(err);
            }
        };

        if commit {
            log::debug!("commit");
            keep(conn.commit());
        }

        if let Some(mut cursor) = self.write.take() {
            keep(cursor.close());
        }

        if let Some(mut cursor) = self.read.take() {
            keep(cursor.close());
        }

        keep(conn.close());

        match first_err {
            Some(err) => Err(connection_error(err)),
            None => Ok(()),
        }
    }
}

// Dropトレイトの実装
impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close(false);
        }
    }
}

///
/// セッションのオープンを管理する構造体
///
pub(crate) struct SessionManager {
    /// ドライバのファクトリ
    factory: Box<dyn DriverFactory>,

    /// セッションをオープン済みか否か
    opened: bool,
}

impl SessionManager {
    ///
    /// オブジェクトの生成
    ///
    pub(crate) fn new(factory: Box<dyn DriverFactory>) -> Self {
        Self { factory, opened: false }
    }

    ///
    /// セッションのオープン
    ///
    /// # 引数
    /// * `ready` - 実行環境が整っていることを表すトークン
    /// * `credentials` - 接続情報
    ///
    /// # 戻り値
    /// オープンに成功した場合はセッションオブジェクトを`Ok()`でラップして返
    /// す。失敗した場合は`AppError::Connection`を`Err()`でラップして返す。
    ///
    pub(crate) fn open(&mut self, ready: &EnvReady, credentials: &Credentials)
        -> Result<Session>
    {
        if self.opened {
            return Err(AppError::Connection(
                "session already opened in this process".into()
            ).into());
        }

        log::info!(
            "Init Oracle. Database - {}@{}",
            credentials.login(),
            credentials.connect_string()
        );

        let driver = self.factory.create(ready).map_err(connection_error)?;

        match driver.client_version() {
            Ok(version) => log::debug!("client version: {}", version),
            Err(err) => return Err(connection_error(err)),
        }

        let conn = driver.connect(credentials).map_err(connection_error)?;
        let read = conn.cursor().map_err(connection_error)?;
        let write = conn.cursor().map_err(connection_error)?;

        self.opened = true;

        Ok(Session {
            conn: Some(conn),
            read: Some(SessionCursor::new(read)),
            write: Some(SessionCursor::new(write)),
            commit_requested: false,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{Behavior, MockFactory};
    use super::*;
    use crate::bootstrap::ready_for_test;

    fn credentials() -> Credentials {
        Credentials::new("scott", "tiger", "dbhost", "ORCL")
    }

    fn dual_behavior() -> Behavior {
        Behavior {
            columns: vec!["COLUMN1".into()],
            rows: vec![vec![Value::Integer(1)]],
            ..Default::default()
        }
    }

    ///
    /// 接続1本とカーソル2本(読み込み用が先)が割り当てられること
    ///
    #[test]
    fn open_allocates_connection_and_two_cursors() {
        let (factory, events) = MockFactory::new(dual_behavior());
        let mut manager = SessionManager::new(Box::new(factory));

        let mut session = manager.open(&ready_for_test(), &credentials()).unwrap();
        session.read().unwrap().execute("SELECT 1 AS column1 FROM dual").unwrap();
        session.write().unwrap().execute("UPDATE t SET a = 1").unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                "load driver",
                "connect dbhost/ORCL",
                "execute#1 SELECT 1 AS column1 FROM dual",
                "execute#2 UPDATE t SET a = 1",
            ]
        );
    }

    ///
    /// 2つ目のセッションはオープンできないこと
    ///
    #[test]
    fn second_open_is_rejected() {
        let (factory, _events) = MockFactory::new(dual_behavior());
        let mut manager = SessionManager::new(Box::new(factory));

        let mut first = manager.open(&ready_for_test(), &credentials()).unwrap();
        first.close(false).unwrap();

        let err = manager.open(&ready_for_test(), &credentials()).err().unwrap();
        assert_eq!(app_error(&err).map(AppError::kind), Some("ConnectionError"));
    }

    #[test]
    fn rejected_credentials_are_connection_errors() {
        let (factory, _events) = MockFactory::new(Behavior {
            reject_connect: true,
            ..Default::default()
        });
        let mut manager = SessionManager::new(Box::new(factory));

        let err = manager.open(&ready_for_test(), &credentials()).err().unwrap();
        assert_eq!(app_error(&err).map(AppError::kind), Some("ConnectionError"));
        assert!(format!("{:#}", err).contains("ORA-01017"));
    }

    ///
    /// コマンドが失敗しても書き込み用カーソル、読み込み用カーソル、接続の順
    /// で解放され、コミットされないこと
    ///
    #[test]
    fn close_after_failure_releases_in_order() {
        let (factory, events) = MockFactory::new(Behavior {
            fail_on: Some("missing_table".into()),
            ..dual_behavior()
        });
        let mut manager = SessionManager::new(Box::new(factory));
        let mut session = manager.open(&ready_for_test(), &credentials()).unwrap();

        let res = session.read().unwrap().execute("SELECT * FROM missing_table");
        assert!(res.is_err());

        events.borrow_mut().clear();
        session.close(false).unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["close cursor#2", "close cursor#1", "close connection"]
        );
    }

    #[test]
    fn commit_precedes_release() {
        let (factory, events) = MockFactory::new(dual_behavior());
        let mut manager = SessionManager::new(Box::new(factory));
        let mut session = manager.open(&ready_for_test(), &credentials()).unwrap();

        events.borrow_mut().clear();
        session.close(true).unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["commit", "close cursor#2", "close cursor#1", "close connection"]
        );
    }

    ///
    /// 2回目のクローズは何もしないこと
    ///
    #[test]
    fn double_close_is_noop() {
        let (factory, events) = MockFactory::new(dual_behavior());
        let mut manager = SessionManager::new(Box::new(factory));
        let mut session = manager.open(&ready_for_test(), &credentials()).unwrap();

        session.close(false).unwrap();
        events.borrow_mut().clear();

        session.close(true).unwrap();
        assert!(session.is_closed());
        assert!(events.borrow().is_empty());
        assert!(session.read().is_err());
    }

    ///
    /// クローズせずに破棄した場合もコミット無しで解放されること
    ///
    #[test]
    fn drop_releases_without_commit() {
        let (factory, events) = MockFactory::new(dual_behavior());
        let mut manager = SessionManager::new(Box::new(factory));
        let session = manager.open(&ready_for_test(), &credentials()).unwrap();

        events.borrow_mut().clear();
        drop(session);

        assert_eq!(
            *events.borrow(),
            vec!["close cursor#2", "close cursor#1", "close connection"]
        );
    }

    ///
    /// 実行前のフェッチはエラーになり、実行後はロウファクトリが適用されること
    ///
    #[test]
    fn fetch_requires_executed_query() {
        let (factory, _events) = MockFactory::new(Behavior {
            columns: vec!["COL1".into(), "COL2".into()],
            rows: vec![vec![Value::Null, "x".into()]],
            ..Default::default()
        });
        let mut manager = SessionManager::new(Box::new(factory));
        let mut session = manager.open(&ready_for_test(), &credentials()).unwrap();

        let err = session.read().unwrap().fetch_one().unwrap_err();
        assert_eq!(app_error(&err).map(AppError::kind), Some("CommandError"));

        let cursor = session.read().unwrap();
        cursor.execute("SELECT col1, col2 FROM t").unwrap();

        let rows = cursor.fetch_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("col1"), Some(&Value::Text(String::new())));
        assert_eq!(rows[0].get("col2"), Some(&Value::Text("x".into())));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let dbg = format!("{:?}", credentials());
        assert!(dbg.contains("scott"));
        assert!(!dbg.contains("tiger"));
    }
}
