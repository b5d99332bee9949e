mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use portal_harvest::error::AuthError;
use portal_harvest::services::{Credentials, SessionAuthenticator};
use portal_harvest::{PortalLayout, Selector};

fn authenticator(launcher: FakeLauncher, root: &std::path::Path) -> SessionAuthenticator<FakeLauncher> {
    let config = test_config(root);
    SessionAuthenticator::new(
        launcher,
        PortalLayout::default().login,
        Credentials::from_config(&config),
    )
}

#[tokio::test]
async fn login_lands_on_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(portal(&[], vec![StatementPage::default()]), &dir.path().join("staging"));
    let launcher = FakeLauncher::new(page);
    let closed = launcher.closed_flag();

    let session = authenticator(launcher, dir.path())
        .establish_session(true)
        .await
        .unwrap();

    assert_eq!(session.landing_title(), DASHBOARD_TITLE);
    assert_eq!(session.page().current_screen(), DASHBOARD);
    assert_eq!(
        session.page().filled(),
        vec![
            ("input[name='username']".to_string(), "alice".to_string()),
            ("input[name='password']".to_string(), "hunter2".to_string()),
            ("input#mfa_code".to_string(), "246810".to_string()),
        ]
    );
    assert!(!closed.load(Ordering::SeqCst));

    session.release().await.unwrap();
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn optional_steps_use_configured_wait() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(portal(&[], vec![StatementPage::default()]), &dir.path().join("staging"));

    let session = authenticator(FakeLauncher::new(page), dir.path())
        .establish_session(true)
        .await
        .unwrap();

    let layout = PortalLayout::default().login;
    let waits = session.page().waits();
    let wait_of = |selector: &Selector| {
        waits
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, timeout)| *timeout)
    };
    assert_eq!(wait_of(&layout.entry_link.unwrap()), Some(Duration::from_secs(2)));
    assert_eq!(wait_of(&layout.cookie_accept.unwrap()), Some(Duration::from_secs(2)));
    assert_eq!(wait_of(&layout.username_input), Some(Duration::from_secs(1)));
    assert_eq!(wait_of(&layout.dashboard_marker), Some(Duration::from_secs(5)));

    session.release().await.unwrap();
}

#[tokio::test]
async fn login_without_entry_link_or_cookie_banner() {
    let dir = tempfile::tempdir().unwrap();
    let mut screens = portal(&[], vec![StatementPage::default()]);
    // 入口页直接就是登录表单，且没有 Cookie 按钮
    screens[LOGIN_FORM].children.remove(0);
    let page = FakePage::new(screens, &dir.path().join("staging")).starting_at(LOGIN_FORM);

    let session = authenticator(FakeLauncher::new(page), dir.path())
        .establish_session(true)
        .await
        .unwrap();

    assert_eq!(session.landing_title(), DASHBOARD_TITLE);
    session.release().await.unwrap();
}

#[tokio::test]
async fn missing_mfa_field_times_out_and_closes_browser() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(login_screens(false, true), &dir.path().join("staging"));
    let launcher = FakeLauncher::new(page);
    let closed = launcher.closed_flag();

    let err = authenticator(launcher, dir.path())
        .establish_session(true)
        .await
        .err()
        .unwrap();

    match err {
        AuthError::StepTimedOut { step, timeout, .. } => {
            assert_eq!(step, "等待二次验证");
            assert_eq!(timeout, Duration::from_secs(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(closed.load(Ordering::SeqCst), "登录失败后浏览器应被关闭");
}

#[tokio::test]
async fn dashboard_wait_uses_the_longer_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new(login_screens(true, false), &dir.path().join("staging"));
    let launcher = FakeLauncher::new(page);
    let closed = launcher.closed_flag();

    let err = authenticator(launcher, dir.path())
        .establish_session(true)
        .await
        .err()
        .unwrap();

    match err {
        AuthError::StepTimedOut { step, timeout, .. } => {
            assert_eq!(step, "等待仪表盘");
            assert_eq!(timeout, Duration::from_secs(5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn launch_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = FakeLauncher::new(FakePage::new(Vec::new(), &dir.path().join("staging")));
    let auth = authenticator(launcher, dir.path());

    // 第一次启动拿走页面后，第二次启动失败；第一次因页面为空在导航后找不到表单
    assert!(auth.establish_session(true).await.is_err());
    let err = auth.establish_session(true).await.err().unwrap();
    assert!(matches!(err, AuthError::Launch { .. }));
}
