//! 登录服务 - 业务能力层
//!
//! 驱动登录状态机：
//! 未登录 → 已提交账号密码 → 等待二次验证 → 已登录
//!
//! 任一步骤的元素在时限内未出现即失败，失败前先关闭浏览器，不返回半成品会话。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AuthError, BrowserError};
use crate::infrastructure::{BrowserLauncher, PageClient, Selector, Session};
use crate::models::LoginLayout;

/// 登录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Unauthenticated,
    LoginFormSubmitted,
    AwaitingSecondFactor,
    Authenticated,
}

/// 登录所需的凭据和时限
#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub mfa_code: String,
    /// 导航、表单操作的超时
    pub timeout: Duration,
    /// 提交验证码后等待仪表盘的超时
    pub mfa_timeout: Duration,
    /// 入口链接、Cookie 按钮等可选元素的等待时间
    pub optional_step_timeout: Duration,
}

impl Credentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            mfa_code: config.mfa_code.clone(),
            timeout: config.timeout,
            mfa_timeout: config.mfa_timeout,
            optional_step_timeout: config.optional_step_timeout,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("mfa_timeout", &self.mfa_timeout)
            .field("optional_step_timeout", &self.optional_step_timeout)
            .finish_non_exhaustive()
    }
}

/// 登录服务
pub struct SessionAuthenticator<L: BrowserLauncher> {
    launcher: L,
    layout: LoginLayout,
    credentials: Credentials,
}

impl<L: BrowserLauncher> SessionAuthenticator<L> {
    pub fn new(launcher: L, layout: LoginLayout, credentials: Credentials) -> Self {
        Self {
            launcher,
            layout,
            credentials,
        }
    }

    /// 启动浏览器并完成整个登录流程
    ///
    /// 成功时页面停留在登录后的仪表盘上。
    pub async fn establish_session(&self, headless: bool) -> Result<Session<L::Page>, AuthError> {
        info!("🚀 启动浏览器 (headless: {})...", headless);
        let page = self
            .launcher
            .launch(headless)
            .await
            .map_err(|source| AuthError::Launch { source })?;

        match self.login(&page).await {
            Ok(title) => {
                info!("✅ 登录成功，当前页面: {}", title);
                Ok(Session::new(page, title))
            }
            Err(e) => {
                warn!("❌ 登录失败，正在关闭浏览器: {}", e);
                if let Err(close_err) = page.close().await {
                    let close_err = BrowserError::CloseFailed { source: close_err };
                    warn!("关闭浏览器时出错: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn login(&self, page: &L::Page) -> Result<String, AuthError> {
        let creds = &self.credentials;
        let mut state = LoginState::Unauthenticated;
        debug!("登录状态: {:?}", state);

        info!("正在打开入口页面: {}", creds.base_url);
        page.navigate(&creds.base_url, creds.timeout)
            .await
            .map_err(|source| AuthError::Navigation {
                url: creds.base_url.clone(),
                source,
            })?;

        if let Some(entry) = &self.layout.entry_link {
            if self.click_if_present(page, entry, "登录入口").await? {
                page.wait_until_settled(creds.timeout)
                    .await
                    .map_err(|e| AuthError::timed_out("登录入口", creds.timeout, e))?;
            }
        }
        if let Some(cookie) = &self.layout.cookie_accept {
            self.click_if_present(page, cookie, "接受 Cookie").await?;
        }

        // ========== 账号密码 ==========
        self.fill(page, &self.layout.username_input, &creds.username, "填写用户名")
            .await?;
        self.fill(page, &self.layout.password_input, &creds.password, "填写密码")
            .await?;
        self.click(page, &self.layout.submit_button, "提交登录表单", creds.timeout)
            .await?;
        state = LoginState::LoginFormSubmitted;
        debug!("登录状态: {:?}", state);

        // ========== 二次验证 ==========
        info!("等待二次验证码输入框...");
        let mfa_input = page
            .wait_for(&self.layout.mfa_input, creds.timeout)
            .await
            .map_err(|e| AuthError::timed_out("等待二次验证", creds.timeout, e))?;
        state = LoginState::AwaitingSecondFactor;
        debug!("登录状态: {:?}", state);

        page.fill(&mfa_input, &creds.mfa_code)
            .await
            .map_err(|e| AuthError::missing("填写验证码", e))?;
        self.click(page, &self.layout.submit_button, "提交验证码", creds.timeout)
            .await?;

        // 验证码校验和仪表盘渲染较慢，使用更长的超时
        info!("等待仪表盘加载 (最多 {:?})...", creds.mfa_timeout);
        page.wait_for(&self.layout.dashboard_marker, creds.mfa_timeout)
            .await
            .map_err(|e| AuthError::timed_out("等待仪表盘", creds.mfa_timeout, e))?;
        state = LoginState::Authenticated;
        debug!("登录状态: {:?}", state);

        page.title()
            .await
            .map_err(|e| AuthError::missing("读取页面标题", e))
    }

    async fn fill(
        &self,
        page: &L::Page,
        selector: &Selector,
        value: &str,
        step: &'static str,
    ) -> Result<(), AuthError> {
        debug!("{}: {}", step, selector);
        let timeout = self.credentials.timeout;
        let input = page
            .wait_for(selector, timeout)
            .await
            .map_err(|e| AuthError::timed_out(step, timeout, e))?;
        page.fill(&input, value)
            .await
            .map_err(|e| AuthError::missing(step, e))
    }

    async fn click(
        &self,
        page: &L::Page,
        selector: &Selector,
        step: &'static str,
        timeout: Duration,
    ) -> Result<(), AuthError> {
        debug!("{}: {}", step, selector);
        let button = page
            .wait_for(selector, timeout)
            .await
            .map_err(|e| AuthError::timed_out(step, timeout, e))?;
        page.click(&button)
            .await
            .map_err(|e| AuthError::missing(step, e))
    }

    /// 可选步骤：元素存在则点击，不存在直接跳过
    async fn click_if_present(
        &self,
        page: &L::Page,
        selector: &Selector,
        step: &'static str,
    ) -> Result<bool, AuthError> {
        let optional = self.credentials.optional_step_timeout;
        let Ok(element) = page.wait_for(selector, optional).await else {
            debug!("{}: 未找到 {}，跳过", step, selector);
            return Ok(false);
        };
        info!("{}...", step);
        page.click(&element)
            .await
            .map_err(|e| AuthError::missing(step, e))?;
        Ok(true)
    }
}
