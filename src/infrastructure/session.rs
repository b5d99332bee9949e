//! 已登录会话 - 基础设施层
//!
//! 独占持有一个已通过认证的浏览器上下文。
//! 流程结束时必须调用 `release()`；未释放就被丢弃时会记录警告，
//! 具体的进程回收由 `PageClient` 实现自身的 Drop 兜底。

use tracing::{debug, info, warn};

use crate::error::BrowserError;
use crate::infrastructure::PageClient;

/// 已登录会话
pub struct Session<P: PageClient> {
    page: P,
    landing_title: String,
    released: bool,
}

impl<P: PageClient> Session<P> {
    pub fn new(page: P, landing_title: impl Into<String>) -> Self {
        Self {
            page,
            landing_title: landing_title.into(),
            released: false,
        }
    }

    /// 获取页面能力
    pub fn page(&self) -> &P {
        &self.page
    }

    /// 登录完成后落地页的标题
    pub fn landing_title(&self) -> &str {
        &self.landing_title
    }

    /// 关闭浏览器，释放会话
    pub async fn release(mut self) -> Result<(), BrowserError> {
        self.released = true;
        debug!("正在释放浏览器会话...");
        self.page
            .close()
            .await
            .map_err(|source| BrowserError::CloseFailed { source })?;
        info!("✓ 浏览器会话已释放");
        Ok(())
    }
}

impl<P: PageClient> Drop for Session<P> {
    fn drop(&mut self) {
        if !self.released {
            warn!("⚠️ 会话未显式释放，依赖浏览器实现回收进程");
        }
    }
}
