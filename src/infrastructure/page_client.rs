//! 页面能力接口 - 基础设施层
//!
//! 业务代码只通过 `PageClient` 操作页面，不直接接触具体的浏览器实现。
//! 元素定位统一使用 `Selector`（语义角色 → 匹配规则），
//! 更换匹配策略时不需要改动任何流程代码。

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 元素匹配规则
///
/// CSS 选择器 + 可选的"文本包含"过滤条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
        }
    }

    /// 追加文本包含条件
    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// 判断元素文本是否满足文本条件
    pub fn accepts_text(&self, element_text: &str) -> bool {
        match &self.text {
            Some(needle) => element_text.contains(needle.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} [含 '{}']", self.css, text),
            None => write!(f, "{}", self.css),
        }
    }
}

/// 已捕获的下载文件（位于暂存目录）
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    path: PathBuf,
    suggested_filename: String,
}

impl DownloadedFile {
    pub fn new(path: PathBuf, suggested_filename: impl Into<String>) -> Self {
        Self {
            path,
            suggested_filename: suggested_filename.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn suggested_filename(&self) -> &str {
        &self.suggested_filename
    }

    /// 文件扩展名，无法识别时默认为 pdf
    pub fn extension(&self) -> String {
        Path::new(&self.suggested_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "pdf".to_string())
    }

    /// 将文件保存到最终位置（覆盖已存在的同名文件）
    pub async fn save_as(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
        if tokio::fs::rename(&self.path, dest).await.is_err() {
            // 跨文件系统时 rename 会失败
            tokio::fs::copy(&self.path, dest)
                .await
                .with_context(|| format!("无法保存文件: {}", dest.display()))?;
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                warn!("清理暂存文件失败 {}: {}", self.path.display(), e);
            }
        }
        Ok(())
    }
}

/// 页面操作能力
///
/// 实现方需保证所有等待操作都有超时上限，超时即返回错误，不做重试。
#[async_trait]
pub trait PageClient: Send + Sync {
    /// 页面元素句柄
    type Element: Send + Sync;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// 等待匹配元素出现（可见），超时返回错误
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<Self::Element>;

    /// 查找所有匹配元素；`scope` 为空时在整个页面内查找
    async fn locate_all(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
    ) -> Result<Vec<Self::Element>>;

    /// 查找第一个匹配元素
    async fn locate(
        &self,
        scope: Option<&Self::Element>,
        selector: &Selector,
    ) -> Result<Option<Self::Element>> {
        Ok(self.locate_all(scope, selector).await?.into_iter().next())
    }

    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn fill(&self, element: &Self::Element, value: &str) -> Result<()>;

    /// 点击元素并捕获由此触发的下载
    async fn expect_download(
        &self,
        trigger: &Self::Element,
        timeout: Duration,
    ) -> Result<DownloadedFile>;

    async fn is_visible(&self, element: &Self::Element) -> Result<bool>;

    /// 等待页面加载完成且网络空闲
    async fn wait_until_settled(&self, timeout: Duration) -> Result<()>;

    async fn title(&self) -> Result<String>;

    /// 关闭页面及其所属的浏览器上下文
    async fn close(&self) -> Result<()>;
}

/// 浏览器启动能力
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Page: PageClient;

    async fn launch(&self, headless: bool) -> Result<Self::Page>;
}
