//! 基于 chromiumoxide 的页面实现
//!
//! 持有唯一的 Browser / Page 资源，对外只暴露 `PageClient` 能力

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, Element, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::BrowserError;
use crate::infrastructure::{DownloadedFile, PageClient, Selector};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const IS_VISIBLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

const CLEAR_VALUE_JS: &str = r#"function() {
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Chromium 页面
pub struct ChromiumPage {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    staging_dir: PathBuf,
    /// 每次下载使用独立的暂存子目录
    download_seq: AtomicUsize,
    closed: AtomicBool,
}

/// 网络空闲检测结果
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleState {
    ok: bool,
    ready_state: String,
    waited_ms: u64,
}

impl ChromiumPage {
    pub fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>, staging_dir: PathBuf) -> Self {
        Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
            staging_dir,
            download_seq: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value: serde_json::Value = result.into_value()?;
        Ok(serde_json::from_value(json_value)?)
    }

    /// 查找匹配元素并按文本条件过滤
    async fn find(&self, scope: Option<&Element>, selector: &Selector) -> Result<Vec<Element>> {
        let candidates = match scope {
            Some(parent) => parent.find_elements(selector.css.as_str()).await?,
            None => self.page.find_elements(selector.css.as_str()).await?,
        };
        if selector.text.is_none() {
            return Ok(candidates);
        }

        let mut matched = Vec::new();
        for element in candidates {
            let text = element.inner_text().await?.unwrap_or_default();
            if selector.accepts_text(&text) {
                matched.push(element);
            }
        }
        Ok(matched)
    }

    /// 第一个可见的匹配元素
    async fn first_visible(&self, selector: &Selector) -> Result<Option<Element>> {
        for element in self.find(None, selector).await? {
            if self.is_visible(&element).await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// 为下一次下载准备全新的暂存子目录，并让浏览器把文件写到这里
    ///
    /// 上一次超时未完成的下载只会落在它自己的目录里
    async fn arm_download_dir(&self) -> Result<PathBuf> {
        let seq = self.download_seq.fetch_add(1, Ordering::SeqCst);
        let dir = self.staging_dir.join(format!("dl-{}", seq));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("无法创建下载暂存目录: {}", dir.display()))?;
        let dir = std::fs::canonicalize(&dir)
            .with_context(|| format!("无法解析下载暂存目录: {}", dir.display()))?;

        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(BrowserError::ConfigurationFailed)?;
        self.page.execute(params).await?;
        Ok(dir)
    }
}

/// 按固定间隔轮询，直到 `check` 返回 `Some` 或超时
///
/// 轮询中出现的错误视为"暂时还没有"，超时时附带最后一次错误。
async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = None;
    loop {
        match check().await {
            Ok(Some(found)) => return Ok(found),
            Ok(None) => {}
            Err(e) => {
                debug!("轮询出错，继续等待: {:#}", e);
                last_error = Some(e);
            }
        }
        if Instant::now() >= deadline {
            return Err(match last_error {
                Some(e) => e.context(format!("{:?} 内未满足条件", timeout)),
                None => anyhow!("{:?} 内未满足条件", timeout),
            });
        }
        sleep(interval).await;
    }
}

/// 目录快照：文件路径 → 大小
fn snapshot(dir: &Path) -> Result<HashMap<PathBuf, u64>> {
    let mut files = HashMap::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("无法读取下载暂存目录: {}", dir.display()))?
    {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files.insert(entry.path(), metadata.len());
        }
    }
    Ok(files)
}

/// 从两次相邻的快照中挑出已完成的下载
///
/// 已完成 = 不是临时文件，且大小与上一次快照相同
fn settled_download(
    previous: &HashMap<PathBuf, u64>,
    current: &HashMap<PathBuf, u64>,
) -> Option<PathBuf> {
    let mut done: Vec<&PathBuf> = current
        .iter()
        .filter(|(path, size)| !is_partial_download(path) && previous.get(*path) == Some(*size))
        .map(|(path, _)| path)
        .collect();
    done.sort();
    done.into_iter().next().cloned()
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "crdownload" || e == "tmp")
}

#[async_trait]
impl PageClient for ChromiumPage {
    type Element = Element;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("导航到: {}", url);
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .with_context(|| format!("导航到 {} 超时 ({:?})", url, timeout))??;
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<Element> {
        poll_until(timeout, POLL_INTERVAL, || self.first_visible(selector))
            .await
            .with_context(|| format!("等待元素 {} 超时", selector))
    }

    async fn locate_all(&self, scope: Option<&Element>, selector: &Selector) -> Result<Vec<Element>> {
        self.find(scope, selector).await
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attribute(name).await?)
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.scroll_into_view().await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, element: &Element, value: &str) -> Result<()> {
        element.click().await?;
        element.call_js_fn(CLEAR_VALUE_JS, false).await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn expect_download(&self, trigger: &Element, timeout: Duration) -> Result<DownloadedFile> {
        let dir = self.arm_download_dir().await?;
        self.click(trigger).await?;

        let deadline = Instant::now() + timeout;
        let mut previous = HashMap::new();
        loop {
            sleep(POLL_INTERVAL).await;

            let current = snapshot(&dir)?;
            if let Some(path) = settled_download(&previous, &current) {
                let file = DownloadedFile::new(
                    path.clone(),
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                );
                debug!("捕获到下载文件: {}", file.suggested_filename());
                return Ok(file);
            }
            previous = current;

            if Instant::now() >= deadline {
                bail!("等待下载完成超时 ({:?})", timeout);
            }
        }
    }

    async fn is_visible(&self, element: &Element) -> Result<bool> {
        let returns = element.call_js_fn(IS_VISIBLE_JS, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn wait_until_settled(&self, timeout: Duration) -> Result<()> {
        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        let js = format!(
            r#"(async () => {{
                const timeoutMs = {timeout_ms};
                const idleMs = 500;
                const interval = 100;
                const start = Date.now();
                let lastCount = performance.getEntriesByType('resource').length;
                let stableMs = 0;
                while (Date.now() - start < timeoutMs) {{
                    await new Promise(r => setTimeout(r, interval));
                    const curCount = performance.getEntriesByType('resource').length;
                    if (document.readyState === 'complete' && curCount === lastCount) {{
                        stableMs += interval;
                        if (stableMs >= idleMs) {{
                            return {{ ok: true, readyState: document.readyState, waitedMs: Date.now() - start }};
                        }}
                    }} else {{
                        stableMs = 0;
                    }}
                    lastCount = curCount;
                }}
                return {{ ok: false, readyState: document.readyState, waitedMs: Date.now() - start }};
            }})()"#
        );

        let state: IdleState = self.eval_as(js).await?;
        if !state.ok {
            bail!(
                "页面在 {}ms 内未进入空闲状态 (readyState={})",
                state.waited_ms,
                state.ready_state
            );
        }
        debug!("页面已空闲 (等待 {}ms)", state.waited_ms);
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler_task.abort();
        closed?;
        Ok(())
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        // Browser 被丢弃时会结束子进程，这里只需停止事件循环
        self.handler_task.abort();
    }
}
