use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::chromium_page::ChromiumPage;
use crate::error::BrowserError;
use crate::infrastructure::BrowserLauncher;

/// Chromium 浏览器启动器
pub struct ChromiumLauncher {
    chrome_path: Option<PathBuf>,
    /// 浏览器下载文件的暂存目录
    staging_dir: PathBuf,
}

impl ChromiumLauncher {
    pub fn new(chrome_path: Option<PathBuf>, download_dir: &Path) -> Self {
        Self {
            chrome_path,
            staging_dir: download_dir.join(".staging"),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Page = ChromiumPage;

    async fn launch(&self, headless: bool) -> Result<ChromiumPage> {
        let chrome_path = self.chrome_path.clone().or_else(find_chrome);
        debug!("浏览器路径: {:?}", chrome_path);

        let mut builder = if headless {
            BrowserConfig::builder().new_headless_mode()
        } else {
            BrowserConfig::builder().with_head()
        };
        if let Some(path) = chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .args(vec![
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--no-default-browser-check",
            ])
            .build()
            .map_err(|e| {
                error!("配置浏览器失败: {}", e);
                BrowserError::ConfigurationFailed(e)
            })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动浏览器失败: {}", e);
            e
        })?;
        debug!("浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 等待浏览器状态同步
        sleep(tokio::time::Duration::from_millis(300)).await;

        let page = browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            e
        })?;
        setup_download_handling(&page, &self.staging_dir).await?;

        info!("✅ 浏览器已就绪");
        Ok(ChromiumPage::new(
            browser,
            page,
            handler_task,
            self.staging_dir.clone(),
        ))
    }
}

/// 允许下载并把文件落到暂存目录
async fn setup_download_handling(page: &Page, staging_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(staging_dir)
        .await
        .with_context(|| format!("无法创建下载暂存目录: {}", staging_dir.display()))?;
    let staging_dir = std::fs::canonicalize(staging_dir)
        .with_context(|| format!("无法解析下载暂存目录: {}", staging_dir.display()))?;

    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(staging_dir.display().to_string())
        .build()
        .map_err(BrowserError::ConfigurationFailed)?;
    page.execute(params).await?;
    debug!("下载暂存目录: {}", staging_dir.display());
    Ok(())
}

/// 查找 Chrome/Chromium 可执行文件
fn find_chrome() -> Option<PathBuf> {
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ];
    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}
