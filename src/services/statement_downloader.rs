//! 分页账单下载服务 - 业务能力层
//!
//! 逐页下载账单列表中的所有文件，文件按全局计数器顺序命名
//! （`statement_<n>.<ext>`，跨页不重置）。
//!
//! - 单个文件下载失败：记录并跳过，计数器不前进
//! - 没有"下一页"按钮：正常结束
//! - 翻页过程出错：中止，不再访问后续页面

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{AppResult, DownloadError};
use crate::infrastructure::{PageClient, Session};
use crate::models::StatementLayout;
use crate::workflow::{statement_file_name, BatchReport, Stage, StatementCounter};

/// 分页下载结果
#[derive(Debug, Default)]
pub struct StatementSummary {
    /// 访问过的页数
    pub pages_visited: usize,
    /// 成功写入的文件（按编号顺序）
    pub report: BatchReport<PathBuf>,
}

impl StatementSummary {
    /// 成功写入的文件数
    pub fn written(&self) -> usize {
        self.report.succeeded.len()
    }
}

/// 分页账单下载服务
pub struct StatementDownloader {
    layout: StatementLayout,
    download_dir: PathBuf,
    timeout: Duration,
    /// 相邻两次下载之间的间隔
    pause: Duration,
}

impl StatementDownloader {
    pub fn new(layout: StatementLayout, download_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            layout,
            download_dir: download_dir.into(),
            timeout,
            pause: Duration::from_millis(500),
        }
    }

    /// 设置相邻下载之间的间隔
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// 下载所有页面上的账单
    pub async fn download_all_statements<P: PageClient>(
        &self,
        session: &Session<P>,
    ) -> AppResult<StatementSummary> {
        let page = session.page();
        let mut counter = StatementCounter::new();
        let mut summary = StatementSummary::default();
        let mut page_number = 1;

        loop {
            info!("📄 正在下载第 {} 页的账单...", page_number);
            self.download_page_statements(session, &mut counter, page_number, &mut summary.report)
                .await;
            summary.pages_visited = page_number;

            let aborted = |source: anyhow::Error| DownloadError::PaginationAborted {
                page: page_number,
                written: counter.written(),
                source,
            };

            let Some(next) = page
                .locate(None, &self.layout.next_page)
                .await
                .map_err(aborted)?
            else {
                info!("没有\"下一页\"按钮，分页结束");
                break;
            };
            if !self.is_actionable(page, &next).await.map_err(aborted)? {
                info!("\"下一页\"按钮不可用，分页结束");
                break;
            }

            debug!("正在翻到第 {} 页...", page_number + 1);
            page.click(&next).await.map_err(aborted)?;
            page.wait_until_settled(self.timeout)
                .await
                .map_err(aborted)?;
            page_number += 1;
        }

        info!(
            "✓ 账单下载完成: 共 {} 页，成功 {} 个，失败 {} 个",
            summary.pages_visited,
            summary.written(),
            summary.report.failures.len()
        );
        Ok(summary)
    }

    /// 下载当前页面上的所有账单
    ///
    /// 文件编号从 `counter` 的当前值开始，每成功一个前进一次。
    pub async fn download_page_statements<P: PageClient>(
        &self,
        session: &Session<P>,
        counter: &mut StatementCounter,
        page_number: usize,
        report: &mut BatchReport<PathBuf>,
    ) {
        let page = session.page();
        let links = match page.locate_all(None, &self.layout.download_link).await {
            Ok(links) => links,
            Err(e) => {
                report.record(
                    Stage::StatementDownload,
                    format!("第 {} 页账单列表", page_number),
                    Err(DownloadError::item("账单列表", e).into()),
                );
                return;
            }
        };
        info!("找到 {} 个待下载的账单", links.len());

        for (idx, link) in links.iter().enumerate() {
            if idx > 0 && !self.pause.is_zero() {
                sleep(self.pause).await;
            }

            let subject = format!("第 {} 页第 {} 个账单", page_number, idx + 1);
            let outcome = self.download_one(page, link, counter.current()).await;
            if outcome.is_ok() {
                counter.advance();
            }
            report.record(Stage::StatementDownload, subject, outcome);
        }
    }

    async fn download_one<P: PageClient>(
        &self,
        page: &P,
        link: &P::Element,
        index: usize,
    ) -> AppResult<PathBuf> {
        let target = format!("statement_{}", index);
        let file = page
            .expect_download(link, self.timeout)
            .await
            .map_err(|e| DownloadError::item(target.as_str(), e))?;
        debug!(
            "浏览器建议文件名: {} (暂存于 {})",
            file.suggested_filename(),
            file.path().display()
        );

        let dest = self
            .download_dir
            .join(statement_file_name(index, &file.extension()));
        file.save_as(&dest)
            .await
            .map_err(|e| DownloadError::item(target.as_str(), e))?;

        info!("✓ 已下载: {}", dest.display());
        Ok(dest)
    }

    /// "下一页"按钮可见且未被禁用
    async fn is_actionable<P: PageClient>(
        &self,
        page: &P,
        next: &P::Element,
    ) -> anyhow::Result<bool> {
        if !page.is_visible(next).await? {
            return Ok(false);
        }
        if page.read_attribute(next, "disabled").await?.is_some() {
            return Ok(false);
        }
        let aria_disabled = page.read_attribute(next, "aria-disabled").await?;
        if aria_disabled.as_deref() == Some("true") {
            warn!("\"下一页\"按钮被标记为 aria-disabled");
            return Ok(false);
        }
        Ok(true)
    }
}
