//! 最新账单下载服务 - 业务能力层
//!
//! 针对已提取的账户记录逐个下载最新账单。
//! 每次都按地址在当前页面上重新定位卡片，不复用提取时的元素句柄。

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{AppResult, DownloadError};
use crate::infrastructure::{PageClient, Session};
use crate::models::{AccountRecord, CardLayout};
use crate::services::record_extractor::normalize_whitespace;
use crate::workflow::{bill_file_name, BatchReport, Stage};

/// 最新账单下载服务
pub struct BillDownloader {
    layout: CardLayout,
    download_dir: PathBuf,
    timeout: Duration,
}

impl BillDownloader {
    pub fn new(layout: CardLayout, download_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            layout,
            download_dir: download_dir.into(),
            timeout,
        }
    }

    /// 为每条记录下载一份最新账单
    ///
    /// 文件名为 `<地址>_latest_bill_<序号>.<扩展名>`，序号是记录在输入中的位置（从 1 开始）。
    pub async fn download_latest_bills<P: PageClient>(
        &self,
        session: &Session<P>,
        records: &[AccountRecord],
    ) -> BatchReport<PathBuf> {
        info!("正在为 {} 个账户下载最新账单...", records.len());
        let mut report = BatchReport::new();

        for (idx, record) in records.iter().enumerate() {
            let position = idx + 1;
            let outcome = self.download_one(session.page(), record, position).await;
            report.record(
                Stage::BillDownload,
                format!("账户 {} ({})", record.account_number, record.address),
                outcome,
            );
        }

        info!(
            "✓ 最新账单下载完成: 成功 {}/{}",
            report.succeeded.len(),
            records.len()
        );
        report
    }

    async fn download_one<P: PageClient>(
        &self,
        page: &P,
        record: &AccountRecord,
        position: usize,
    ) -> AppResult<PathBuf> {
        let card = self.find_card(page, &record.address).await?;
        let target = format!("{} 的最新账单", record.address);

        let button = page
            .locate(Some(&card), &self.layout.latest_bill_button)
            .await
            .map_err(|e| DownloadError::item(target.as_str(), e))?
            .ok_or_else(|| {
                DownloadError::item(
                    target.as_str(),
                    anyhow::anyhow!("未找到 {}", self.layout.latest_bill_button),
                )
            })?;

        let file = page
            .expect_download(&button, self.timeout)
            .await
            .map_err(|e| DownloadError::item(target.as_str(), e))?;
        debug!(
            "浏览器建议文件名: {} (暂存于 {})",
            file.suggested_filename(),
            file.path().display()
        );
        let dest = self
            .download_dir
            .join(bill_file_name(&record.address, position, &file.extension()));
        file.save_as(&dest)
            .await
            .map_err(|e| DownloadError::item(target.as_str(), e))?;

        info!(
            "✓ 已下载账户 {} 的账单: {}",
            record.account_number,
            dest.display()
        );
        Ok(dest)
    }

    /// 在当前渲染的卡片中查找地址匹配的那一张
    async fn find_card<P: PageClient>(
        &self,
        page: &P,
        address: &str,
    ) -> AppResult<P::Element> {
        let locate_failed = |e: anyhow::Error| DownloadError::item(format!("{} 的卡片", address), e);

        let container = page
            .locate(None, &self.layout.container)
            .await
            .map_err(locate_failed)?
            .ok_or_else(|| DownloadError::CardNotFound {
                address: address.to_string(),
            })?;
        let cards = page
            .locate_all(Some(&container), &self.layout.card)
            .await
            .map_err(locate_failed)?;

        for card in cards {
            let Some(heading) = page
                .locate(Some(&card), &self.layout.address)
                .await
                .map_err(locate_failed)?
            else {
                continue;
            };
            let text = page.read_text(&heading).await.map_err(locate_failed)?;
            if normalize_whitespace(&text) == address {
                debug!("找到地址为 '{}' 的卡片", address);
                return Ok(card);
            }
        }

        Err(DownloadError::CardNotFound {
            address: address.to_string(),
        }
        .into())
    }
}
