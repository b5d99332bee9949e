//! 门户抓取编排 - 编排层
//!
//! ## 职责
//!
//! 1. **初始化**：加载页面布局、创建各项服务
//! 2. **登录**：建立会话，失败则整个流程结束
//! 3. **调度**：提取 → 写入 → 最新账单下载 → 分页账单下载
//! 4. **资源管理**：无论哪一步失败，都保证释放会话
//! 5. **统计**：汇总结果并写入失败诊断

use anyhow::Result;
use tracing::{error, info, warn};

use crate::browser::ChromiumLauncher;
use crate::config::Config;
use crate::error::{AppError, DownloadError};
use crate::infrastructure::{BrowserLauncher, Session};
use crate::models::PortalLayout;
use crate::services::{
    BillDownloader, Credentials, DiagnosticWriter, OutputWriter, RecordExtractor,
    SessionAuthenticator, StatementDownloader,
};
use crate::utils::logging::{log_stage, log_startup, print_final_stats};
use crate::workflow::item_outcome::error_chain;
use crate::workflow::{ItemFailure, Stage};

const TOTAL_STAGES: usize = 4;

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub records_extracted: usize,
    pub cards_skipped: usize,
    pub persisted: bool,
    pub bills_downloaded: usize,
    pub statements_written: usize,
    pub statement_pages: usize,
    pub failures: usize,
}

/// 应用主结构
pub struct App<L: BrowserLauncher = ChromiumLauncher> {
    config: Config,
    authenticator: SessionAuthenticator<L>,
    extractor: RecordExtractor,
    bill_downloader: BillDownloader,
    statement_downloader: StatementDownloader,
    output_writer: OutputWriter,
    diagnostics: DiagnosticWriter,
}

impl App<ChromiumLauncher> {
    /// 使用 Chromium 浏览器初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let layout = match &config.layout_file {
            Some(path) => {
                info!("📐 加载页面布局: {}", path.display());
                PortalLayout::load(path).await?
            }
            None => PortalLayout::default(),
        };
        let launcher = ChromiumLauncher::new(config.chrome_path.clone(), &config.download_dir);
        Self::with_launcher(config, layout, launcher)
    }
}

impl<L: BrowserLauncher> App<L> {
    /// 使用指定的浏览器启动器初始化应用
    pub fn with_launcher(config: Config, layout: PortalLayout, launcher: L) -> Result<Self> {
        let PortalLayout {
            login,
            cards,
            statements,
        } = layout;

        Ok(Self {
            authenticator: SessionAuthenticator::new(
                launcher,
                login,
                Credentials::from_config(&config),
            ),
            extractor: RecordExtractor::new(cards.clone(), config.timeout)?,
            bill_downloader: BillDownloader::new(cards, &config.download_dir, config.timeout),
            statement_downloader: StatementDownloader::new(
                statements,
                &config.download_dir,
                config.timeout,
            ),
            output_writer: OutputWriter::new(),
            diagnostics: DiagnosticWriter::with_path(&config.diagnostics_file),
            config,
        })
    }

    /// 替换分页下载服务（如调整下载间隔）
    pub fn with_statement_downloader(mut self, downloader: StatementDownloader) -> Self {
        self.statement_downloader = downloader;
        self
    }

    /// 运行应用主逻辑
    ///
    /// 登录失败直接返回错误；之后各阶段的失败只记录，不中断其他阶段。
    pub async fn run(&self) -> Result<RunStats> {
        if let Err(e) = self.diagnostics.init().await {
            warn!("⚠️ 无法初始化诊断日志: {}", e);
        }
        log_startup(&self.config);

        let session = self
            .authenticator
            .establish_session(self.config.headless)
            .await
            .map_err(AppError::from)?;

        let mut failures = Vec::new();
        let stats = self.run_stages(&session, &mut failures).await;

        if let Err(e) = session.release().await {
            warn!("⚠️ {}", e);
        }

        if let Err(e) = self.diagnostics.write_all(&failures).await {
            error!("❌ 写入失败记录出错: {}", e);
        }
        print_final_stats(&stats, &self.config);
        Ok(stats)
    }

    async fn run_stages(
        &self,
        session: &Session<L::Page>,
        failures: &mut Vec<ItemFailure>,
    ) -> RunStats {
        let mut stats = RunStats::default();

        // ========== 1. 提取账户卡片 ==========
        log_stage(1, TOTAL_STAGES, "提取账户卡片");
        let records = match self.extractor.extract_records(session).await {
            Ok(extraction) => {
                stats.records_extracted = extraction.succeeded.len();
                stats.cards_skipped = extraction.failures.len();
                failures.extend(extraction.failures);
                extraction.succeeded
            }
            Err(e) => {
                error!("❌ 账户提取失败: {}", e);
                failures.push(stage_failure(Stage::Extraction, "账户卡片容器", &e));
                Vec::new()
            }
        };

        // ========== 2. 写入结果 ==========
        log_stage(2, TOTAL_STAGES, "写入账户记录");
        stats.persisted = self
            .output_writer
            .persist(&records, &self.config.output_file)
            .await;
        if !stats.persisted {
            failures.push(ItemFailure {
                stage: Stage::Persistence,
                subject: self.config.output_file.display().to_string(),
                reason: "写入失败，详见日志".to_string(),
            });
        }

        // ========== 3. 最新账单 ==========
        log_stage(3, TOTAL_STAGES, "下载最新账单");
        let bills = self
            .bill_downloader
            .download_latest_bills(session, &records)
            .await;
        stats.bills_downloaded = bills.succeeded.len();
        failures.extend(bills.failures);

        // ========== 4. 分页账单 ==========
        log_stage(4, TOTAL_STAGES, "下载分页账单");
        match self
            .statement_downloader
            .download_all_statements(session)
            .await
        {
            Ok(summary) => {
                stats.statements_written = summary.written();
                stats.statement_pages = summary.pages_visited;
                failures.extend(summary.report.failures);
            }
            Err(e) => {
                error!("❌ 分页下载中止: {}", e);
                if let AppError::Download(DownloadError::PaginationAborted { page, written, .. }) = &e {
                    stats.statements_written = *written;
                    stats.statement_pages = *page;
                }
                failures.push(stage_failure(Stage::StatementDownload, "分页", &e));
            }
        }

        stats.failures = failures.len();
        stats
    }
}

fn stage_failure(stage: Stage, subject: &str, error: &AppError) -> ItemFailure {
    ItemFailure {
        stage,
        subject: subject.to_string(),
        reason: error_chain(error),
    }
}
