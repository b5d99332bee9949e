//! 账户卡片提取服务 - 业务能力层
//!
//! 把仪表盘上的卡片容器转换为 `AccountRecord` 列表。
//! 每张卡片独立提取：任一字段缺失的卡片整张跳过并记录诊断，
//! 不会输出残缺记录，也不会影响后续卡片。

use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ExtractionError};
use crate::infrastructure::{PageClient, Selector, Session};
use crate::models::{AccountRecord, CardLayout, RecordField};
use crate::workflow::{BatchReport, Stage};

/// 提取结果：成功的记录（保持页面顺序）+ 失败诊断
pub type Extraction = BatchReport<AccountRecord>;

/// 账户卡片提取服务
pub struct RecordExtractor {
    layout: CardLayout,
    timeout: Duration,
    label_prefix: Regex,
}

impl RecordExtractor {
    /// # 参数
    /// - `layout`: 卡片布局
    /// - `timeout`: 等待卡片容器出现的时限
    pub fn new(layout: CardLayout, timeout: Duration) -> Result<Self> {
        // "标签: 值" 形式，标签内不含数字和金额符号
        let label_prefix = Regex::new(r"^[^:\d$]{1,40}:\s*(.*)$")?;
        Ok(Self {
            layout,
            timeout,
            label_prefix,
        })
    }

    /// 提取当前页面上的所有账户记录
    pub async fn extract_records<P: PageClient>(
        &self,
        session: &Session<P>,
    ) -> AppResult<Extraction> {
        let page = session.page();
        info!("正在查找账户卡片容器...");

        let container = page
            .wait_for(&self.layout.container, self.timeout)
            .await
            .map_err(|source| ExtractionError::ContainerMissing {
                timeout: self.timeout,
                source,
            })?;

        let cards = page
            .locate_all(Some(&container), &self.layout.card)
            .await
            .map_err(|source| ExtractionError::CardEnumeration { source })?;

        let mut report = Extraction::new();
        if cards.is_empty() {
            info!("未找到账户卡片");
            return Ok(report);
        }

        info!("找到 {} 张账户卡片，开始处理...", cards.len());
        for (idx, card) in cards.iter().enumerate() {
            let card_index = idx + 1;
            debug!("处理卡片 {}...", card_index);
            let outcome = self
                .extract_card(page, card, card_index)
                .await
                .map_err(AppError::from);
            report.record(Stage::Extraction, format!("卡片 {}", card_index), outcome);
        }

        info!(
            "✓ 账户提取完成: 成功 {}/{}",
            report.succeeded.len(),
            cards.len()
        );
        if !report.is_clean() {
            warn!("⚠️ {} 张卡片因字段缺失被跳过", report.failures.len());
        }
        Ok(report)
    }

    async fn extract_card<P: PageClient>(
        &self,
        page: &P,
        card: &P::Element,
        card_index: usize,
    ) -> Result<AccountRecord, ExtractionError> {
        let layout = &self.layout;
        let record = AccountRecord {
            address: self
                .read_field(page, card, card_index, RecordField::Address, &layout.address)
                .await?,
            account_number: self
                .read_field(
                    page,
                    card,
                    card_index,
                    RecordField::AccountNumber,
                    &layout.account_number,
                )
                .await?,
            current_balance: self
                .read_field(
                    page,
                    card,
                    card_index,
                    RecordField::CurrentBalance,
                    &layout.current_balance,
                )
                .await?,
            due_date: self
                .read_field(page, card, card_index, RecordField::DueDate, &layout.due_date)
                .await?,
            last_month_usage: self
                .read_field(
                    page,
                    card,
                    card_index,
                    RecordField::LastMonthUsage,
                    &layout.last_month_usage,
                )
                .await?,
            latest_bill_link: self.read_bill_link(page, card, card_index).await?,
        };
        debug!("卡片 {} 提取成功: {}", card_index, record.address);
        Ok(record)
    }

    async fn read_field<P: PageClient>(
        &self,
        page: &P,
        card: &P::Element,
        card_index: usize,
        field: RecordField,
        selector: &Selector,
    ) -> Result<String, ExtractionError> {
        let missing = |reason: String| ExtractionError::RecordFieldMissing {
            card_index,
            field: field.key(),
            reason,
        };

        let element = page
            .locate(Some(card), selector)
            .await
            .map_err(|e| missing(format!("查找 {} 失败: {}", selector, e)))?
            .ok_or_else(|| missing(format!("未找到 {}", selector)))?;
        let raw = page
            .read_text(&element)
            .await
            .map_err(|e| missing(format!("读取文本失败: {}", e)))?;

        let value = match field {
            RecordField::Address => normalize_whitespace(&raw),
            _ => self.clean_value(&raw),
        };
        if value.is_empty() {
            return Err(missing("内容为空".to_string()));
        }
        Ok(value)
    }

    async fn read_bill_link<P: PageClient>(
        &self,
        page: &P,
        card: &P::Element,
        card_index: usize,
    ) -> Result<String, ExtractionError> {
        let missing = |reason: String| ExtractionError::RecordFieldMissing {
            card_index,
            field: RecordField::LatestBillLink.key(),
            reason,
        };

        let link = page
            .locate(Some(card), &self.layout.bill_link)
            .await
            .map_err(|e| missing(format!("查找 {} 失败: {}", self.layout.bill_link, e)))?
            .ok_or_else(|| missing(format!("未找到 {}", self.layout.bill_link)))?;
        let href = page
            .read_attribute(&link, "href")
            .await
            .map_err(|e| missing(format!("读取 href 失败: {}", e)))?
            .map(|h| h.trim().to_string())
            .unwrap_or_default();
        if href.is_empty() {
            return Err(missing("href 为空".to_string()));
        }
        Ok(href)
    }

    /// 规整空白并去掉 "标签: " 前缀
    pub fn clean_value(&self, raw: &str) -> String {
        let text = normalize_whitespace(raw);
        match self.label_prefix.captures(&text) {
            Some(caps) => caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
            None => text,
        }
    }
}

/// 合并连续空白并去掉首尾空白
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
