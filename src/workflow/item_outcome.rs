//! 单条目处理结果
//!
//! 每个条目（卡片、账单）独立成败：成功的收集到 `succeeded`，
//! 失败的记录为 `ItemFailure`，批处理本身不会因为单条失败而中断。

use std::fmt;

use tracing::warn;

use crate::error::AppResult;

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    StatementDownload,
    BillDownload,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "提取",
            Stage::StatementDownload => "账单列表下载",
            Stage::BillDownload => "最新账单下载",
            Stage::Persistence => "写入",
        };
        f.write_str(name)
    }
}

/// 单条失败诊断：正在做什么、为什么失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub stage: Stage,
    /// 失败条目的描述（如 "卡片 2"、"statement_5.pdf"）
    pub subject: String,
    pub reason: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.reason)
    }
}

/// 批处理结果
#[derive(Debug)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<ItemFailure>,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// 记录一个条目的处理结果
    pub fn record(&mut self, stage: Stage, subject: impl Into<String>, outcome: AppResult<T>) {
        match outcome {
            Ok(item) => self.succeeded.push(item),
            Err(e) => {
                let failure = ItemFailure {
                    stage,
                    subject: subject.into(),
                    reason: error_chain(&e),
                };
                warn!("⚠️ {}", failure);
                self.failures.push(failure);
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 将错误及其来源链拼接为一行文本
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // thiserror 的 Display 通常已经内嵌了来源信息
        if !parts.last().is_some_and(|last| last.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}
