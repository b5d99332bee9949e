//! 失败诊断写入服务 - 业务能力层
//!
//! 只负责把无法处理的条目追加到诊断日志，不关心流程

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::workflow::ItemFailure;

/// 失败诊断写入服务
pub struct DiagnosticWriter {
    path: PathBuf,
}

impl DiagnosticWriter {
    pub fn new() -> Self {
        Self::with_path("failures.txt")
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入本次运行的日志头（覆盖旧内容）
    pub async fn init(&self) -> Result<()> {
        let header = format!(
            "{}\n门户抓取失败记录 - {}\n{}\n\n",
            "=".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(60)
        );
        fs::write(&self.path, header)
            .await
            .with_context(|| format!("无法初始化诊断日志: {}", self.path.display()))
    }

    /// 追加一批失败记录
    pub async fn write_all(&self, failures: &[ItemFailure]) -> Result<()> {
        if failures.is_empty() {
            return Ok(());
        }
        debug!("写入 {} 条失败记录到 {}", failures.len(), self.path.display());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("无法打开诊断日志: {}", self.path.display()))?;

        let now = chrono::Local::now().format("%H:%M:%S");
        let mut buf = String::new();
        for failure in failures {
            buf.push_str(&format!(
                "{} | {} | {} | {}\n",
                now, failure.stage, failure.subject, failure.reason
            ));
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

impl Default for DiagnosticWriter {
    fn default() -> Self {
        Self::new()
    }
}
