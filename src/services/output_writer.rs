//! 结果写入服务 - 业务能力层
//!
//! 将账户记录写为 JSON 数组（4 空格缩进），按排除策略去掉指定字段，
//! 默认排除只在本次运行内有效的账单链接。

use std::collections::BTreeSet;
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, error, info};

use crate::error::PersistenceError;
use crate::models::{AccountRecord, RecordField};

/// 结果写入服务
#[derive(Debug, Clone)]
pub struct OutputWriter {
    excluded: BTreeSet<RecordField>,
}

impl OutputWriter {
    /// 使用默认排除策略（排除 `latest_bill_link`）
    pub fn new() -> Self {
        Self::with_excluded([RecordField::LatestBillLink])
    }

    /// 自定义排除字段
    pub fn with_excluded(fields: impl IntoIterator<Item = RecordField>) -> Self {
        Self {
            excluded: fields.into_iter().collect(),
        }
    }

    pub fn excluded(&self) -> &BTreeSet<RecordField> {
        &self.excluded
    }

    /// 序列化为 JSON 文本
    pub fn to_json(&self, records: &[AccountRecord]) -> Result<String, PersistenceError> {
        let filtered: Vec<FilteredRecord<'_>> = records
            .iter()
            .map(|record| FilteredRecord {
                record,
                excluded: &self.excluded,
            })
            .collect();

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        filtered.serialize(&mut ser)?;
        // serde_json 只输出合法 UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// 写入文件（覆盖原有内容），失败时返回错误
    pub async fn try_persist(
        &self,
        records: &[AccountRecord],
        destination: &Path,
    ) -> Result<(), PersistenceError> {
        let json = self.to_json(records)?;
        let path = destination.display().to_string();
        let excluded: Vec<&str> = self.excluded().iter().map(|f| f.key()).collect();
        debug!("写入 {} 条记录，排除字段: {:?}", records.len(), excluded);

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::write(path.as_str(), e))?;
        }
        fs::write(destination, json)
            .await
            .map_err(|e| PersistenceError::write(path.as_str(), e))?;
        Ok(())
    }

    /// 写入文件，失败只记录日志，不向上传播
    ///
    /// # 返回
    /// 返回是否写入成功
    pub async fn persist(&self, records: &[AccountRecord], destination: &Path) -> bool {
        match self.try_persist(records, destination).await {
            Ok(()) => {
                info!(
                    "✓ {} 条账户记录已写入 {}",
                    records.len(),
                    destination.display()
                );
                true
            }
            Err(e) => {
                error!("❌ 写入账户记录失败: {}", e);
                false
            }
        }
    }

    /// 读取之前写入的记录，被排除的字段为空字符串
    pub async fn read_records(path: &Path) -> Result<Vec<AccountRecord>, PersistenceError> {
        let read_failed = |source: anyhow::Error| PersistenceError::Read {
            path: path.display().to_string(),
            source,
        };
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| read_failed(e.into()))?;
        serde_json::from_str(&content).map_err(|e| read_failed(e.into()))
    }
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// 按字段顺序输出、跳过被排除字段的记录视图
struct FilteredRecord<'a> {
    record: &'a AccountRecord,
    excluded: &'a BTreeSet<RecordField>,
}

impl Serialize for FilteredRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kept: Vec<RecordField> = RecordField::ALL
            .into_iter()
            .filter(|f| !self.excluded.contains(f))
            .collect();
        let mut map = serializer.serialize_map(Some(kept.len()))?;
        for field in kept {
            map.serialize_entry(field.key(), self.record.field(field))?;
        }
        map.end()
    }
}
