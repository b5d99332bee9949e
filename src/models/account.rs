use std::fmt;

use serde::{Deserialize, Serialize};

/// 账户记录
///
/// 所有字段均保留页面上的原始格式（金额、日期不做数值解析）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub current_balance: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub last_month_usage: String,
    /// 最新账单链接，只在本次运行内有效，默认不写入输出文件
    #[serde(default)]
    pub latest_bill_link: String,
}

impl AccountRecord {
    /// 读取指定字段的值
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::Address => &self.address,
            RecordField::AccountNumber => &self.account_number,
            RecordField::CurrentBalance => &self.current_balance,
            RecordField::DueDate => &self.due_date,
            RecordField::LastMonthUsage => &self.last_month_usage,
            RecordField::LatestBillLink => &self.latest_bill_link,
        }
    }
}

/// 账户记录字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Address,
    AccountNumber,
    CurrentBalance,
    DueDate,
    LastMonthUsage,
    LatestBillLink,
}

impl RecordField {
    pub const ALL: [RecordField; 6] = [
        RecordField::Address,
        RecordField::AccountNumber,
        RecordField::CurrentBalance,
        RecordField::DueDate,
        RecordField::LastMonthUsage,
        RecordField::LatestBillLink,
    ];

    /// 输出文件中使用的键名
    pub fn key(self) -> &'static str {
        match self {
            RecordField::Address => "address",
            RecordField::AccountNumber => "account_number",
            RecordField::CurrentBalance => "current_balance",
            RecordField::DueDate => "due_date",
            RecordField::LastMonthUsage => "last_month_usage",
            RecordField::LatestBillLink => "latest_bill_link",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
