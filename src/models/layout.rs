//! 门户页面布局
//!
//! 把每个语义角色（"卡片容器"、"下一页按钮"……）映射到具体的匹配规则。
//! 默认值对应当前门户的页面结构，也可以通过 TOML 文件局部覆盖。

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ConfigError;
use crate::infrastructure::Selector;

/// 登录流程涉及的元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginLayout {
    /// 入口页上进入登录表单的链接（存在时点击）
    pub entry_link: Option<Selector>,
    /// Cookie 同意按钮（存在时点击）
    pub cookie_accept: Option<Selector>,
    pub username_input: Selector,
    pub password_input: Selector,
    pub submit_button: Selector,
    /// 二次验证码输入框
    pub mfa_input: Selector,
    /// 登录成功后仪表盘上的标志元素
    pub dashboard_marker: Selector,
}

impl Default for LoginLayout {
    fn default() -> Self {
        Self {
            entry_link: Some(Selector::css("a").containing("Try 2FA Login")),
            cookie_accept: Some(Selector::css("button.btn-allow")),
            username_input: Selector::css("input[name='username']"),
            password_input: Selector::css("input[name='password']"),
            submit_button: Selector::css("button[type='submit']"),
            mfa_input: Selector::css("input#mfa_code"),
            dashboard_marker: Selector::css("h2").containing("PowerCo Dashboard"),
        }
    }
}

/// 账户卡片及其字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    /// 所有卡片的父容器
    pub container: Selector,
    /// 容器内的单张卡片
    pub card: Selector,
    pub address: Selector,
    pub account_number: Selector,
    pub current_balance: Selector,
    pub due_date: Selector,
    pub last_month_usage: Selector,
    /// 账单链接元素（读取 href）
    pub bill_link: Selector,
    /// "最新账单"下载按钮
    pub latest_bill_button: Selector,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            container: Selector::css("div.grid.gap-6.mb-8"),
            card: Selector::css(":scope > div.bg-white"),
            address: Selector::css("h3.text-xl.font-semibold"),
            account_number: Selector::css("p").containing("Account #:"),
            current_balance: Selector::css("span.font-semibold").containing("$"),
            due_date: Selector::css("span").containing(", 20"),
            last_month_usage: Selector::css("span").containing("kWh"),
            bill_link: Selector::css("a.bg-blue-600"),
            latest_bill_button: Selector::css("a").containing("Latest Bill"),
        }
    }
}

/// 账单列表（分页表格）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementLayout {
    /// 表格中每一行的下载链接
    pub download_link: Selector,
    /// 下一页按钮
    pub next_page: Selector,
}

impl Default for StatementLayout {
    fn default() -> Self {
        Self {
            download_link: Selector::css("tr td a.text-blue-600"),
            next_page: Selector::css("a").containing("Next"),
        }
    }
}

/// 门户页面布局
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalLayout {
    pub login: LoginLayout,
    pub cards: CardLayout,
    pub statements: StatementLayout,
}

impl PortalLayout {
    /// 从 TOML 文本解析，未出现的角色沿用默认值
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 从 TOML 文件加载布局
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取布局文件: {}", path.display()))
            .and_then(|content| Self::from_toml_str(&content))
            .map_err(|source| ConfigError::LayoutParseFailed {
                path: path.display().to_string(),
                source,
            })
    }
}
