//! # Portal Harvest
//!
//! 自动登录账户门户，提取账户信息并下载账单的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（页面、会话），只暴露能力
//! - `PageClient` - 页面操作能力（定位、读取、点击、填写、捕获下载）
//! - `Session` - 已登录会话，独占持有浏览器，流程结束时释放
//! - `browser/` - 基于 chromiumoxide 的 `PageClient` 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `SessionAuthenticator` - 账号密码 + 二次验证登录
//! - `RecordExtractor` - 账户卡片 → `AccountRecord`
//! - `StatementDownloader` - 分页账单下载（全局编号）
//! - `BillDownloader` - 按账户下载最新账单
//! - `OutputWriter` - 写入 JSON 结果
//! - `DiagnosticWriter` - 写失败诊断日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 单条目失败隔离、全局计数器、文件命名
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/portal_run` - 登录、阶段调度、会话释放、统计

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{ChromiumLauncher, ChromiumPage};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserLauncher, DownloadedFile, PageClient, Selector, Session};
pub use models::{AccountRecord, PortalLayout, RecordField};
pub use orchestrator::{App, RunStats};
pub use workflow::{BatchReport, ItemFailure, StatementCounter};
