//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! portal_run::App (登录 + 各阶段调度 + 会话释放)
//!     ↓
//! services (能力层：登录 / 提取 / 下载 / 写入)
//!     ↓
//! workflow (单条目结果、计数器、命名)
//!     ↓
//! infrastructure (基础设施：PageClient / Session)
//! ```
//!
//! 只有编排层持有会话，并负责在所有退出路径上释放它。

pub mod portal_run;

pub use portal_run::{App, RunStats};
