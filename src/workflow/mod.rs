//! 流程层公共部件
//!
//! 单条目级别的失败隔离、全局下载计数、文件命名

pub mod counter;
pub mod item_outcome;
pub mod naming;

pub use counter::StatementCounter;
pub use item_outcome::{BatchReport, ItemFailure, Stage};
pub use naming::{bill_file_name, sanitize_file_stem, statement_file_name};
