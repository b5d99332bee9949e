//! 基础设施层
//!
//! 持有稀缺资源（浏览器页面、会话），只暴露能力

pub mod page_client;
pub mod session;

pub use page_client::{BrowserLauncher, DownloadedFile, PageClient, Selector};
pub use session::Session;
