//! 浏览器实现（chromiumoxide）

pub mod chromium_page;
pub mod launcher;

pub use chromium_page::ChromiumPage;
pub use launcher::ChromiumLauncher;
