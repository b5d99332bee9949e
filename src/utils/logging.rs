/// 日志工具模块
///
/// 提供阶段横幅和统计输出的辅助函数
use tracing::info;

use crate::config::Config;
use crate::orchestrator::RunStats;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 门户账户抓取");
    info!("🌐 入口: {}", config.base_url);
    info!("📁 下载目录: {}", config.download_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始
///
/// # 参数
/// - `step`: 阶段序号
/// - `total`: 阶段总数
/// - `name`: 阶段名称
pub fn log_stage(step: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 [{}/{}] {}", step, total, name);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 账户记录: {} (跳过 {})", stats.records_extracted, stats.cards_skipped);
    info!(
        "💾 结果文件: {}",
        if stats.persisted { "已写入" } else { "未写入" }
    );
    info!("📄 最新账单: {}", stats.bills_downloaded);
    info!(
        "📄 分页账单: {} (共 {} 页)",
        stats.statements_written, stats.statement_pages
    );
    info!("❌ 失败: {}", stats.failures);
    info!("{}", "=".repeat(60));
    if stats.failures > 0 {
        info!("\n失败记录已保存至: {}", config.diagnostics_file.display());
    }
}
