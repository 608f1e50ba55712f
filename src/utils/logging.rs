/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::GapSummary;
use crate::orchestrator::RunOutcome;

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以它为准，否则为 info（详细模式为 debug）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - PubMed 荟萃分析知识缺口挖掘");
    info!("启动时间: {}", now());
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📄 结果表: {}", config.csv_path);
    if config.llm_api_key.is_empty() {
        info!("⚠️ 未设置 LLM_API_KEY，LLM 调用可能失败");
    }
    if config.pubmed_api_key.is_empty() {
        info!("💡 未设置 PUBMED_API_KEY，将使用匿名额度");
    }
    info!("{}", "=".repeat(60));
}

/// 记录运行开始信息
pub fn log_run_start(topic: &str, max_iterations: usize) {
    info!("\n{}", "=".repeat(60));
    info!("🔬 研究主题: {}", topic);
    info!("🔁 最大迭代次数: {}", max_iterations);
    info!("💡 按 Ctrl-C 可在下一轮开始前停止");
    info!("{}", "=".repeat(60));
}

/// 打印发现的知识缺口
pub fn log_gaps(gaps: &[GapSummary]) {
    if gaps.is_empty() {
        info!("本次运行没有发现知识缺口");
        return;
    }
    info!("\n🎯 发现 {} 个知识缺口:", gaps.len());
    for gap in gaps {
        info!("{}", "─".repeat(60));
        info!("迭代 {}: {}", gap.iteration, gap.title);
        info!("{}", truncate_text(&gap.description, 500));
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(outcome: &RunOutcome, total_rows: usize, csv_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计");
    info!("完成时间: {}", now());
    info!("{}", "=".repeat(60));
    info!("终止状态: {}", outcome.terminal);
    if outcome.completed_normally() {
        info!("✅ 全部 {} 轮迭代正常完成", outcome.iterations_attempted);
    } else {
        info!("⏹️ 运行提前结束 (进入第 {} 轮)", outcome.iterations_attempted);
    }
    info!("📝 本次写入: {} 行", outcome.rows_written);
    info!("🎯 发现缺口: {} 个", outcome.gaps.len());
    info!("{}", "=".repeat(60));
    info!("\n结果表共 {} 行，保存在: {}", total_rows, csv_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
