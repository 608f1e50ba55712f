//! 进度事件
//!
//! 控制器在每个阶段发出事件，展示层只读取、不参与流程

use tracing::info;

use crate::models::{GapFinding, LiteratureRecord};
use crate::utils::logging::truncate_text;
use crate::workflow::iteration_state::TerminalState;

/// 迭代过程中的事件
#[derive(Debug, Clone)]
pub enum IterationEvent {
    IterationStarted {
        iteration: usize,
        max_iterations: usize,
        query: String,
    },
    SearchCompleted {
        iteration: usize,
        records: Vec<LiteratureRecord>,
    },
    SummaryReady {
        iteration: usize,
        summary: String,
    },
    AnalysisReady {
        iteration: usize,
        analysis: String,
    },
    FindingRecorded {
        iteration: usize,
        finding: GapFinding,
        rows_total: usize,
    },
    RunFinished {
        terminal: TerminalState,
        rows_written: usize,
    },
}

/// 展示层接口
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &IterationEvent);
}

/// 什么都不做
pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_event(&self, _event: &IterationEvent) {}
}

/// 把事件写到日志
pub struct LogListener {
    verbose: bool,
}

impl LogListener {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressListener for LogListener {
    fn on_event(&self, event: &IterationEvent) {
        match event {
            IterationEvent::IterationStarted {
                iteration,
                max_iterations,
                query,
            } => {
                info!("\n{}", "─".repeat(60));
                info!("🔍 第 {}/{} 轮检索: '{}'", iteration, max_iterations, query);
            }
            IterationEvent::SearchCompleted { iteration, records } => {
                info!("📚 [迭代 {}] 共 {} 篇文献", iteration, records.len());
                let shown = if self.verbose { records.len() } else { 3 };
                for (i, record) in records.iter().take(shown).enumerate() {
                    info!("  {}. {} ({})", i + 1, truncate_text(&record.title, 100), record.identifier);
                    if self.verbose {
                        info!("     摘要: {}", truncate_text(&record.snippet, 300));
                        info!("     链接: {}", record.link);
                    }
                }
            }
            IterationEvent::SummaryReady { iteration, summary } => {
                info!("📝 [迭代 {}] 文献总结: {}", iteration, truncate_text(summary, 200));
            }
            IterationEvent::AnalysisReady { iteration, analysis } => {
                let max_len = if self.verbose { 2000 } else { 200 };
                info!("🔬 [迭代 {}] 缺口分析: {}", iteration, truncate_text(analysis, max_len));
            }
            IterationEvent::FindingRecorded {
                iteration,
                finding,
                rows_total,
            } => {
                if finding.gap_found() {
                    info!("🎯 [迭代 {}] 发现知识缺口: {}", iteration, finding.topic);
                } else {
                    info!("[迭代 {}] 未发现明显缺口", iteration);
                }
                info!("➡️ 下一轮检索词: '{}' (结果表共 {} 行)", finding.next_query, rows_total);
            }
            IterationEvent::RunFinished {
                terminal,
                rows_written,
            } => {
                info!("🏁 运行结束: {} (本次写入 {} 行)", terminal, rows_written);
            }
        }
    }
}
