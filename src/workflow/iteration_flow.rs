//! 单轮迭代流程 - 流程层
//!
//! 核心职责：定义"一轮迭代"的完整处理流程
//!
//! 流程顺序：
//! 1. 检索文献（三层降级，永不失败）
//! 2. LLM 总结
//! 3. LLM 缺口分析
//! 4. 抽取结构化结论
//! 5. 追加到结果表

use std::fmt::Display;

use tracing::{error, info};

use crate::config::Config;
use crate::error::{GenerationError, StoreError};
use crate::models::GapFinding;
use crate::services::{LlmService, RecordStore, ResponseExtractor, SearchProvider};
use crate::workflow::iteration_state::IterationState;
use crate::workflow::progress::{IterationEvent, ProgressListener};

/// 失败发生在哪一次 LLM 调用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Summarize,
    AnalyzeGaps,
}

impl Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Summarize => f.write_str("文献总结"),
            GenerationStage::AnalyzeGaps => f.write_str("缺口分析"),
        }
    }
}

/// 单轮迭代的结果
#[derive(Debug)]
pub enum StepOutcome {
    /// 已写入结果表
    Recorded {
        finding: GapFinding,
        rows_total: usize,
    },
    /// 检索为空
    NoResults,
    /// LLM 重试耗尽
    GenerationFailed {
        stage: GenerationStage,
        error: GenerationError,
    },
}

/// 单轮迭代流程
///
/// - 编排一轮的 检索 → 总结 → 分析 → 抽取 → 写表
/// - 不决定是否继续下一轮，由控制器根据返回值决定
pub struct IterationFlow {
    search: SearchProvider,
    llm: LlmService,
    extractor: ResponseExtractor,
    store: RecordStore,
    results_per_search: usize,
}

impl IterationFlow {
    pub fn new(
        search: SearchProvider,
        llm: LlmService,
        store: RecordStore,
        results_per_search: usize,
    ) -> Self {
        Self {
            search,
            llm,
            extractor: ResponseExtractor::new(),
            store,
            results_per_search,
        }
    }

    pub fn from_config(config: &Config, llm: LlmService) -> Self {
        Self::new(
            SearchProvider::from_config(config),
            llm,
            RecordStore::new(&config.csv_path),
            config.results_per_search,
        )
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// 执行一轮迭代
    ///
    /// 只有写表失败会返回 `Err`，其余情况都体现在 `StepOutcome` 里
    pub async fn run(
        &self,
        state: &IterationState,
        listener: &dyn ProgressListener,
    ) -> Result<StepOutcome, StoreError> {
        let iteration = state.iteration_index;
        let query = state.current_query.as_str();

        // ========== 步骤 1: 检索 ==========
        let records = self.search.search(query, self.results_per_search).await;
        if records.is_empty() {
            return Ok(StepOutcome::NoResults);
        }
        listener.on_event(&IterationEvent::SearchCompleted {
            iteration,
            records: records.clone(),
        });

        // ========== 步骤 2: 总结 ==========
        info!("{} 🧠 正在总结文献...", state);
        let summary = match self.llm.summarize(&records).await {
            Ok(summary) => summary,
            Err(e) => return Ok(self.generation_failed(state, GenerationStage::Summarize, e)),
        };
        listener.on_event(&IterationEvent::SummaryReady {
            iteration,
            summary: summary.clone(),
        });

        // ========== 步骤 3: 缺口分析 ==========
        info!("{} 🔬 正在分析知识缺口...", state);
        let analysis = match self.llm.analyze_gaps(&summary).await {
            Ok(analysis) => analysis,
            Err(e) => return Ok(self.generation_failed(state, GenerationStage::AnalyzeGaps, e)),
        };
        listener.on_event(&IterationEvent::AnalysisReady {
            iteration,
            analysis: analysis.clone(),
        });

        // ========== 步骤 4: 抽取 + 写表 ==========
        let finding = self.extractor.extract(&analysis, query);
        let rows_total = self.store.append(&finding).await?;

        listener.on_event(&IterationEvent::FindingRecorded {
            iteration,
            finding: finding.clone(),
            rows_total,
        });

        Ok(StepOutcome::Recorded {
            finding,
            rows_total,
        })
    }

    fn generation_failed(
        &self,
        state: &IterationState,
        stage: GenerationStage,
        error: GenerationError,
    ) -> StepOutcome {
        error!("{} ⚠️ {}失败: {}", state, stage, error);
        StepOutcome::GenerationFailed { stage, error }
    }
}
