//! LLM 服务 - 业务能力层
//!
//! 只负责"总结文献"和"分析知识缺口"两种能力，以及统一的有限重试策略

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::clients::TextGenerator;
use crate::config::Config;
use crate::error::GenerationError;
use crate::models::LiteratureRecord;

/// 所有请求共用的系统消息
pub const SYSTEM_MESSAGE: &str = "You are a helpful research assistant specializing in meta-analysis knowledge gap identification using ONLY PubMed sources. Always provide a refined search for the next iteration.";

/// 总结时最多使用的文献数
pub const MAX_SUMMARY_RECORDS: usize = 10;

const GAP_ANALYSIS_TEMPLATE: &str = "You are a PubMed meta-analysis strategist. Based ONLY on the summarized PubMed findings:\n\
{summary}\n\n\
Analyze these PubMed research findings to:\n\
1. Identify key knowledge gaps, unresolved questions, or contradictions (STRICTLY from PubMed sources only)\n\
2. If no significant gap is found, propose a refined PubMed search query\n\
3. If a gap exists, describe it clearly and suggest a compelling PubMed-based meta-analysis title\n\
4. Always provide a refined PubMed search query for the next iteration\n\n\
Structure your response with these labels:\n\
- Gap: [description of PubMed gap or No significant gap in PubMed]\n\
- Meta-analysis Title: [proposed title if gap found, otherwise N/A]\n\
- Refined PubMed Query: [suggested query for next PubMed search iteration]\n\n\
CRITICAL: Base your analysis ONLY on the provided PubMed sources. Do NOT use external knowledge or sources.";

/// 有限重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多尝试次数（含第一次）
    pub max_attempts: u32,
    /// 两次尝试之间的固定等待
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }
}

/// LLM 服务
///
/// 职责：
/// - 构建总结 / 缺口分析两种 prompt
/// - 对每次调用执行有限重试
/// - 不关心迭代流程
#[derive(Clone)]
pub struct LlmService {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl LlmService {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 带重试的生成调用
    ///
    /// 调用报错或返回空白文本都算一次失败；最后一次失败后不再等待
    pub async fn generate_with_retry(&self, prompt: &str) -> Result<String, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.generator.generate(SYSTEM_MESSAGE, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("LLM 第 {} 次尝试成功", attempt);
                    return Ok(text.trim().to_string());
                }
                Ok(_) => {
                    last_error = "LLM 返回内容为空".to_string();
                }
                Err(e) => {
                    last_error = format!("{:#}", e);
                }
            }

            warn!("第 {}/{} 次尝试失败: {}", attempt, max_attempts, last_error);
            if attempt < max_attempts {
                sleep(self.policy.backoff).await;
            }
        }

        error!("⚠️ LLM 在 {} 次尝试后仍然失败", max_attempts);
        Err(GenerationError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// 总结检索结果
    pub async fn summarize(&self, records: &[LiteratureRecord]) -> Result<String, GenerationError> {
        let prompt = build_summary_prompt(records);
        self.generate_with_retry(&prompt).await
    }

    /// 基于总结分析知识缺口
    pub async fn analyze_gaps(&self, summary: &str) -> Result<String, GenerationError> {
        let prompt = build_gap_prompt(summary);
        self.generate_with_retry(&prompt).await
    }
}

/// 构建总结 prompt，最多包含前 10 篇文献
pub fn build_summary_prompt(records: &[LiteratureRecord]) -> String {
    let mut text_content = String::new();
    for (i, record) in records.iter().take(MAX_SUMMARY_RECORDS).enumerate() {
        text_content.push_str(&format!("PubMed Result {}:\n", i + 1));
        text_content.push_str(&format!("Title: {}\n", record.title));
        text_content.push_str(&format!("PMID: {}\n", record.identifier));
        text_content.push_str(&format!("Abstract: {}\n\n", record.snippet));
    }

    format!(
        r#"Please provide a comprehensive summary of the following PubMed research for meta-analysis:

{}

Your summary should:
1. Identify main themes and methodologies (STRICTLY from these PubMed sources)
2. Highlight key findings and conclusions (STRICTLY from these PubMed sources)
3. Note any contradictions or inconsistencies (STRICTLY from these PubMed sources)
4. Keep it concise but comprehensive (3-4 paragraphs)
5. Do NOT use any external knowledge or sources"#,
        text_content
    )
}

/// 构建缺口分析 prompt
pub fn build_gap_prompt(summary: &str) -> String {
    GAP_ANALYSIS_TEMPLATE.replace("{summary}", summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> LiteratureRecord {
        LiteratureRecord::new(
            format!("Title {}", i),
            format!("Abstract {}", i),
            format!("https://pubmed.ncbi.nlm.nih.gov/{}/", i),
            format!("PMID: {}", i),
        )
    }

    #[test]
    fn test_summary_prompt_numbers_records() {
        let prompt = build_summary_prompt(&[record(1), record(2)]);
        assert!(prompt.contains("PubMed Result 1:\nTitle: Title 1\nPMID: PMID: 1\nAbstract: Abstract 1"));
        assert!(prompt.contains("PubMed Result 2:"));
        assert!(prompt.contains("Do NOT use any external knowledge"));
    }

    #[test]
    fn test_summary_prompt_caps_at_ten_records() {
        let records: Vec<_> = (1..=12).map(record).collect();
        let prompt = build_summary_prompt(&records);
        assert!(prompt.contains("PubMed Result 10:"));
        assert!(!prompt.contains("PubMed Result 11:"));
    }

    #[test]
    fn test_gap_prompt_embeds_summary_and_labels() {
        let prompt = build_gap_prompt("SUMMARY-BODY");
        assert!(prompt.contains("findings:\nSUMMARY-BODY\n\n"));
        assert!(prompt.contains("- Gap:"));
        assert!(prompt.contains("- Meta-analysis Title:"));
        assert!(prompt.contains("- Refined PubMed Query:"));
        assert!(!prompt.contains("{summary}"));
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }
}
