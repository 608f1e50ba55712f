//! 外部系统客户端（基础设施层）
//!
//! 只暴露"取文献"和"生成文本"两种能力，不关心迭代流程

pub mod llm_client;
pub mod pubmed_client;
pub mod pubmed_scraper;

pub use llm_client::LlmClient;
pub use pubmed_client::PubMedClient;
pub use pubmed_scraper::PubMedScraper;

use crate::models::LiteratureRecord;
use anyhow::Result;
use async_trait::async_trait;

/// 一层文献来源
///
/// 返回错误或空列表都表示本层失败，由 `SearchProvider` 降级到下一层
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// 用于日志的来源名称
    fn name(&self) -> &str;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<LiteratureRecord>>;
}

/// 文本生成后端
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_message: &str, user_message: &str) -> Result<String>;
}
