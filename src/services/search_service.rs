//! 文献检索服务 - 业务能力层
//!
//! 三层降级：PubMed API → 网页抓取 → 示例数据。
//! 第一个返回非空结果的层胜出，任何层的失败都不会向上抛出。

use crate::clients::{LiteratureSource, PubMedClient, PubMedScraper};
use crate::config::Config;
use crate::models::LiteratureRecord;
use tracing::{error, info, warn};

/// 文献检索服务
///
/// 职责：
/// - 按顺序尝试各层来源
/// - 吞掉网络/解析错误并降级
/// - 保证返回非空、长度不超过 `limit` 的结果
pub struct SearchProvider {
    tiers: Vec<Box<dyn LiteratureSource>>,
}

impl SearchProvider {
    /// 使用自定义的来源层（按优先级排列）
    pub fn new(tiers: Vec<Box<dyn LiteratureSource>>) -> Self {
        Self { tiers }
    }

    /// 按配置创建标准的 API → 抓取 两层来源
    pub fn from_config(config: &Config) -> Self {
        Self::new(vec![
            Box::new(PubMedClient::new(config)),
            Box::new(PubMedScraper::new(config)),
        ])
    }

    /// 检索文献
    ///
    /// `limit` 为 0 时按 1 处理
    pub async fn search(&self, query: &str, limit: usize) -> Vec<LiteratureRecord> {
        let limit = limit.max(1);

        for (index, tier) in self.tiers.iter().enumerate() {
            info!("🔍 [{}] 正在检索: '{}'", tier.name(), query);

            match tier.fetch(query, limit).await {
                Ok(mut records) if !records.is_empty() => {
                    records.truncate(limit);
                    info!("✓ [{}] 找到 {} 篇文献", tier.name(), records.len());
                    return records;
                }
                Ok(_) => {
                    warn!("⚠️ [{}] 没有返回结果", tier.name());
                }
                Err(e) => {
                    warn!("⚠️ [{}] 检索失败: {:#}", tier.name(), e);
                }
            }

            if index + 1 < self.tiers.len() {
                warn!("降级到下一层来源...");
            }
        }

        error!("⚠️ 所有检索来源均失败，使用示例数据");
        synthetic_records(query, limit)
    }
}

/// 最终兜底：两条固定的示例文献，标题中带有检索词
pub fn synthetic_records(query: &str, limit: usize) -> Vec<LiteratureRecord> {
    let mut records = vec![
        LiteratureRecord::new(
            format!("Research on \"{}\" - PubMed Example 1", query),
            "Abstract: Our study investigated key variables in this domain. Results showed significant correlations...",
            "https://pubmed.ncbi.nlm.nih.gov/12345678/",
            "PMID: 12345678",
        ),
        LiteratureRecord::new(
            format!("Meta-analysis of \"{}\" - PubMed Example 2", query),
            "Abstract: This systematic review examined existing literature on the topic. Meta-analysis revealed heterogeneity...",
            "https://pubmed.ncbi.nlm.nih.gov/87654321/",
            "PMID: 87654321",
        ),
    ];
    records.truncate(limit.max(1));
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_records_embed_query() {
        let records = synthetic_records("statin therapy", 10);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.title.contains("\"statin therapy\"")));
        assert_eq!(records[0].identifier, "PMID: 12345678");
        assert_eq!(records[1].identifier, "PMID: 87654321");
    }

    #[test]
    fn test_synthetic_records_are_deterministic() {
        assert_eq!(synthetic_records("q", 10), synthetic_records("q", 10));
    }

    #[test]
    fn test_synthetic_records_respect_limit() {
        assert_eq!(synthetic_records("q", 1).len(), 1);
        assert_eq!(synthetic_records("q", 0).len(), 1);
    }

    #[tokio::test]
    async fn test_search_without_tiers_falls_back_to_synthetic() {
        let provider = SearchProvider::new(Vec::new());
        let records = provider.search("aspirin", 10).await;
        assert_eq!(records.len(), 2);
    }
}
