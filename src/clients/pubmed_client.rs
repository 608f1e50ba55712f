/// PubMed E-utilities 客户端
///
/// 两段式检索：esearch 取 PMID 列表，efetch 批量拉取文献详情
use crate::clients::LiteratureSource;
use crate::config::Config;
use crate::error::SearchError;
use crate::models::LiteratureRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const NO_TITLE: &str = "No title available";
const NO_ABSTRACT: &str = "No abstract available";
const ARTICLE_BASE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed 官方 API 客户端
pub struct PubMedClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: ESearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedClient {
    /// 创建新的 PubMed 客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.pubmed_api_url, &config.pubmed_api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            http: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    /// 第一步：检索词 → PMID 列表（最多 `limit` 个）
    pub async fn search_ids(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let endpoint = format!("{}esearch.fcgi", self.base_url);
        let retmax = limit.to_string();
        let mut params = vec![
            ("db", "pubmed"),
            ("term", query),
            ("retmax", retmax.as_str()),
            ("retmode", "json"),
        ];
        if !self.api_key.is_empty() {
            params.push(("api_key", self.api_key.as_str()));
        }

        let response = self
            .http
            .get(&endpoint)
            .query(&params)
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| SearchError::request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }
            .into());
        }

        let body: ESearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::malformed(&endpoint, e.to_string()))?;

        let mut ids = body.esearchresult.idlist;
        ids.truncate(limit);
        debug!("esearch 返回 {} 个 PMID", ids.len());
        Ok(ids)
    }

    /// 第二步：按 PMID 批量拉取文献详情
    pub async fn fetch_records(&self, ids: &[String]) -> Result<Vec<LiteratureRecord>> {
        let endpoint = format!("{}efetch.fcgi", self.base_url);
        let id_list = ids.join(",");
        let mut params = vec![
            ("db", "pubmed"),
            ("id", id_list.as_str()),
            ("retmode", "xml"),
        ];
        if !self.api_key.is_empty() {
            params.push(("api_key", self.api_key.as_str()));
        }

        let response = self
            .http
            .get(&endpoint)
            .query(&params)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| SearchError::request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::BadStatus {
                endpoint,
                status: status.as_u16(),
            }
            .into());
        }

        let xml = response
            .text()
            .await
            .map_err(|e| SearchError::request_failed(&endpoint, e))?;

        parse_efetch_xml(&xml).with_context(|| format!("解析 efetch 响应失败: {}", endpoint))
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    fn name(&self) -> &str {
        "PubMed API"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<LiteratureRecord>> {
        let ids = self.search_ids(query, limit).await?;
        if ids.is_empty() {
            warn!("⚠️ PubMed API 未找到与检索词匹配的 PMID");
            return Ok(Vec::new());
        }
        self.fetch_records(&ids).await
    }
}

/// 解析过程中正在累积的一篇文章
#[derive(Debug, Default)]
struct ArticleDraft {
    pmid: Option<String>,
    title: String,
    abstract_parts: Vec<String>,
}

impl ArticleDraft {
    fn into_record(self) -> LiteratureRecord {
        let pmid = self.pmid.unwrap_or_default();
        let title = self.title.trim();
        let parts: Vec<&str> = self
            .abstract_parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        LiteratureRecord {
            title: if title.is_empty() { NO_TITLE.to_string() } else { title.to_string() },
            snippet: if parts.is_empty() { NO_ABSTRACT.to_string() } else { parts.join(" ") },
            link: format!("{}/{}/", ARTICLE_BASE_URL, pmid),
            identifier: format!("PMID: {}", pmid),
        }
    }
}

/// 解析 efetch 返回的 XML
///
/// 每个 `PubmedArticle` 产出一条记录；标题和摘要中的行内标签（`<i>`、`<sup>` 等）会被展平为纯文本
pub fn parse_efetch_xml(xml: &str) -> Result<Vec<LiteratureRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleDraft> = None;
    let mut records = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("XML 解析失败 (位置 {})", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" => current = Some(ArticleDraft::default()),
                    "AbstractText" => {
                        if let Some(article) = current.as_mut() {
                            article.abstract_parts.push(String::new());
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(ref e) => {
                stack.pop();
                if e.local_name().as_ref() == b"PubmedArticle" {
                    if let Some(article) = current.take() {
                        records.push(article.into_record());
                    }
                }
            }
            Event::Text(ref e) => {
                if let Some(article) = current.as_mut() {
                    let text = e.unescape().context("XML 实体解码失败")?;
                    if stack.iter().any(|n| n == "ArticleTitle") {
                        article.title.push_str(&text);
                    } else if stack.iter().any(|n| n == "AbstractText") {
                        if let Some(part) = article.abstract_parts.last_mut() {
                            part.push_str(&text);
                        }
                    } else if stack.last().map(String::as_str) == Some("PMID") && article.pmid.is_none() {
                        article.pmid = Some(text.trim().to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31234567</PMID>
      <Article>
        <ArticleTitle>Vitamin D and <i>bone</i> density: a cohort study.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Background text &amp; context.</AbstractText>
          <AbstractText Label="RESULTS">Results text.</AbstractText>
        </Abstract>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ReferenceList>
        <Reference><ArticleIdList><ArticleId IdType="pubmed">11111111</ArticleId></ArticleIdList></Reference>
      </ReferenceList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">30000001</PMID>
      <Article></Article>
      <CommentsCorrectionsList>
        <CommentsCorrections><PMID Version="1">29999999</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch_full_article() {
        let records = parse_efetch_xml(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Vitamin D and bone density: a cohort study.");
        assert_eq!(first.snippet, "Background text & context. Results text.");
        assert_eq!(first.identifier, "PMID: 31234567");
        assert_eq!(first.link, "https://pubmed.ncbi.nlm.nih.gov/31234567/");
    }

    #[test]
    fn test_parse_efetch_missing_fields_use_defaults() {
        let records = parse_efetch_xml(SAMPLE).unwrap();
        let second = &records[1];
        assert_eq!(second.title, NO_TITLE);
        assert_eq!(second.snippet, NO_ABSTRACT);
        // 只取第一个 PMID，忽略引用列表里的
        assert_eq!(second.identifier, "PMID: 30000001");
    }

    #[test]
    fn test_parse_efetch_malformed_xml_is_error() {
        let result = parse_efetch_xml("<PubmedArticleSet><PubmedArticle></PubmedArticleSet>");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_efetch_empty_set() {
        let records = parse_efetch_xml("<PubmedArticleSet></PubmedArticleSet>").unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_pubmed_api_connectivity() {
        let _ = tracing_subscriber::fmt::try_init();

        let client = PubMedClient::new(&Config::default());
        let records = client.fetch("vitamin D meta-analysis", 3).await.unwrap();

        println!("找到 {} 篇文献", records.len());
        for record in &records {
            println!("  {}", record);
        }
        assert!(records.len() <= 3);
    }
}
