/// PubMed 网页抓取客户端
///
/// 官方 API 不可用时的兜底：直接请求检索结果页并解析 HTML
use crate::clients::LiteratureSource;
use crate::config::Config;
use crate::error::SearchError;
use crate::models::LiteratureRecord;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const NO_TITLE: &str = "No title available";
const NO_ABSTRACT: &str = "No abstract available";

/// PubMed 网页抓取器
pub struct PubMedScraper {
    http: Client,
    web_url: String,
    delay_min_secs: f64,
    delay_max_secs: f64,
}

impl PubMedScraper {
    /// 创建新的抓取器
    pub fn new(config: &Config) -> Self {
        let (delay_min_secs, delay_max_secs) =
            delay_range(config.scrape_delay_min_secs, config.scrape_delay_max_secs);
        Self {
            http: Client::new(),
            web_url: config.pubmed_web_url.trim_end_matches('/').to_string(),
            delay_min_secs,
            delay_max_secs,
        }
    }

    /// 构造检索结果页 URL
    pub fn search_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/?term={}&size={}",
            self.web_url,
            urlencoding::encode(query),
            limit
        )
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert("dnt", HeaderValue::from_static("1"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers
    }

    /// 请求前随机等待，降低被限流的概率
    async fn polite_delay(&self) {
        if self.delay_max_secs <= 0.0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(self.delay_min_secs..=self.delay_max_secs);
        debug!("抓取前等待 {:.1} 秒", secs);
        sleep(Duration::from_secs_f64(secs)).await;
    }

    async fn fetch_page(&self, query: &str, limit: usize) -> Result<String> {
        self.polite_delay().await;

        let url = self.search_url(query, limit);
        let response = self
            .http
            .get(&url)
            .headers(Self::browser_headers())
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| SearchError::request_failed(&url, e))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(SearchError::BadStatus {
                endpoint: url,
                status: status.as_u16(),
            }
            .into());
        }

        Ok(response
            .text()
            .await
            .map_err(|e| SearchError::request_failed(&url, e))?)
    }
}

#[async_trait]
impl LiteratureSource for PubMedScraper {
    fn name(&self) -> &str {
        "PubMed 网页抓取"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<LiteratureRecord>> {
        let html = self.fetch_page(query, limit).await?;
        let records = parse_results_page(&html, &self.web_url, limit);
        if records.is_empty() {
            warn!("⚠️ 结果页中没有找到文献卡片");
        }
        Ok(records)
    }
}

/// 整理等待区间：负数和 NaN 视为 0，上下界颠倒时交换
fn delay_range(min_secs: f64, max_secs: f64) -> (f64, f64) {
    let min_secs = min_secs.max(0.0);
    let max_secs = max_secs.max(0.0);
    if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    }
}

/// 解析检索结果页
///
/// 每个 `div.docsum` 卡片产出一条记录，缺失的子元素用占位文本代替
pub fn parse_results_page(html: &str, web_url: &str, limit: usize) -> Vec<LiteratureRecord> {
    let (Ok(card_sel), Ok(title_sel), Ok(snippet_sel), Ok(pmid_sel)) = (
        Selector::parse("div.docsum"),
        Selector::parse("a.docsum-title"),
        Selector::parse("div.docsum-snippet"),
        Selector::parse("span.docsum-pmid"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let base = web_url.trim_end_matches('/');

    document
        .select(&card_sel)
        .take(limit)
        .map(|card| {
            let title_el = card.select(&title_sel).next();
            let link = title_el
                .and_then(|el| el.value().attr("href"))
                .map(|href| format!("{}{}", base, href))
                .unwrap_or_default();

            LiteratureRecord {
                title: element_text(title_el).unwrap_or_else(|| NO_TITLE.to_string()),
                snippet: element_text(card.select(&snippet_sel).next())
                    .unwrap_or_else(|| NO_ABSTRACT.to_string()),
                link,
                identifier: element_text(card.select(&pmid_sel).next()).unwrap_or_default(),
            }
        })
        .collect()
}

fn element_text(element: Option<ElementRef<'_>>) -> Option<String> {
    element.map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <div class="search-results">
    <article class="full-docsum">
      <div class="docsum">
        <a class="docsum-title" href="/31234567/">Omega-3 <b>supplementation</b> in adults</a>
        <div class="docsum-snippet">Randomized trial of omega-3.</div>
        <span class="docsum-pmid">31234567</span>
      </div>
    </article>
    <article class="full-docsum">
      <div class="docsum">
        <span class="docsum-pmid">30000002</span>
      </div>
    </article>
    <article class="full-docsum">
      <div class="docsum">
        <a class="docsum-title" href="/30000003/">Third result</a>
      </div>
    </article>
  </div>
</body></html>"#;

    #[test]
    fn test_parse_results_page_extracts_cards() {
        let records = parse_results_page(PAGE, "https://pubmed.ncbi.nlm.nih.gov/", 10);
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.title, "Omega-3 supplementation in adults");
        assert_eq!(first.snippet, "Randomized trial of omega-3.");
        assert_eq!(first.identifier, "31234567");
        assert_eq!(first.link, "https://pubmed.ncbi.nlm.nih.gov/31234567/");
    }

    #[test]
    fn test_parse_results_page_missing_elements_use_placeholders() {
        let records = parse_results_page(PAGE, "https://pubmed.ncbi.nlm.nih.gov", 10);
        let second = &records[1];
        assert_eq!(second.title, NO_TITLE);
        assert_eq!(second.snippet, NO_ABSTRACT);
        assert_eq!(second.link, "");
        assert_eq!(second.identifier, "30000002");
    }

    #[test]
    fn test_parse_results_page_respects_limit() {
        let records = parse_results_page(PAGE, "https://pubmed.ncbi.nlm.nih.gov", 2);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_results_page_without_cards() {
        let records = parse_results_page("<html><body>Blocked</body></html>", "https://x", 10);
        assert!(records.is_empty());
    }

    #[test]
    fn test_delay_range_is_normalized() {
        assert_eq!(delay_range(3.0, 6.0), (3.0, 6.0));
        assert_eq!(delay_range(7.0, 6.0), (6.0, 7.0));
        assert_eq!(delay_range(-2.0, -1.0), (0.0, 0.0));
        assert_eq!(delay_range(f64::NAN, 1.0), (0.0, 1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polite_delay_with_unvalidated_config_does_not_panic() {
        let config = Config {
            scrape_delay_min_secs: 7.0,
            scrape_delay_max_secs: 6.0,
            ..Config::default()
        };
        let scraper = PubMedScraper::new(&config);
        assert_eq!(scraper.delay_min_secs, 6.0);
        assert_eq!(scraper.delay_max_secs, 7.0);
        scraper.polite_delay().await;

        let config = Config {
            scrape_delay_min_secs: -5.0,
            scrape_delay_max_secs: -1.0,
            ..Config::default()
        };
        PubMedScraper::new(&config).polite_delay().await;
    }

    #[test]
    fn test_search_url_encodes_query() {
        let scraper = PubMedScraper::new(&Config::default());
        assert_eq!(
            scraper.search_url("vitamin D & bone", 10),
            "https://pubmed.ncbi.nlm.nih.gov/?term=vitamin%20D%20%26%20bone&size=10"
        );
    }
}
