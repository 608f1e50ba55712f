//! 结构化字段抽取 - 业务能力层
//!
//! 从模型的自由文本中按固定顺序的标签规则抽取主题、缺口描述和下一轮检索词。
//! 抽取是全函数：任何输入都返回合法的 `GapFinding`，匹配不到时使用默认值。

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{GapFinding, Score};

/// 出现任意一个即认为发现了知识缺口
pub const GAP_KEYWORDS: &[&str] = &[
    "knowledge gap",
    "gap identified",
    "research gap",
    "unresolved question",
    "contradiction",
    "inconsistency",
    "lack of studies",
    "limited research",
];

/// 发现缺口但没有描述时的占位文本
pub const GAP_NOT_DESCRIBED: &str =
    "Knowledge gap identified in PubMed sources but not clearly described.";

/// 未发现缺口且没有给出检索词时追加到当前检索词后的后缀
pub const QUERY_SUFFIX: &str = "meta-analysis";

/// 标签文本被视为"没有缺口"的前缀
const NO_GAP_PREFIXES: &[&str] = &[
    "no significant gap",
    "no clear gap",
    "no major gap",
    "no gap",
    "no knowledge gap",
    "no research gap",
    "none",
    "n/a",
    "not applicable",
];

// 标签按优先级排列，顺序本身就是行为的一部分
const TITLE_LABELS: &[&str] = &[r"meta-?analysis[ \t]*title", r"title", r"proposed[ \t]*title"];
const GAP_LABELS: &[&str] = &[r"gap", r"knowledge[ \t]*gap", r"research[ \t]*gap"];
const QUERY_LABELS: &[&str] = &[
    r"refined[ \t]*(?:pubmed[ \t]*)?query",
    r"next[ \t]*(?:pubmed[ \t]*)?query",
    r"search[ \t]*(?:pubmed[ \t]*)?query",
    r"suggested[ \t]*(?:pubmed[ \t]*)?query",
];

/// 抽取目标字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Topic,
    GapText,
    NextQuery,
}

/// 一条抽取规则
struct ExtractionRule {
    regex: Regex,
    field: Field,
    /// 是否跨行捕获（直到下一个标签或文本末尾）
    multiline: bool,
}

/// 标签后允许出现 Markdown 加粗，例如 `**Gap:**` 或 `**Gap**:`
fn label_pattern(label: &str) -> String {
    format!(r"\b{label}[ \t]*\**[ \t]*:[ \t]*\**")
}

fn build_rules(labels: &[&str], field: Field, multiline: bool) -> Vec<ExtractionRule> {
    labels
        .iter()
        .map(|label| ExtractionRule {
            regex: Regex::new(&format!("(?i){}", label_pattern(label)))
                .expect("Invalid extraction label regex pattern"),
            field,
            multiline,
        })
        .collect()
}

static TITLE_RULES: LazyLock<Vec<ExtractionRule>> =
    LazyLock::new(|| build_rules(TITLE_LABELS, Field::Topic, false));

static GAP_RULES: LazyLock<Vec<ExtractionRule>> =
    LazyLock::new(|| build_rules(GAP_LABELS, Field::GapText, true));

static QUERY_RULES: LazyLock<Vec<ExtractionRule>> =
    LazyLock::new(|| build_rules(QUERY_LABELS, Field::NextQuery, true));

/// 任意一个已知标签，用来确定捕获的结束位置
static LABEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<&str> = TITLE_LABELS
        .iter()
        .chain(GAP_LABELS)
        .chain(QUERY_LABELS)
        .copied()
        .collect();
    Regex::new(&format!("(?i){}", label_pattern(&format!("(?:{})", alternatives.join("|")))))
        .expect("Invalid label boundary regex pattern")
});

/// 响应抽取器
///
/// 无状态：同样的输入总是得到同样的结果
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 从缺口分析文本中抽取结构化结论
    pub fn extract(&self, analysis_text: &str, current_query: &str) -> GapFinding {
        let lower = analysis_text.to_lowercase();
        let keyword_hit = GAP_KEYWORDS.iter().any(|k| lower.contains(k));

        let labelled_gap = first_capture(&GAP_RULES, analysis_text);
        let gap_found = keyword_hit
            || labelled_gap
                .as_deref()
                .is_some_and(|text| !is_no_gap_statement(text));

        let topic = if gap_found {
            first_capture(&TITLE_RULES, analysis_text)
        } else {
            None
        };

        let gap_text = if gap_found {
            labelled_gap.unwrap_or_else(|| GAP_NOT_DESCRIBED.to_string())
        } else {
            String::new()
        };

        let next_query = first_capture(&QUERY_RULES, analysis_text)
            .unwrap_or_else(|| fallback_query(current_query, gap_found));

        GapFinding {
            topic: topic.unwrap_or_else(|| current_query.to_string()),
            gap_text,
            score: if gap_found { Score::High } else { Score::None },
            next_query,
            raw_analysis: analysis_text.to_string(),
        }
    }
}

/// 按规则顺序尝试，第一个得到非空值的规则胜出
fn first_capture(rules: &[ExtractionRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| capture(rule, text))
}

fn capture(rule: &ExtractionRule, text: &str) -> Option<String> {
    let label = rule.regex.find(text)?;
    let rest = text[label.end()..].trim_start();

    let end = LABEL_BOUNDARY.find(rest).map_or(rest.len(), |m| m.start());
    let mut value = &rest[..end];
    if !rule.multiline {
        if let Some(newline) = value.find('\n') {
            value = &value[..newline];
        }
    }

    let cleaned = clean_value(value, rule.field);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// 去掉捕获值两端的列表符号、Markdown 标记和引号
fn clean_value(value: &str, field: Field) -> String {
    let is_decoration = |c: char| c.is_whitespace() || "-*•#\"'`[]".contains(c);
    let trimmed = value.trim_matches(is_decoration);

    match field {
        Field::GapText => trimmed.to_string(),
        Field::Topic | Field::NextQuery => trimmed
            .trim_end_matches('.')
            .trim_matches(is_decoration)
            .to_string(),
    }
}

/// 前缀必须是完整的词，"Nonetheless" 不算 "none"
fn is_no_gap_statement(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    NO_GAP_PREFIXES.iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .map(|rest| rest.strip_prefix('s').unwrap_or(rest))
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
    })
}

/// 没有显式检索词时的下一轮检索词
///
/// 有缺口时继续深挖同一方向；没有缺口时追加后缀收窄到荟萃分析
fn fallback_query(current_query: &str, gap_found: bool) -> String {
    let current = current_query.trim();
    let query = if gap_found {
        current.to_string()
    } else {
        format!("{} {}", current, QUERY_SUFFIX).trim().to_string()
    };

    if query.is_empty() {
        QUERY_SUFFIX.to_string()
    } else {
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str, query: &str) -> GapFinding {
        ResponseExtractor::new().extract(text, query)
    }

    #[test]
    fn test_inline_labels_are_split_at_next_label() {
        let finding = extract(
            "Gap: limited long-term data. Title: Long-term Outcomes Meta-analysis. Refined Query: long-term outcomes follow-up",
            "outcomes",
        );

        assert!(finding.gap_found());
        assert_eq!(finding.score, Score::High);
        assert_eq!(finding.topic, "Long-term Outcomes Meta-analysis");
        assert_eq!(finding.gap_text, "limited long-term data.");
        assert_eq!(finding.next_query, "long-term outcomes follow-up");
    }

    #[test]
    fn test_no_gap_appends_suffix() {
        let finding = extract("No significant gap found in the literature.", "vitamin D");

        assert!(!finding.gap_found());
        assert_eq!(finding.score, Score::None);
        assert_eq!(finding.next_query, "vitamin D meta-analysis");
        assert_eq!(finding.topic, "vitamin D");
        assert_eq!(finding.gap_text, "");
    }

    #[test]
    fn test_structured_markdown_response() {
        let text = "- **Gap:** Few trials examined adolescents.\n  Most evidence comes from adults.\n\
                    - **Meta-analysis Title:** Vitamin D in Adolescents: A Meta-analysis\n\
                    - **Refined PubMed Query:** \"vitamin D adolescents randomized\"";
        let finding = extract(text, "vitamin D");

        assert_eq!(finding.score, Score::High);
        assert_eq!(
            finding.gap_text,
            "Few trials examined adolescents.\n  Most evidence comes from adults."
        );
        assert_eq!(finding.topic, "Vitamin D in Adolescents: A Meta-analysis");
        assert_eq!(finding.next_query, "vitamin D adolescents randomized");
    }

    #[test]
    fn test_keyword_without_labels_uses_defaults() {
        let finding = extract(
            "There is a clear research gap regarding dosing in older adults.",
            "vitamin D dosing",
        );

        assert_eq!(finding.score, Score::High);
        assert_eq!(finding.gap_text, GAP_NOT_DESCRIBED);
        assert_eq!(finding.topic, "vitamin D dosing");
        // 有缺口时沿用原检索词继续深挖
        assert_eq!(finding.next_query, "vitamin D dosing");
    }

    #[test]
    fn test_negated_gap_label_is_not_a_gap() {
        let text = "Gap: No significant gap in PubMed\nMeta-analysis Title: N/A\nRefined PubMed Query: vitamin D dosing";
        let finding = extract(text, "vitamin D");

        assert_eq!(finding.score, Score::None);
        assert_eq!(finding.topic, "vitamin D");
        assert_eq!(finding.gap_text, "");
        assert_eq!(finding.next_query, "vitamin D dosing");
    }

    #[test]
    fn test_nonetheless_gap_is_a_gap() {
        let text = "Gap: Nonetheless, few trials follow patients beyond two years.\n\
                    Meta-analysis Title: Long-term Follow-up\n\
                    Refined PubMed Query: long-term follow-up";
        let finding = extract(text, "q");

        assert_eq!(finding.score, Score::High);
        assert_eq!(finding.topic, "Long-term Follow-up");
        assert_eq!(
            finding.gap_text,
            "Nonetheless, few trials follow patients beyond two years."
        );
        assert_eq!(finding.next_query, "long-term follow-up");
    }

    #[test]
    fn test_no_gap_prefix_matches_whole_words() {
        assert!(is_no_gap_statement("None"));
        assert!(is_no_gap_statement("none identified."));
        assert!(is_no_gap_statement("N/A"));
        assert!(is_no_gap_statement("No gaps found in these trials"));
        assert!(is_no_gap_statement("No significant gap in PubMed"));
        assert!(!is_no_gap_statement("Nonetheless, dosing is unclear"));
        assert!(!is_no_gap_statement("Noneffective comparators dominate"));
        assert!(!is_no_gap_statement("Nobody has pooled adolescent trials"));
    }

    #[test]
    fn test_title_rule_priority_beats_position() {
        let text = "A knowledge gap exists.\nTitle: Generic Title\nMeta-analysis title: Specific Title";
        let finding = extract(text, "q");
        assert_eq!(finding.topic, "Specific Title");
    }

    #[test]
    fn test_query_rule_priority() {
        let text = "Next query: second choice\nRefined query: first choice";
        let finding = extract(text, "q");
        assert_eq!(finding.next_query, "first choice");
    }

    #[test]
    fn test_title_capture_stops_at_line_end() {
        let text = "Research gap: unclear dosing\nProposed Title: Dosing Meta-analysis\nsome trailing commentary";
        let finding = extract(text, "q");
        assert_eq!(finding.topic, "Dosing Meta-analysis");
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let text = "GAP: x\nTITLE: Upper Case Title\nSUGGESTED QUERY: upper query";
        let finding = extract(text, "q");
        assert_eq!(finding.topic, "Upper Case Title");
        assert_eq!(finding.next_query, "upper query");
    }

    #[test]
    fn test_empty_input_is_total() {
        let finding = extract("", "aspirin");
        assert_eq!(finding.score, Score::None);
        assert_eq!(finding.next_query, "aspirin meta-analysis");

        let finding = extract("", "");
        assert!(!finding.next_query.is_empty());

        let finding = extract("contradiction", "   ");
        assert!(!finding.next_query.is_empty());
    }

    #[test]
    fn test_empty_label_value_falls_through() {
        let text = "Refined query:\nNext query: real query";
        let finding = extract(text, "q");
        assert_eq!(finding.next_query, "real query");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "Knowledge gap: inconsistent endpoints.\nTitle: Endpoint Harmonization\nSearch query: endpoints";
        let first = extract(text, "endpoints");
        let second = extract(text, "endpoints");
        assert_eq!(first, second);
        assert_eq!(first.raw_analysis, text);
    }
}
