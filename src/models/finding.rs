//! 单轮迭代的结构化结论

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 知识缺口评分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    High,
    None,
}

impl Score {
    pub fn as_str(&self) -> &'static str {
        match self {
            Score::High => "High",
            Score::None => "None",
        }
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一轮迭代的结论，也是结果表中的一行
///
/// 字段名即结果表列名，CSV 与 JSON 导出共用同一套序列化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFinding {
    #[serde(rename = "Meta_Analysis_Topic")]
    pub topic: String,
    #[serde(rename = "Gap_Text")]
    pub gap_text: String,
    #[serde(rename = "Score")]
    pub score: Score,
    /// 下一轮检索词，保证非空
    #[serde(rename = "Other_Output")]
    pub next_query: String,
    /// 模型原始输出
    #[serde(rename = "Raw_Analysis")]
    pub raw_analysis: String,
}

impl GapFinding {
    pub fn gap_found(&self) -> bool {
        self.score == Score::High
    }
}

/// 运行结束时展示的缺口摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapSummary {
    /// 所在迭代（从 1 开始）
    pub iteration: usize,
    pub title: String,
    pub description: String,
}
