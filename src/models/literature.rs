//! 文献记录

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 一篇检索到的文献
///
/// 只由检索层构造，下游只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteratureRecord {
    /// 标题
    pub title: String,
    /// 摘要，缺失时为占位文本
    pub snippet: String,
    /// 文献链接
    pub link: String,
    /// 来源相关的引用标识（如 `PMID: 12345678`）
    pub identifier: String,
}

impl LiteratureRecord {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
            identifier: identifier.into(),
        }
    }
}

impl Display for LiteratureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.title, self.identifier)
    }
}
