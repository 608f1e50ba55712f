//! 结果表服务 - 业务能力层
//!
//! 每轮迭代追加一行并立即写回磁盘；进程中断时已写入的行保留

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{GapFinding, Score};

/// 结果表列名（顺序固定）
pub const COLUMNS: [&str; 5] = [
    "Meta_Analysis_Topic",
    "Gap_Text",
    "Score",
    "Other_Output",
    "Raw_Analysis",
];

/// 结果表
///
/// 职责：
/// - 追加单行结论（读取 → 拼接 → 整体写回）
/// - 按插入顺序读回
/// - 导出 CSV / JSON
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// 追加一行并写回磁盘，返回写入后的总行数
    pub async fn append(&self, finding: &GapFinding) -> Result<usize, StoreError> {
        let mut rows = self.rows().await?;
        rows.push(finding.clone());

        let csv_text = encode_csv(&rows).map_err(|e| StoreError::csv(self.display_path(), e))?;
        fs::write(&self.path, csv_text)
            .await
            .map_err(|e| StoreError::io(self.display_path(), e))?;

        debug!("结果表已写入 {} 行: {}", rows.len(), self.display_path());
        Ok(rows.len())
    }

    /// 按插入顺序读回所有行，文件不存在视为空表
    pub async fn rows(&self) -> Result<Vec<GapFinding>, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(self.display_path(), e)),
        };
        decode_csv(&content).map_err(|e| StoreError::csv(self.display_path(), e))
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.rows().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// 高分主题：去重、去空，保持首次出现的顺序
    pub async fn high_score_topics(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.rows().await?;
        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|row| row.score == Score::High && !row.topic.trim().is_empty())
            .filter_map(|row| seen.insert(row.topic.clone()).then_some(row.topic))
            .collect())
    }

    /// 导出为 CSV 文本
    pub async fn export_csv(&self) -> Result<String, StoreError> {
        let rows = self.rows().await?;
        encode_csv(&rows).map_err(|e| StoreError::csv(self.display_path(), e))
    }

    /// 导出为 JSON 数组（每行一个以列名为键的对象）
    pub async fn export_json(&self) -> Result<String, StoreError> {
        let rows = self.rows().await?;
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    /// 将 CSV 和 JSON 导出文件写入目录，返回两个文件路径
    pub async fn export_to_dir(&self, dir: &Path, topic: &str) -> Result<(PathBuf, PathBuf), StoreError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir.display().to_string(), e))?;

        let stem = export_file_stem(topic);
        let csv_path = dir.join(format!("{}.csv", stem));
        let json_path = dir.join(format!("{}.json", stem));

        let csv_text = self.export_csv().await?;
        fs::write(&csv_path, csv_text)
            .await
            .map_err(|e| StoreError::io(csv_path.display().to_string(), e))?;

        let json_text = self.export_json().await?;
        fs::write(&json_path, json_text)
            .await
            .map_err(|e| StoreError::io(json_path.display().to_string(), e))?;

        info!("📥 已导出: {} / {}", csv_path.display(), json_path.display());
        Ok((csv_path, json_path))
    }

    /// 删除整个结果表
    pub async fn reset(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("🗑️ 已删除结果表: {}", self.display_path());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(self.display_path(), e)),
        }
    }
}

/// 导出文件名：主题中的空格换成下划线
pub fn export_file_stem(topic: &str) -> String {
    format!("{}_pubmed_gaps", topic.trim().replace(' ', "_"))
}

/// 将行编码为带表头的 CSV
pub fn encode_csv(rows: &[GapFinding]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 解析带表头的 CSV
pub fn decode_csv(content: &str) -> Result<Vec<GapFinding>, csv::Error> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader.deserialize().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(topic: &str, score: Score) -> GapFinding {
        GapFinding {
            topic: topic.to_string(),
            gap_text: "gap, with \"quotes\"\nand a newline".to_string(),
            score,
            next_query: format!("{} next", topic),
            raw_analysis: "raw".to_string(),
        }
    }

    #[test]
    fn test_encode_csv_header_order() {
        let text = encode_csv(&[finding("a", Score::High)]).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(","));
    }

    #[test]
    fn test_encode_empty_table_has_header() {
        let text = encode_csv(&[]).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
        assert!(decode_csv(&text).unwrap().is_empty());
    }

    #[test]
    fn test_csv_preserves_special_characters() {
        let rows = vec![finding("a", Score::High), finding("b", Score::None)];
        let decoded = decode_csv(&encode_csv(&rows).unwrap()).unwrap();
        assert_eq!(decoded, rows);
    }

    #[test]
    fn test_export_file_stem() {
        assert_eq!(export_file_stem("vitamin D bone"), "vitamin_D_bone_pubmed_gaps");
    }

    #[tokio::test]
    async fn test_append_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("gaps.csv"));

        assert!(store.is_empty().await.unwrap());
        assert_eq!(store.append(&finding("first", Score::High)).await.unwrap(), 1);
        assert_eq!(store.append(&finding("second", Score::None)).await.unwrap(), 2);

        let rows = store.rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].topic, "first");
        assert_eq!(rows[1].topic, "second");
    }

    #[tokio::test]
    async fn test_high_score_topics_are_unique_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("gaps.csv"));

        for (topic, score) in [
            ("B", Score::High),
            ("A", Score::High),
            ("C", Score::None),
            ("B", Score::High),
            ("  ", Score::High),
        ] {
            store.append(&finding(topic, score)).await.unwrap();
        }

        assert_eq!(store.high_score_topics().await.unwrap(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_reset_removes_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("gaps.csv"));

        store.append(&finding("x", Score::High)).await.unwrap();
        store.reset().await.unwrap();
        assert!(!store.path().exists());
        assert!(store.rows().await.unwrap().is_empty());

        // 再次删除不报错
        store.reset().await.unwrap();
    }
}
