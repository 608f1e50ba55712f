//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：输出启动信息、创建迭代控制器
//! 2. **运行**：驱动一次完整的迭代，结束后输出统计并导出
//! 3. **维护**：导出、清空结果表、列出高分主题
//!
//! 不处理单轮迭代的细节，全部委托给 `GapFinder`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::gap_finder::{GapFinder, RunOutcome};
use crate::utils::logging::{log_gaps, log_run_start, log_startup, print_final_stats};
use crate::workflow::LogListener;

/// 应用主结构
pub struct App {
    config: Config,
    finder: Arc<GapFinder>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;
        log_startup(&config);

        let finder = Arc::new(GapFinder::from_config(&config));
        Ok(Self { config, finder })
    }

    /// 使用外部构造的控制器（测试或自定义来源）
    pub fn with_finder(config: Config, finder: GapFinder) -> Self {
        Self {
            config,
            finder: Arc::new(finder),
        }
    }

    /// 控制器句柄，可在其他任务中调用 `request_stop`
    pub fn finder(&self) -> Arc<GapFinder> {
        Arc::clone(&self.finder)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 运行一次完整的迭代，结束后写出导出文件
    pub async fn run(&self, topic: &str, max_iterations: usize) -> Result<RunOutcome> {
        log_run_start(topic, max_iterations);

        let listener = LogListener::new(self.config.verbose_logging);
        let outcome = self
            .finder
            .begin(topic, max_iterations, &listener)
            .await
            .context("迭代运行失败")?;

        log_gaps(&outcome.gaps);

        let total_rows = self.finder.store().len().await?;
        print_final_stats(&outcome, total_rows, &self.config.csv_path);

        if total_rows > 0 {
            self.export(topic).await?;
        } else {
            warn!("⚠️ 结果表为空，跳过导出");
        }

        Ok(outcome)
    }

    /// 导出 CSV 和 JSON 到配置的导出目录
    pub async fn export(&self, topic: &str) -> Result<(PathBuf, PathBuf)> {
        let dir = Path::new(&self.config.export_dir);
        let paths = self
            .finder
            .store()
            .export_to_dir(dir, topic)
            .await
            .with_context(|| format!("导出到 {} 失败", dir.display()))?;
        Ok(paths)
    }

    /// 删除结果表
    pub async fn reset(&self) -> Result<()> {
        self.finder.reset().await.context("清空结果表失败")?;
        info!("✓ 结果表已清空");
        Ok(())
    }

    /// 所有高分主题（去重，按首次出现顺序）
    pub async fn topics(&self) -> Result<Vec<String>> {
        let topics = self.finder.store().high_score_topics().await?;
        if topics.is_empty() {
            info!("暂无高分主题");
        } else {
            info!("🏆 高分荟萃分析主题 ({} 个):", topics.len());
            for (i, topic) in topics.iter().enumerate() {
                info!("  {}. {}", i + 1, topic);
            }
        }
        Ok(topics)
    }
}
