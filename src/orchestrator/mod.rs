//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `gap_finder` - 迭代控制器
//! - 持有运行状态和停止令牌
//! - 循环调用 `IterationFlow`，决定何时终止
//! - 汇总本次运行的结论
//!
//! ### `app` - 应用入口
//! - 初始化配置和控制器
//! - 运行结束后输出统计、导出文件
//! - 清空结果表、列出高分主题
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行 + 维护命令)
//!     ↓
//! gap_finder (迭代循环与终止条件)
//!     ↓
//! workflow::IterationFlow (单轮迭代)
//!     ↓
//! services (能力层：search / llm / extractor / store)
//!     ↓
//! clients (PubMed API / 网页抓取 / LLM)
//! ```

pub mod app;
pub mod gap_finder;

pub use app::App;
pub use gap_finder::{GapFinder, RunOutcome};
