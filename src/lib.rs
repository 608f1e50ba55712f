//! # Gap Finder
//!
//! 基于 PubMed 文献迭代挖掘荟萃分析知识缺口的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 只负责和外部服务通信
//! - `PubMedClient` - E-utilities 检索 + 批量获取
//! - `PubMedScraper` - 网页抓取兜底
//! - `LlmClient` - OpenAI 兼容的对话接口
//!
//! ### ② 业务能力层（Services）
//! - `SearchProvider` - 三层降级检索
//! - `LlmService` - 总结 / 缺口分析，带有限重试
//! - `ResponseExtractor` - 从模型输出中抽取结构化结论
//! - `RecordStore` - 结果表的追加、读取与导出
//!
//! ### ③ 流程层（Workflow）
//! - `IterationState` - 一次运行的迭代状态
//! - `IterationFlow` - 单轮迭代（search → summarize → analyze → extract → append）
//!
//! ### ④ 编排层（Orchestration）
//! - `GapFinder` - 迭代循环、停止控制与终止状态
//! - `App` - 应用入口，统计与导出
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GapFinding, GapSummary, LiteratureRecord, Score};
pub use orchestrator::{App, GapFinder, RunOutcome};
pub use workflow::{IterationEvent, ProgressListener, TerminalState};
