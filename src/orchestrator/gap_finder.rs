//! 迭代控制器 - 编排层
//!
//! 驱动"检索 → 总结 → 分析 → 抽取 → 写表"的循环，并负责终止条件：
//! 跑满次数、用户停止、检索为空、LLM 重试耗尽。
//!
//! 停止是协作式的：只在每轮开始时检查停止信号，不会打断进行中的网络请求。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::{AppResult, BusinessError};
use crate::models::{GapFinding, GapSummary};
use crate::services::{LlmService, RecordStore, RetryPolicy};
use crate::workflow::{
    IterationEvent, IterationFlow, IterationState, ProgressListener, StepOutcome, TerminalState,
};

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub terminal: TerminalState,
    /// 进入过的迭代数（包括因停止而未完成的那一轮）
    pub iterations_attempted: usize,
    /// 本次运行写入结果表的行数
    pub rows_written: usize,
    pub findings: Vec<GapFinding>,
    /// 发现缺口的迭代
    pub gaps: Vec<GapSummary>,
}

impl RunOutcome {
    pub fn completed_normally(&self) -> bool {
        self.terminal.is_normal()
    }
}

/// 迭代控制器
///
/// 同一时间只允许一次运行；`request_stop` 可以从任意任务调用
pub struct GapFinder {
    flow: IterationFlow,
    running: AtomicBool,
    stop: Mutex<CancellationToken>,
}

impl GapFinder {
    pub fn new(flow: IterationFlow) -> Self {
        Self {
            flow,
            running: AtomicBool::new(false),
            stop: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let llm = LlmService::new(
            Arc::new(LlmClient::new(config)),
            RetryPolicy::from_config(config),
        );
        Self::new(IterationFlow::from_config(config, llm))
    }

    pub fn store(&self) -> &RecordStore {
        self.flow.store()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 当前（或下一次）运行使用的停止令牌
    pub fn stop_token(&self) -> CancellationToken {
        self.lock_stop().clone()
    }

    /// 请求停止，在下一轮开始时生效
    pub fn request_stop(&self) {
        info!("🛑 收到停止请求，将在下一轮开始前停止");
        self.lock_stop().cancel();
    }

    /// 删除整个结果表，运行中不允许
    pub async fn reset(&self) -> AppResult<()> {
        if self.is_running() {
            return Err(BusinessError::AlreadyRunning.into());
        }
        self.store().reset().await?;
        Ok(())
    }

    /// 开始一次运行，直到进入终止状态才返回
    pub async fn begin(
        &self,
        topic: &str,
        max_iterations: usize,
        listener: &dyn ProgressListener,
    ) -> AppResult<RunOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(BusinessError::EmptyTopic.into());
        }
        if max_iterations == 0 {
            return Err(BusinessError::ZeroIterations.into());
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BusinessError::AlreadyRunning.into());
        }

        let _guard = RunGuard { finder: self };
        let token = self.stop_token();
        self.run_loop(topic, max_iterations, &token, listener).await
    }

    async fn run_loop(
        &self,
        topic: &str,
        max_iterations: usize,
        token: &CancellationToken,
        listener: &dyn ProgressListener,
    ) -> AppResult<RunOutcome> {
        let mut state = IterationState::start(topic, max_iterations);
        let mut findings = Vec::new();
        let mut gaps = Vec::new();
        let mut terminal = TerminalState::Completed;

        while state.has_remaining() {
            let iteration = state.advance();

            if token.is_cancelled() {
                warn!("{} 用户已停止", state);
                terminal = TerminalState::StoppedByUser;
                break;
            }

            listener.on_event(&IterationEvent::IterationStarted {
                iteration,
                max_iterations,
                query: state.current_query.clone(),
            });

            match self.flow.run(&state, listener).await? {
                StepOutcome::Recorded { finding, .. } => {
                    if finding.gap_found() {
                        gaps.push(GapSummary {
                            iteration,
                            title: finding.topic.clone(),
                            description: finding.gap_text.clone(),
                        });
                    }
                    state.current_query = finding.next_query.clone();
                    findings.push(finding);
                }
                StepOutcome::NoResults => {
                    warn!("{} ⚠️ 没有检索到任何文献，停止运行", state);
                    terminal = TerminalState::StoppedNoResults;
                    break;
                }
                StepOutcome::GenerationFailed { .. } => {
                    terminal = TerminalState::StoppedGenerationFailure;
                    break;
                }
            }
        }

        state.finish(terminal);

        let rows_written = findings.len();
        listener.on_event(&IterationEvent::RunFinished {
            terminal,
            rows_written,
        });

        Ok(RunOutcome {
            terminal,
            iterations_attempted: state.iteration_index,
            rows_written,
            findings,
            gaps,
        })
    }

    fn lock_stop(&self) -> MutexGuard<'_, CancellationToken> {
        self.stop.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 运行结束时（包括出错返回）清除运行标记并换上新的停止令牌
struct RunGuard<'a> {
    finder: &'a GapFinder,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.finder.lock_stop() = CancellationToken::new();
        self.finder.running.store(false, Ordering::SeqCst);
    }
}
