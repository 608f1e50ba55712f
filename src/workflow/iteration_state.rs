//! 迭代状态
//!
//! 只在一次运行内有意义，由控制器独占

use std::fmt::Display;

use serde::Serialize;

/// 运行的终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminalState {
    /// 跑满最大迭代次数
    Completed,
    /// 用户请求停止
    StoppedByUser,
    /// 所有检索来源都没有结果
    StoppedNoResults,
    /// LLM 重试耗尽
    StoppedGenerationFailure,
}

impl TerminalState {
    pub fn is_normal(&self) -> bool {
        matches!(self, TerminalState::Completed)
    }
}

impl Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TerminalState::Completed => "全部迭代完成",
            TerminalState::StoppedByUser => "用户停止",
            TerminalState::StoppedNoResults => "没有检索结果",
            TerminalState::StoppedGenerationFailure => "LLM 调用失败",
        };
        f.write_str(text)
    }
}

/// 一次运行的迭代状态
#[derive(Debug, Clone)]
pub struct IterationState {
    /// 当前检索词，每轮结束后更新
    pub current_query: String,
    /// 当前迭代序号（从 1 开始，进入循环前为 0）
    pub iteration_index: usize,
    pub max_iterations: usize,
    pub running: bool,
    pub completed_normally: bool,
}

impl IterationState {
    pub fn start(topic: &str, max_iterations: usize) -> Self {
        Self {
            current_query: topic.to_string(),
            iteration_index: 0,
            max_iterations,
            running: true,
            completed_normally: false,
        }
    }

    /// 还有剩余迭代次数
    pub fn has_remaining(&self) -> bool {
        self.running && self.iteration_index < self.max_iterations
    }

    pub fn advance(&mut self) -> usize {
        self.iteration_index += 1;
        self.iteration_index
    }

    /// 进入终止状态
    pub fn finish(&mut self, terminal: TerminalState) {
        self.running = false;
        self.completed_normally = terminal.is_normal();
    }
}

impl Display for IterationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[迭代 {}/{} 检索词#{}]",
            self.iteration_index, self.max_iterations, self.current_query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_lifecycle() {
        let mut state = IterationState::start("aspirin", 2);
        assert!(state.running);
        assert_eq!(state.iteration_index, 0);

        assert_eq!(state.advance(), 1);
        assert!(state.has_remaining());
        assert_eq!(state.advance(), 2);
        assert!(!state.has_remaining());

        state.finish(TerminalState::Completed);
        assert!(!state.running);
        assert!(state.completed_normally);
    }

    #[test]
    fn test_stopped_states_are_not_normal() {
        for terminal in [
            TerminalState::StoppedByUser,
            TerminalState::StoppedNoResults,
            TerminalState::StoppedGenerationFailure,
        ] {
            let mut state = IterationState::start("q", 5);
            state.finish(terminal);
            assert!(!state.completed_normally);
            assert!(!state.has_remaining());
        }
    }
}
