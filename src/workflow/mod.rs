pub mod iteration_flow;
pub mod iteration_state;
pub mod progress;

pub use iteration_flow::{GenerationStage, IterationFlow, StepOutcome};
pub use iteration_state::{IterationState, TerminalState};
pub use progress::{IterationEvent, LogListener, NoopListener, ProgressListener};
