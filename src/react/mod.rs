//! 编排层：AGENT / TOOLS / END 回合状态机与过程事件

pub mod events;
pub mod loop_;
pub mod state;

pub use events::ReactEvent;
pub use loop_::{TurnExecutor, TurnOutcome};
pub use state::{ToolFailurePolicy, TurnState, DEFAULT_RECURSION_LIMIT};
