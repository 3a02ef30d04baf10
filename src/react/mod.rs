//! 认知层：Planner 与 ReAct 主循环

pub mod loop_;
pub mod planner;

pub use loop_::{react_loop, LoopLimits, ReactResult};
pub use planner::{build_system_prompt, parse_llm_output, Planner, PlannerOutput, ToolCall};
