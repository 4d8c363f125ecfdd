//! PPAgent Agent: turn loop, tools, skills, and prompt context.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry/dispatch, and built-in tools (filesystem, shell)
//! - **skills**: discovery of skill directories and their command-backed tools
//! - **rules**: project rules injected into the system prompt
//! - **context**: system prompt and tool set assembly
//! - **agent_loop**: the model ↔ tool-calling turn loop

pub mod agent_loop;
pub mod context;
pub mod rules;
pub mod skills;
pub mod tools;

pub use agent_loop::{run_agent, AgentOptions, AgentOutcome};
pub use context::{ContextBuilder, BASE_SYSTEM_PROMPT};
pub use skills::{LoadedSkill, SkillMeta, SkillsLoader};
pub use tools::{builtin_tools, Tool, ToolRegistry};
