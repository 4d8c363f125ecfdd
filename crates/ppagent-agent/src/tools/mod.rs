//! Tool modules for the PPAgent agent.

pub mod base;
pub mod filesystem;
pub mod registry;
pub mod shell;
pub mod skill_command;

use std::path::Path;
use std::sync::Arc;

use ppagent_core::log::EventSink;

pub use base::{optional_string, require_string, require_string_allow_empty, Tool};
pub use filesystem::{ListDirTool, ReadFileTool, WriteFileTool};
pub use registry::{collect_tools, parse_arguments, ToolRegistry};
pub use shell::RunCommandTool;
pub use skill_command::{CommandTool, CommandToolSpec, ToolsManifest};

/// The built-in tool set: `read_file`, `write_file`, `list_dir`, `run_command`.
pub fn builtin_tools(
    root: &Path,
    command_timeout_secs: u64,
    sink: Arc<dyn EventSink>,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadFileTool::new(root.to_path_buf(), Arc::clone(&sink))),
        Arc::new(WriteFileTool::new(root.to_path_buf(), Arc::clone(&sink))),
        Arc::new(ListDirTool::new(root.to_path_buf(), Arc::clone(&sink))),
        Arc::new(RunCommandTool::new(root.to_path_buf(), command_timeout_secs, sink)),
    ]
}
