//! Local step callbacks, invoked synchronously in registration order
//! as each step is produced.

use wire_types::{Role, Step, StepMeta};

pub trait StepCallback: Send + Sync {
    fn on_step(&self, step: &Step);
}

/// Logs each step through tracing: plain messages, tool calls with
/// their arguments, and tool outputs under the tool's name.
pub struct LoggingCallback;

impl StepCallback for LoggingCallback {
    fn on_step(&self, step: &Step) {
        match (&step.meta, step.role) {
            (Some(StepMeta::ToolCall { name, arguments }), _) => {
                tracing::info!(tool = %name, args = %arguments, "assistant tool call");
            }
            (Some(StepMeta::ToolOutput { name }), _) => {
                tracing::info!(
                    tool = %name,
                    output = step.content.as_deref().unwrap_or(""),
                    "tool output"
                );
            }
            (None, role) => {
                if let Some(content) = &step.content {
                    match role {
                        Role::User => tracing::info!("user: {content}"),
                        Role::Assistant => tracing::info!("assistant: {content}"),
                        Role::System => tracing::info!("system: {content}"),
                        Role::Tool => tracing::info!("tool: {content}"),
                    }
                }
            }
        }
    }
}
