//! The task-runner seam and the command runner the daemon ships.
//!
//! A task runner owns the reasoning backend: it creates a task from a
//! user message, advances it one step at a time, exposes the steps
//! produced so far, and finalizes a textual result. The orchestrator
//! never looks inside it.

use std::collections::BTreeMap;

use async_trait::async_trait;

use envd::client::{ActionProxy, EnvClient};
use wire_types::{codec, Step, Value};

/// One run's worth of agent reasoning, advanced step by step.
///
/// `produced_steps` is append-only in occurrence order for the current
/// task; `advance` returns `true` once the last step has run.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn create_task(&mut self, message: &str) -> anyhow::Result<()>;

    async fn advance(&mut self) -> anyhow::Result<bool>;

    fn produced_steps(&self) -> &[Step];

    async fn finalize(&mut self) -> anyhow::Result<String>;

    /// Discard all internal task state.
    fn reset(&mut self);
}

enum Phase {
    Idle,
    /// A remote action call is pending.
    Pending { name: String, args: Vec<Value> },
    /// No such action; answer directly.
    Unknown { name: String },
    Done { answer: String },
}

/// Deterministic runner that maps each chat message onto one remote
/// action call: `<action-name> [arg ...]`, args parsed as JSON scalars.
///
/// It occupies the runner seam in deployments without a reasoning
/// backend and exercises the full discovery/invocation path.
pub struct CommandRunner {
    actions: Vec<ActionProxy>,
    steps: Vec<Step>,
    phase: Phase,
}

impl CommandRunner {
    pub fn new(actions: Vec<ActionProxy>) -> Self {
        Self {
            actions,
            steps: Vec::new(),
            phase: Phase::Idle,
        }
    }

    /// Discover actions from every healthy environment.
    ///
    /// An unreachable registry contributes zero actions; it never
    /// aborts startup.
    pub async fn discover(clients: &[EnvClient]) -> Self {
        let mut actions = Vec::new();
        for client in clients {
            if !client.health_check().await {
                tracing::warn!(
                    base_url = client.base_url(),
                    "Environment unhealthy; contributing no actions"
                );
                continue;
            }
            match client.action_infos().await {
                Ok(infos) => {
                    tracing::info!(
                        base_url = client.base_url(),
                        actions = infos.len(),
                        "Discovered environment actions"
                    );
                    actions.extend(infos.iter().map(|info| client.action_to_callable(info)));
                }
                Err(e) => {
                    tracing::warn!(
                        base_url = client.base_url(),
                        error = %e,
                        "Action discovery failed; contributing no actions"
                    );
                }
            }
        }
        Self::new(actions)
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(ActionProxy::name).collect()
    }

    fn parse_arg(token: &str) -> Value {
        match serde_json::from_str::<serde_json::Value>(token) {
            Ok(wire) => codec::decode(&wire).unwrap_or_else(|_| Value::Text(token.to_string())),
            Err(_) => Value::Text(token.to_string()),
        }
    }

    fn render(value: &Value) -> String {
        match codec::encode(value) {
            Ok(wire) => wire.to_string(),
            Err(_) => format!("<{}>", value.kind()),
        }
    }
}

#[async_trait]
impl TaskRunner for CommandRunner {
    async fn create_task(&mut self, message: &str) -> anyhow::Result<()> {
        self.steps.clear();
        self.steps.push(Step::user(message));

        let mut tokens = message.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let args: Vec<Value> = tokens.map(Self::parse_arg).collect();

        self.phase = if self.actions.iter().any(|a| a.name() == name) {
            Phase::Pending { name, args }
        } else {
            Phase::Unknown { name }
        };
        Ok(())
    }

    async fn advance(&mut self) -> anyhow::Result<bool> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Pending { name, args } => {
                let proxy = self
                    .actions
                    .iter()
                    .find(|a| a.name() == name)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("action '{name}' vanished"))?;

                let wire_args: Vec<serde_json::Value> = args
                    .iter()
                    .map(codec::encode)
                    .collect::<Result<_, _>>()?;
                self.steps.push(Step::tool_call(
                    name.as_str(),
                    serde_json::json!({ "args": wire_args }),
                ));

                let result = proxy.call(args, BTreeMap::new()).await?;
                let rendered = Self::render(&result);
                self.steps
                    .push(Step::tool_output(name.as_str(), rendered.clone()));

                let answer = format!("{name} -> {rendered}");
                self.steps.push(Step::assistant(answer.clone()));
                self.phase = Phase::Done { answer };
                Ok(true)
            }
            Phase::Unknown { name } => {
                let available = self.action_names().join(", ");
                let answer = if name.is_empty() {
                    format!("No action requested. Available actions: {available}")
                } else {
                    format!("No action named '{name}'. Available actions: {available}")
                };
                self.steps.push(Step::assistant(answer.clone()));
                self.phase = Phase::Done { answer };
                Ok(true)
            }
            Phase::Done { answer } => {
                self.phase = Phase::Done { answer };
                Ok(true)
            }
            Phase::Idle => anyhow::bail!("advance called without an active task"),
        }
    }

    fn produced_steps(&self) -> &[Step] {
        &self.steps
    }

    async fn finalize(&mut self) -> anyhow::Result<String> {
        match &self.phase {
            Phase::Done { answer } => Ok(answer.clone()),
            _ => anyhow::bail!("finalize called before the task completed"),
        }
    }

    fn reset(&mut self) {
        self.steps.clear();
        self.phase = Phase::Idle;
    }
}
