//! Process-wide table of registered actions and constants.
//!
//! Registration happens at startup behind `&mut`; the registry is then
//! wrapped in an `Arc` and served. The table is append-only after that
//! point, so request handlers read it without locking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use wire_types::{ActionArgs, ActionId, ActionInfo, ActionResult, Const, Value};

/// Boxed action implementation: positional values in, one value out.
pub type ActionFn =
    Arc<dyn Fn(Vec<Value>, BTreeMap<String, Value>) -> anyhow::Result<Value> + Send + Sync>;

/// Metadata the caller supplies at registration time.
///
/// There is no reflection here: name, description, and signature are
/// explicit inputs rather than something derived from the function.
#[derive(Debug, Clone)]
pub struct ActionDef {
    pub name: String,
    pub description: String,
    pub signature: String,
}

impl ActionDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            signature: signature.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Identifier not registered. Client/server boundary error, always
    /// surfaced to the caller, never retried.
    #[error("unknown action id: {0}")]
    UnknownAction(ActionId),
    /// Names are the human/agent-facing lookup key and must be unique
    /// per registry.
    #[error("action name already registered: {0}")]
    DuplicateName(String),
    /// The action's own implementation failed. Surfaced verbatim,
    /// never retried or swallowed.
    #[error("action execution failed: {0}")]
    ExecutionFailed(String),
}

struct RegisteredAction {
    info: ActionInfo,
    func: ActionFn,
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, RegisteredAction>,
    name_index: HashMap<String, ActionId>,
    // Insertion order is the advertised order, so ids live in a Vec too.
    ordered_ids: Vec<ActionId>,
    consts: Vec<Const>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action implementation under a fresh identifier.
    ///
    /// Identifiers are minted per registration and never overwritten.
    pub fn register_action<F>(&mut self, def: ActionDef, func: F) -> Result<ActionId, RegistryError>
    where
        F: Fn(Vec<Value>, BTreeMap<String, Value>) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        if self.name_index.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }

        let action_id = ActionId::new();
        let info = ActionInfo {
            action_id: action_id.clone(),
            name: def.name.clone(),
            description: def.description,
            signature: def.signature,
        };

        tracing::info!(name = %def.name, action_id = %action_id, "Registered action");

        self.name_index.insert(def.name, action_id.clone());
        self.ordered_ids.push(action_id.clone());
        self.actions.insert(
            action_id.clone(),
            RegisteredAction {
                info,
                func: Arc::new(func),
            },
        );

        Ok(action_id)
    }

    /// Append a constant. Constants are append-only and read-only for
    /// the process lifetime.
    pub fn register_const(
        &mut self,
        name: impl Into<String>,
        value: Value,
        description: impl Into<String>,
    ) {
        let name = name.into();
        tracing::info!(name = %name, kind = value.kind(), "Registered constant");
        self.consts.push(Const {
            name,
            value,
            description: description.into(),
        });
    }

    pub fn consts(&self) -> &[Const] {
        &self.consts
    }

    pub fn action_ids(&self) -> Vec<ActionId> {
        self.ordered_ids.clone()
    }

    pub fn action_info(&self, action_id: &ActionId) -> Result<&ActionInfo, RegistryError> {
        self.actions
            .get(action_id)
            .map(|a| &a.info)
            .ok_or_else(|| RegistryError::UnknownAction(action_id.clone()))
    }

    /// Invoke a registered action synchronously.
    ///
    /// Arguments have already passed through the codec at the serde
    /// boundary; the result passes back through it the same way.
    pub fn invoke(
        &self,
        action_id: &ActionId,
        args: ActionArgs,
    ) -> Result<ActionResult, RegistryError> {
        let action = self
            .actions
            .get(action_id)
            .ok_or_else(|| RegistryError::UnknownAction(action_id.clone()))?;

        tracing::debug!(name = %action.info.name, action_id = %action_id, "Invoking action");

        let result = (action.func)(args.args, args.kwargs)
            .map_err(|e| RegistryError::ExecutionFailed(e.to_string()))?;

        Ok(ActionResult { result })
    }
}
