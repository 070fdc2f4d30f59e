//! Discovery and invocation client for a remote action registry.
//!
//! Descriptors and constants are immutable for a registry process's
//! lifetime, so they are fetched once and cached. Connectivity
//! failures surface distinctly from application-level errors; the
//! health check never throws.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use wire_types::{ActionArgs, ActionId, ActionInfo, ActionResult, Const, Value};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The registry itself was unreachable.
    #[error("environment unreachable: {0}")]
    Connectivity(#[from] reqwest::Error),
    /// The registry answered with an error status.
    #[error("environment returned {status}: {message}")]
    Remote { status: u16, message: String },
    /// The registry answered with a body we could not interpret.
    #[error("invalid environment response: {0}")]
    Decode(String),
    /// No registered action carries this name.
    #[error("no action named '{0}'")]
    UnknownName(String),
}

#[derive(Clone)]
pub struct EnvClient {
    base_url: String,
    http: reqwest::Client,
    cached_ids: Arc<OnceCell<Vec<ActionId>>>,
    cached_infos: Arc<OnceCell<Vec<ActionInfo>>>,
    cached_consts: Arc<OnceCell<Vec<Const>>>,
}

impl EnvClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
            cached_ids: Arc::new(OnceCell::new()),
            cached_infos: Arc::new(OnceCell::new()),
            cached_consts: Arc::new(OnceCell::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Best-effort liveness probe. Unreachable or non-2xx means
    /// unhealthy; this never returns an error.
    pub async fn health_check(&self) -> bool {
        match self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(base_url = %self.base_url, error = %e, "Health check failed");
                false
            }
        }
    }

    pub async fn consts(&self) -> Result<Vec<Const>, ClientError> {
        let consts = self
            .cached_consts
            .get_or_try_init(|| self.get_json::<Vec<Const>>("/consts", &[]))
            .await?;
        Ok(consts.clone())
    }

    pub async fn action_ids(&self) -> Result<Vec<ActionId>, ClientError> {
        let ids = self
            .cached_ids
            .get_or_try_init(|| self.get_json::<Vec<ActionId>>("/action/ids", &[]))
            .await?;
        Ok(ids.clone())
    }

    /// All action descriptors, fetched id-by-id once and cached for the
    /// lifetime of this client.
    pub async fn action_infos(&self) -> Result<Vec<ActionInfo>, ClientError> {
        let infos = self
            .cached_infos
            .get_or_try_init(|| async {
                let ids = self.action_ids().await?;
                let mut infos = Vec::with_capacity(ids.len());
                for id in ids {
                    let info: ActionInfo = self
                        .get_json("/action/info", &[("action_id", id.as_str())])
                        .await?;
                    infos.push(info);
                }
                Ok::<_, ClientError>(infos)
            })
            .await?;
        Ok(infos.clone())
    }

    pub async fn action_info_from_name(&self, name: &str) -> Result<ActionInfo, ClientError> {
        self.action_infos()
            .await?
            .into_iter()
            .find(|info| info.name == name)
            .ok_or_else(|| ClientError::UnknownName(name.to_string()))
    }

    /// Invoke a remote action with positional and keyword arguments.
    pub async fn take_action(
        &self,
        info: &ActionInfo,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        let body = ActionArgs { args, kwargs };
        let response = self
            .http
            .post(format!("{}/action/take", self.base_url))
            .query(&[("action_id", info.action_id.as_str())])
            .json(&body)
            .send()
            .await?;
        let result: ActionResult = Self::parse(response).await?;
        Ok(result.result)
    }

    /// Turn a descriptor into a locally callable proxy.
    pub fn action_to_callable(&self, info: &ActionInfo) -> ActionProxy {
        ActionProxy {
            client: self.clone(),
            info: info.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// A locally callable handle to one remote action.
///
/// Preserves the descriptor's declared name and signature so callers
/// can expose the proxy as an agent-facing tool.
#[derive(Clone)]
pub struct ActionProxy {
    client: EnvClient,
    info: ActionInfo,
}

impl ActionProxy {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn description(&self) -> &str {
        &self.info.description
    }

    pub fn signature(&self) -> &str {
        &self.info.signature
    }

    pub fn info(&self) -> &ActionInfo {
        &self.info
    }

    pub async fn call(
        &self,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Value, ClientError> {
        self.client.take_action(&self.info, args, kwargs).await
    }
}
