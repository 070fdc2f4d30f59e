//! Client-side helper: subscribe to a daemon's step stream and
//! optionally start a run over the same session.
//!
//! Steps arrive over the WebSocket while the `/chat` request is still
//! in flight; the final answer resolves once the stream has closed.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use wire_types::Step;

use crate::callbacks::StepCallback;

/// Connect to `/ws/steps`, feed each received step to the callbacks,
/// and return the final chat answer if a `message` was posted.
pub async fn stream_steps(
    base_url: &str,
    message: Option<&str>,
    callbacks: &[Arc<dyn StepCallback>],
) -> anyhow::Result<Option<String>> {
    let base_url = base_url.trim_end_matches('/');
    let ws_url = format!("{}/ws/steps", base_url.replacen("http", "ws", 1));

    let (ws, _) = connect_async(ws_url.as_str()).await?;
    let (_write, mut read) = ws.split();

    // Start the run only after the subscription is established, so no
    // step can slip past the observer.
    let chat = message.map(|message| {
        let url = format!("{base_url}/chat");
        let message = message.to_string();
        tokio::spawn(async move {
            reqwest::Client::new()
                .post(url)
                .query(&[("message", message)])
                .send()
                .await
        })
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<Step>(&text) {
                Ok(step) => {
                    for callback in callbacks {
                        callback.on_step(&step);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Unparseable step frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Step stream closed abruptly");
                break;
            }
        }
    }

    match chat {
        Some(task) => {
            let response = task.await??;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                anyhow::bail!("chat failed with {status}: {body}");
            }
            Ok(Some(body))
        }
        None => Ok(None),
    }
}
