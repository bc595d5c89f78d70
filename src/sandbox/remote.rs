//! Remote sandbox provider over HTTPS
//!
//! Endpoints, relative to `api_url`:
//! - `POST /sandboxes` `{"template"}` -> `{"sandboxId"}`
//! - `GET /sandboxes/{id}` -> 200 if alive, 404 otherwise
//! - `POST /sandboxes/{id}/commands` `{"cmd", "timeoutMs"}` -> server-sent events
//!   `stdout` / `stderr` (data = text) and a final `exit` (data = `{"exitCode"}`)
//! - `GET|PUT /sandboxes/{id}/files?path=...` -> raw file content
//!
//! Public hosts have the form `<port>-<sandboxId>.<domain>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use super::{CommandOutput, OutputChunk, Sandbox, SandboxError, SandboxProvider};

#[derive(Debug, Clone)]
pub struct RemoteSandboxConfig {
    pub api_url: String,
    pub api_key: String,
    /// Domain used to build public hosts
    pub domain: String,
    pub request_timeout: Duration,
    pub command_timeout: Duration,
}

pub struct RemoteSandboxProvider {
    client: Client,
    /// No total timeout: command streams are bounded by `command_timeout`
    stream_client: Client,
    config: Arc<RemoteSandboxConfig>,
}

impl std::fmt::Debug for RemoteSandboxProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSandboxProvider")
            .field("api_url", &self.config.api_url)
            .field("domain", &self.config.domain)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSandbox {
    sandbox_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExitEvent {
    exit_code: i32,
}

fn authorized(builder: RequestBuilder, config: &RemoteSandboxConfig) -> RequestBuilder {
    builder.header("X-API-Key", &config.api_key)
}

async fn check(response: Response, sandbox_id: &str) -> Result<Response, SandboxError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SandboxError::NotFound(sandbox_id.to_string()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SandboxError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

impl RemoteSandboxProvider {
    pub fn new(config: RemoteSandboxConfig) -> Result<Self, SandboxError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let stream_client = Client::builder().connect_timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            stream_client,
            config: Arc::new(config),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SandboxProvider for RemoteSandboxProvider {
    async fn create(&self, template: &str) -> Result<String, SandboxError> {
        let request = self.client.post(self.url("sandboxes")).json(&json!({ "template": template }));
        let response = check(authorized(request, &self.config).send().await?, template).await?;
        let created: CreatedSandbox = response.json().await?;
        log::info!("Created remote sandbox {} from template {}", created.sandbox_id, template);
        Ok(created.sandbox_id)
    }

    async fn connect(&self, sandbox_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let request = self.client.get(self.url(&format!("sandboxes/{}", sandbox_id)));
        check(authorized(request, &self.config).send().await?, sandbox_id).await?;

        Ok(Arc::new(RemoteSandbox {
            id: sandbox_id.to_string(),
            base_url: self.url(&format!("sandboxes/{}", sandbox_id)),
            client: self.client.clone(),
            stream_client: self.stream_client.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct RemoteSandbox {
    id: String,
    base_url: String,
    client: Client,
    stream_client: Client,
    config: Arc<RemoteSandboxConfig>,
}

impl RemoteSandbox {
    async fn stream_command(
        &self,
        command: &str,
        output: Option<&mpsc::UnboundedSender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError> {
        let request = self
            .stream_client
            .post(format!("{}/commands", self.base_url))
            .json(&json!({ "cmd": command, "timeoutMs": self.config.command_timeout.as_millis() as u64 }));
        let mut events = authorized(request, &self.config)
            .eventsource()
            .map_err(|e| SandboxError::Stream(e.to_string()))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = None;

        while let Some(event) = events.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => match message.event.as_str() {
                    "stdout" => {
                        stdout.push_str(&message.data);
                        if let Some(tx) = output {
                            let _ = tx.send(OutputChunk::Stdout(message.data));
                        }
                    }
                    "stderr" => {
                        stderr.push_str(&message.data);
                        if let Some(tx) = output {
                            let _ = tx.send(OutputChunk::Stderr(message.data));
                        }
                    }
                    "exit" => {
                        let exit: ExitEvent = serde_json::from_str(&message.data)
                            .map_err(|e| SandboxError::Stream(format!("bad exit event: {}", e)))?;
                        exit_code = Some(exit.exit_code);
                        events.close();
                        break;
                    }
                    other => log::debug!("[{}] ignoring event {}", self.id, other),
                },
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, _)) if status == StatusCode::NOT_FOUND => {
                    events.close();
                    return Err(SandboxError::NotFound(self.id.clone()));
                }
                Err(e) => {
                    events.close();
                    return Err(SandboxError::Stream(e.to_string()));
                }
            }
        }

        match exit_code {
            Some(0) => Ok(CommandOutput {
                stdout,
                stderr,
                exit_code: 0,
            }),
            Some(exit_code) => Err(SandboxError::CommandExit {
                exit_code,
                stdout,
                stderr,
            }),
            None => Err(SandboxError::Stream("stream ended without exit event".to_string())),
        }
    }
}

#[async_trait]
impl Sandbox for RemoteSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(
        &self,
        command: &str,
        output: Option<&mpsc::UnboundedSender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError> {
        let budget = self.config.command_timeout;
        tokio::time::timeout(budget, self.stream_command(command, output))
            .await
            .map_err(|_| SandboxError::Timeout(budget.as_millis() as u64))?
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let request = self
            .client
            .put(format!("{}/files", self.base_url))
            .query(&[("path", path)])
            .body(content.to_string());
        check(authorized(request, &self.config).send().await?, &self.id).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        let request = self.client.get(format!("{}/files", self.base_url)).query(&[("path", path)]);
        let response = check(authorized(request, &self.config).send().await?, &self.id).await?;
        Ok(response.text().await?)
    }

    fn public_host(&self, port: u16) -> String {
        format!("{}-{}.{}", port, self.id, self.config.domain)
    }
}
