//! Local sandbox provider
//!
//! Each sandbox is a directory under `base_dir`. Commands run through
//! `bash -c` inside that directory; file paths are confined to it.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::{CommandOutput, OutputChunk, Sandbox, SandboxError, SandboxProvider};
use crate::id::generate_sandbox_id;

pub struct LocalSandboxProvider {
    base_dir: PathBuf,
    templates_dir: Option<PathBuf>,
    command_timeout: Duration,
}

impl LocalSandboxProvider {
    pub fn new(base_dir: impl Into<PathBuf>, command_timeout: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            templates_dir: None,
            command_timeout,
        }
    }

    /// Seed new sandboxes from `<templates_dir>/<template>` when that directory exists
    pub fn with_templates_dir(mut self, templates_dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(templates_dir.into());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn is_valid_sandbox_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl SandboxProvider for LocalSandboxProvider {
    async fn create(&self, template: &str) -> Result<String, SandboxError> {
        let id = generate_sandbox_id();
        let root = self.base_dir.join(&id);

        match self.templates_dir.as_ref().map(|d| d.join(template)) {
            Some(template_dir) if template_dir.is_dir() => copy_dir_all(&template_dir, &root)?,
            _ => fs::create_dir_all(&root)?,
        }

        log::info!("Created local sandbox {} from template {}", id, template);
        Ok(id)
    }

    async fn connect(&self, sandbox_id: &str) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let root = self.base_dir.join(sandbox_id);
        if !is_valid_sandbox_id(sandbox_id) || !root.is_dir() {
            return Err(SandboxError::NotFound(sandbox_id.to_string()));
        }

        Ok(Arc::new(LocalSandbox {
            id: sandbox_id.to_string(),
            root,
            command_timeout: self.command_timeout,
        }))
    }
}

pub struct LocalSandbox {
    id: String,
    root: PathBuf,
    command_timeout: Duration,
}

impl LocalSandbox {
    fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.as_os_str().is_empty() || !confined {
            return Err(SandboxError::PathEscape(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Read `reader` line by line, forwarding each line and returning everything read
async fn pump<R>(
    reader: R,
    output: Option<mpsc::UnboundedSender<OutputChunk>>,
    wrap: fn(String) -> OutputChunk,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    while let Some(line) = lines.next_line().await? {
        let line = format!("{}\n", line);
        collected.push_str(&line);
        if let Some(tx) = &output {
            // Receiver may be gone; output is still collected
            let _ = tx.send(wrap(line));
        }
    }
    Ok(collected)
}

#[async_trait]
impl Sandbox for LocalSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(
        &self,
        command: &str,
        output: Option<&mpsc::UnboundedSender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError> {
        log::debug!("[{}] exec: {}", self.id, command);

        let mut child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Stream("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SandboxError::Stream("stderr not captured".to_string()))?;

        let run = async {
            tokio::try_join!(
                pump(stdout, output.cloned(), OutputChunk::Stdout),
                pump(stderr, output.cloned(), OutputChunk::Stderr),
                child.wait(),
            )
        };
        let result = tokio::time::timeout(self.command_timeout, run).await;

        let (stdout, stderr, status) = match result {
            Ok(joined) => joined?,
            Err(_) => {
                let _ = child.start_kill();
                return Err(SandboxError::Timeout(self.command_timeout.as_millis() as u64));
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            return Err(SandboxError::CommandExit {
                exit_code,
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), SandboxError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, SandboxError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(&target).await?)
    }

    fn public_host(&self, port: u16) -> String {
        format!("localhost:{}", port)
    }
}
