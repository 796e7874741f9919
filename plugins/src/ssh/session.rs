use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::Decoder;
use netsentinel_core::error::SessionError;
use netsentinel_core::session::RemoteSession;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;

use super::output::{classify_exit, clean_output, decode_chunk, inspect_tail, Tail};
use super::transport::SshOptions;

const READ_CHUNK: usize = 4096;
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// One interactive `ssh -tt` child talking to a device CLI.
pub(crate) struct SshSession {
    device_id: String,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<Vec<u8>>>,
    decoder: Decoder,
    pending: String,
    opts: Arc<SshOptions>,
    via_sshpass: bool,
}

impl SshSession {
    pub(crate) fn attach(
        device_id: &str,
        mut child: Child,
        opts: Arc<SshOptions>,
        via_sshpass: bool,
    ) -> Result<Self, SessionError> {
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(SessionError::Connection(
                "ssh process has no stdio pipes".to_string(),
            ));
        };
        let stderr = child.stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf).await;
                buf
            })
        });

        Ok(Self {
            device_id: device_id.to_string(),
            child,
            stdin,
            stdout,
            stderr,
            decoder: opts.encoding.new_decoder(),
            pending: String::new(),
            opts,
            via_sshpass,
        })
    }

    pub(crate) async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        let (bytes, _, _) = self.opts.encoding.encode(line);
        let mut payload = bytes.into_owned();
        payload.push(b'\n');
        self.send_raw(&payload).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let write = async {
            self.stdin.write_all(bytes).await?;
            self.stdin.flush().await
        };
        write
            .await
            .map_err(|e| SessionError::Connection(format!("write to ssh failed: {e}")))
    }

    /// Read until the device prompt comes back, answering pager prompts on the way.
    pub(crate) async fn read_until_prompt(&mut self) -> Result<String, SessionError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match inspect_tail(&self.pending, &self.opts.prompt, &self.opts.pager) {
                Tail::Prompt => return Ok(std::mem::take(&mut self.pending)),
                Tail::Pager(cut) => {
                    self.pending.truncate(cut);
                    self.send_raw(b" ").await?;
                }
                Tail::Pending => {}
            }

            let n = self
                .stdout
                .read(&mut chunk)
                .await
                .map_err(|e| SessionError::Connection(format!("read from ssh failed: {e}")))?;
            if n == 0 {
                return Err(self.exit_error().await);
            }
            decode_chunk(&mut self.decoder, &chunk[..n], &mut self.pending);
        }
    }

    async fn exit_error(&mut self) -> SessionError {
        let code = self.child.wait().await.ok().and_then(|status| status.code());
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let err = classify_exit(&String::from_utf8_lossy(&stderr), code, self.via_sshpass);
        tracing::debug!(
            target: "netsentinel.ssh",
            device = %self.device_id,
            exit_code = ?code,
            error = %err,
            "ssh process ended"
        );
        err
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, SessionError> {
        self.send_line(command).await?;
        let raw = self.read_until_prompt().await?;
        Ok(clean_output(&raw, command))
    }

    async fn close(&mut self) {
        let opts = self.opts.clone();
        let _ = self.send_line(&opts.exit_command).await;
        if tokio::time::timeout(EXIT_GRACE, self.child.wait())
            .await
            .is_err()
        {
            let _ = self.child.kill().await;
        }
        tracing::debug!(target: "netsentinel.ssh", device = %self.device_id, "ssh session closed");
    }
}
