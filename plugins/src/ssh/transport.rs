use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use encoding_rs::Encoding;
use netsentinel_core::config::SshConfig;
use netsentinel_core::error::SessionError;
use netsentinel_core::inventory::{DeviceSpec, Secret};
use netsentinel_core::session::{RemoteSession, SessionTransport};
use regex::Regex;
use tokio::process::Command;

use super::session::SshSession;

/// Compiled form of [`SshConfig`].
#[derive(Debug)]
pub struct SshOptions {
    pub ssh_bin: String,
    pub sshpass_bin: String,
    pub strict_host_key_checking: String,
    pub prompt: Regex,
    pub pager: Regex,
    pub setup_commands: Vec<String>,
    pub exit_command: String,
    pub encoding: &'static Encoding,
    pub extra_args: Vec<String>,
}

impl SshOptions {
    pub fn from_config(cfg: &SshConfig) -> anyhow::Result<Self> {
        let prompt = Regex::new(&cfg.prompt_pattern)
            .map_err(|e| anyhow::anyhow!("invalid ssh.prompt_pattern: {e}"))?;
        let pager = Regex::new(&cfg.pager_pattern)
            .map_err(|e| anyhow::anyhow!("invalid ssh.pager_pattern: {e}"))?;
        let encoding = Encoding::for_label(cfg.encoding.trim().as_bytes())
            .ok_or_else(|| anyhow::anyhow!("unknown ssh.encoding '{}'", cfg.encoding))?;

        Ok(Self {
            ssh_bin: cfg.ssh_bin.clone(),
            sshpass_bin: cfg.sshpass_bin.clone(),
            strict_host_key_checking: cfg.strict_host_key_checking.clone(),
            prompt,
            pager,
            setup_commands: cfg.setup_commands.clone(),
            exit_command: cfg.exit_command.clone(),
            encoding,
            extra_args: cfg.extra_args.clone(),
        })
    }
}

/// Opens device sessions by driving the system `ssh` client.
pub struct SshTransport {
    opts: Arc<SshOptions>,
}

impl SshTransport {
    pub fn new(opts: SshOptions) -> Self {
        Self {
            opts: Arc::new(opts),
        }
    }

    pub fn from_config(cfg: &SshConfig) -> anyhow::Result<Self> {
        Ok(Self::new(SshOptions::from_config(cfg)?))
    }

    fn command(&self, device: &DeviceSpec, password: Option<&str>) -> Command {
        let opts = &self.opts;
        let mut cmd = match password {
            Some(password) => {
                let mut cmd = Command::new(&opts.sshpass_bin);
                cmd.arg("-e").arg(&opts.ssh_bin).env("SSHPASS", password);
                cmd
            }
            None => {
                let mut cmd = Command::new(&opts.ssh_bin);
                cmd.arg("-o").arg("BatchMode=yes");
                cmd
            }
        };

        cmd.arg("-tt")
            .arg("-p")
            .arg(device.port.to_string())
            .arg("-l")
            .arg(&device.credentials.username)
            .arg("-o")
            .arg(format!(
                "StrictHostKeyChecking={}",
                opts.strict_host_key_checking
            ));
        if let Secret::KeyFile(path) = &device.credentials.secret {
            cmd.arg("-i").arg(path);
        }
        cmd.args(&opts.extra_args)
            .arg(&device.host)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SessionTransport for SshTransport {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn open(&self, device: &DeviceSpec) -> Result<Box<dyn RemoteSession>, SessionError> {
        let password = device.credentials.secret.resolve_password()?;
        let via_sshpass = password.is_some();
        let program = if via_sshpass {
            &self.opts.sshpass_bin
        } else {
            &self.opts.ssh_bin
        };

        let child = self
            .command(device, password.as_deref())
            .spawn()
            .map_err(|e| SessionError::Connection(format!("cannot start {program}: {e}")))?;
        let mut session = SshSession::attach(&device.id, child, self.opts.clone(), via_sshpass)?;

        // Login banner up to the first prompt.
        session.read_until_prompt().await?;
        for setup in &self.opts.setup_commands {
            session.send_line(setup).await?;
            session.read_until_prompt().await?;
        }

        tracing::debug!(
            target: "netsentinel.ssh",
            device = %device.id,
            host = %device.host,
            port = device.port,
            via_sshpass,
            "ssh session ready"
        );
        Ok(Box::new(session))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    const FAKE_DEVICE: &str = r#"#!/bin/sh
printf 'Info: authorised access only\r\n<fake-sw>'
while IFS= read -r line; do
  case "$line" in
    quit) exit 0 ;;
    "screen-length 0 temporary") printf '%s\r\nInfo: applied\r\n<fake-sw>' "$line" ;;
    "display version")
      printf '%s\r\nVRP (R) software, Version 8.180\r\n  ---- More ----' "$line"
      dd bs=1 count=1 >/dev/null 2>&1
      printf '\033[16D                \033[16DUptime is 12 days\r\n<fake-sw>' ;;
    *) printf '%s\r\nError: Unrecognized command\r\n<fake-sw>' "$line" ;;
  esac
done
"#;

    const FAKE_DENIED: &str = r#"#!/bin/sh
echo "admin@10.0.0.1: Permission denied (publickey,password)." >&2
exit 255
"#;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn transport(ssh_bin: String) -> SshTransport {
        let cfg = SshConfig {
            ssh_bin,
            ..SshConfig::default()
        };
        SshTransport::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn test_runs_commands_through_pager() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(script(dir.path(), "ssh", FAKE_DEVICE));
        let device = DeviceSpec::new("fake-sw", "10.0.0.1", "admin");

        let mut session = transport.open(&device).await.unwrap();
        let version = session.run("display version").await.unwrap();
        let unknown = session.run("display nothing").await.unwrap();
        session.close().await;

        assert_eq!(
            version,
            "VRP (R) software, Version 8.180\nUptime is 12 days"
        );
        assert_eq!(unknown, "Error: Unrecognized command");
    }

    #[tokio::test]
    async fn test_permission_denied_is_authentication_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(script(dir.path(), "ssh", FAKE_DENIED));
        let device = DeviceSpec::new("locked", "10.0.0.1", "admin");

        let err = transport.open(&device).await.err().unwrap();
        assert!(matches!(err, SessionError::Authentication(ref m) if m.contains("Permission denied")));
    }

    #[tokio::test]
    async fn test_missing_binary_is_connection_failure() {
        let transport = transport("/nonexistent/bin/ssh".to_string());
        let device = DeviceSpec::new("sw", "10.0.0.1", "admin");

        let err = transport.open(&device).await.err().unwrap();
        assert!(matches!(err, SessionError::Connection(_)));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let cfg = SshConfig {
            encoding: "klingon-8".to_string(),
            ..SshConfig::default()
        };
        assert!(SshOptions::from_config(&cfg).is_err());
    }
}
