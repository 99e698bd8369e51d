//! Docker CLI adapter
//!
//! Implements [`ProcessHandle`] by invoking the `docker` binary and parsing
//! its templated output.

use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ExecOutput, ProcessHandle, RuntimeError};
use crate::models::{LaunchSpec, ProcessState, ProcessSummary, RunState};

/// Go template for `docker ps`, tab separated
const LIST_FORMAT: &str = "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.State}}\t{{.Status}}\t{{.Ports}}";

/// Docker-backed process handle
#[derive(Clone, Debug)]
pub struct DockerRuntime {
    binary: String,
    /// How long to watch a freshly launched client for an immediate exit
    launch_grace: Duration,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            launch_grace: Duration::from_secs(2),
        }
    }
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different runtime binary (e.g. `podman`)
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: &[String]) -> Result<Output, RuntimeError> {
        debug!("Running {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RuntimeError::Unavailable(format!("{}: {e}", self.binary)))
    }

    async fn run_checked(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = self.run(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::command_failed(
                format!("{} {}", self.binary, args.first().map(String::as_str).unwrap_or("")),
                stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Arguments for `docker run` derived from a launch spec
    fn build_run_args(spec: &LaunchSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-i".to_string(),
            "--sig-proxy=false".to_string(),
            "--name".to_string(),
            spec.name.clone(),
        ];

        for port in &spec.ports {
            args.push("-p".to_string());
            args.push(port.to_arg());
        }

        for mount in &spec.mounts {
            args.push("-v".to_string());
            args.push(mount.to_arg());
        }

        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        args.push(spec.image.clone());
        args
    }

    /// Parse tab-separated `docker ps` output produced with [`LIST_FORMAT`]
    fn parse_listing(stdout: &str) -> Vec<ProcessSummary> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let mut fields = line.split('\t').map(str::trim);
                let id = fields.next().unwrap_or_default().to_string();
                let name = fields.next().unwrap_or_default().to_string();
                let image = fields.next().unwrap_or_default().to_string();
                let state = fields.next().unwrap_or_default();
                let status = fields.next().unwrap_or_default().to_string();
                let ports = fields.next().unwrap_or_default().to_string();

                ProcessSummary {
                    id,
                    name,
                    image,
                    running: state == "running",
                    status,
                    ports,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ProcessHandle for DockerRuntime {
    async fn state(&self, name: &str) -> ProcessState {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--filter".to_string(),
            format!("name=^{name}$"),
            "--format".to_string(),
            "{{.State}}".to_string(),
        ];

        match self.run_checked(&args).await {
            Ok(stdout) => parse_state(&stdout),
            Err(e) => ProcessState::Unknown(e.to_string()),
        }
    }

    async fn start(&self, spec: &LaunchSpec) -> Result<(), RuntimeError> {
        let args = Self::build_run_args(spec);
        info!("Launching container {} from {}", spec.name, spec.image);

        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&spec.log_path)
            .map_err(|e| RuntimeError::Io(format!("{}: {e}", spec.log_path.display())))?;
        let log_err = log
            .try_clone()
            .map_err(|e| RuntimeError::Io(e.to_string()))?;

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        // own process group: a terminal Ctrl-C must not reach the client
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| RuntimeError::Unavailable(format!("{}: {e}", self.binary)))?;

        let mut write_error = None;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&spec.stdin).await {
                debug!("Writing config to {} stdin failed: {}", spec.name, e);
                write_error = Some(e);
            }
            // closing stdin signals end of config
            drop(stdin);
        }

        let outcome = tokio::time::timeout(self.launch_grace, child.wait()).await;
        match (outcome, write_error) {
            (Ok(Ok(status)), _) if !status.success() => Err(RuntimeError::command_failed(
                format!("{} run", self.binary),
                tail_file(&spec.log_path, 20),
            )),
            (Ok(Err(e)), _) => Err(RuntimeError::Io(e.to_string())),
            (_, Some(e)) => Err(RuntimeError::Io(format!("writing config to stdin: {e}"))),
            (Ok(Ok(_)), None) => {
                warn!("Container client for {} exited during launch", spec.name);
                Ok(())
            }
            (Err(_), None) => {
                debug!("{} still attached after grace period, detaching", spec.name);
                Ok(())
            }
        }
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.run_checked(&["stop".to_string(), name.to_string()])
            .await
            .map(|_| ())
            .map_err(|e| not_found_or(name, e))
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("-f".to_string());
        }
        args.push(name.to_string());

        self.run_checked(&args)
            .await
            .map(|_| ())
            .map_err(|e| not_found_or(name, e))
    }

    async fn list(&self, all: bool) -> Result<Vec<ProcessSummary>, RuntimeError> {
        let mut args = vec!["ps".to_string()];
        if all {
            args.push("-a".to_string());
        }
        args.push("--format".to_string());
        args.push(LIST_FORMAT.to_string());

        let stdout = self.run_checked(&args).await?;
        Ok(Self::parse_listing(&stdout))
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError> {
        let args = vec![
            "logs".to_string(),
            "--tail".to_string(),
            tail.to_string(),
            name.to_string(),
        ];
        let output = self.run(&args).await?;

        if !output.status.success() {
            return Err(RuntimeError::command_failed(
                format!("{} logs", self.binary),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        // docker logs replays the container's stderr on our stderr
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }

    async fn exec(&self, name: &str, command: &[&str]) -> Result<ExecOutput, RuntimeError> {
        let mut args = vec!["exec".to_string(), name.to_string()];
        args.extend(command.iter().map(|s| s.to_string()));

        let output = self.run(&args).await?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Map the first non-empty line of `docker ps --format {{.State}}`
fn parse_state(stdout: &str) -> ProcessState {
    match stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
        None => ProcessState::Absent,
        Some("running") => ProcessState::Present(RunState::Running),
        Some(_) => ProcessState::Present(RunState::Stopped),
    }
}

/// Reclassify the daemon's "No such container" as [`RuntimeError::NotFound`]
fn not_found_or(name: &str, err: RuntimeError) -> RuntimeError {
    match err {
        RuntimeError::CommandFailed { ref stderr, .. } if stderr.contains("No such container") => {
            RuntimeError::NotFound(name.to_string())
        }
        other => other,
    }
}

/// Last `lines` lines of a text file, empty if unreadable
fn tail_file(path: &Path, lines: usize) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let all: Vec<&str> = text.lines().collect();
            all[all.len().saturating_sub(lines)..].join("\n")
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mount, PortMapping};

    #[test]
    fn test_build_run_args() {
        let spec = LaunchSpec::new("mcpg-gateway", "ghcr.io/githubnext/gh-aw-mcpg:v0.0.59")
            .port(PortMapping::new(80, 8000))
            .mount(Mount::bind("/var/run/docker.sock", "/var/run/docker.sock"))
            .env("MCP_GATEWAY_PORT", "8000");

        let args = DockerRuntime::build_run_args(&spec);
        assert_eq!(
            args[..5],
            ["run", "-i", "--sig-proxy=false", "--name", "mcpg-gateway"]
        );
        assert!(args.windows(2).any(|w| w == ["-p", "80:8000"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["-v", "/var/run/docker.sock:/var/run/docker.sock"]));
        assert!(args.windows(2).any(|w| w == ["-e", "MCP_GATEWAY_PORT=8000"]));
        assert_eq!(args.last().unwrap(), "ghcr.io/githubnext/gh-aw-mcpg:v0.0.59");
    }

    #[test]
    fn test_parse_listing() {
        let gateway = [
            "abc123",
            "mcpg-gateway",
            "ghcr.io/githubnext/gh-aw-mcpg:v0.0.59",
            "running",
            "Up 2 minutes",
            "0.0.0.0:80->8000/tcp",
        ]
        .join("\t");
        let backend = [
            "def456",
            "github-mcp-1",
            "ghcr.io/github/github-mcp-server:latest",
            "exited",
            "Exited (1) 5 seconds ago",
            "",
        ]
        .join("\t");
        let stdout = format!("{gateway}\n{backend}\n\n");

        let rows = DockerRuntime::parse_listing(&stdout);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "mcpg-gateway");
        assert!(rows[0].running);
        assert_eq!(rows[0].ports, "0.0.0.0:80->8000/tcp");
        assert_eq!(rows[1].id, "def456");
        assert!(!rows[1].running);
        assert_eq!(rows[1].ports, "");
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(
            parse_state("running\n"),
            ProcessState::Present(RunState::Running)
        );
        assert_eq!(
            parse_state("exited\n"),
            ProcessState::Present(RunState::Stopped)
        );
        assert_eq!(
            parse_state("created\n"),
            ProcessState::Present(RunState::Stopped)
        );
        assert_eq!(parse_state(""), ProcessState::Absent);
        assert_eq!(parse_state("\n  \n"), ProcessState::Absent);
    }

    #[test]
    fn test_not_found_or() {
        let missing = RuntimeError::command_failed(
            "docker rm",
            "Error response from daemon: No such container: gw",
        );
        assert_eq!(
            not_found_or("gw", missing),
            RuntimeError::NotFound("gw".to_string())
        );

        let other = RuntimeError::command_failed("docker rm", "permission denied");
        assert_eq!(not_found_or("gw", other.clone()), other);
    }

    #[tokio::test]
    async fn test_client_exiting_before_reading_config() {
        let dir = tempfile::tempdir().unwrap();
        // `false` exits non-zero without reading stdin
        let runtime = DockerRuntime::new().binary("false");
        let spec = LaunchSpec::new("gw", "image:tag")
            .stdin(vec![b'x'; 4 * 1024 * 1024])
            .log_path(dir.path().join("gateway.log"));

        let err = runtime.start(&spec).await.unwrap_err();
        assert!(
            matches!(err, RuntimeError::CommandFailed { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_tail_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        std::fs::write(&path, "one\ntwo\nthree\n").unwrap();

        assert_eq!(tail_file(&path, 2), "two\nthree");
        assert_eq!(tail_file(&path, 10), "one\ntwo\nthree");
        assert_eq!(tail_file(&dir.path().join("missing"), 2), "");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unknown_state() {
        let runtime = DockerRuntime::new().binary("mcpg-no-such-runtime-binary");
        let state = runtime.state("anything").await;
        assert!(matches!(state, ProcessState::Unknown(_)));

        let err = runtime.remove("anything", true).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Unavailable(_)));
    }
}
