//! Process models
//!
//! Identity, state and launch parameters for containers driven through a
//! [`ProcessHandle`](crate::runtime::ProcessHandle).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Stable name by which a container is located
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProcessIdentity {
    pub name: String,
}

impl ProcessIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Whether a present container is running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// Runtime state of a named container, derived fresh on every query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Absent,
    Present(RunState),
    Unknown(String),
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Present(RunState::Running))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcessState::Absent => "absent",
            ProcessState::Present(RunState::Running) => "running",
            ProcessState::Present(RunState::Stopped) => "stopped",
            ProcessState::Unknown(_) => "unknown",
        }
    }
}

/// One row of a runtime listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub ports: String,
    pub running: bool,
}

impl ProcessSummary {
    /// Multi-line status block used by `debug`
    pub fn format_block(&self) -> String {
        format!(
            "ID: {}\nImage: {}\nStatus: {}\nPorts: {}",
            self.id, self.image, self.status, self.ports
        )
    }
}

/// Host-to-container port mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    pub fn new(host: u16, container: u16) -> Self {
        Self { host, container }
    }

    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.host, self.container)
    }
}

/// Bind mount from the host into the container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Mount {
    pub fn bind(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.source.display(), self.target.display())
    }
}

/// Everything needed to create and start a container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub mounts: Vec<Mount>,
    pub env: BTreeMap<String, String>,

    /// Bytes written to the process's stdin after launch
    pub stdin: Vec<u8>,

    /// File that receives the process's stdout and stderr
    pub log_path: PathBuf,
}

impl LaunchSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            mounts: Vec::new(),
            env: BTreeMap::new(),
            stdin: Vec::new(),
            log_path: PathBuf::from("/dev/null"),
        }
    }

    pub fn port(mut self, mapping: PortMapping) -> Self {
        self.ports.push(mapping);
        self
    }

    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.stdin = payload.into();
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_state() {
        assert!(!ProcessState::Absent.is_running());
        assert!(ProcessState::Present(RunState::Running).is_running());
        assert!(!ProcessState::Present(RunState::Stopped).is_running());
        assert_eq!(ProcessState::Present(RunState::Stopped).as_str(), "stopped");
        assert_eq!(ProcessState::Unknown("x".into()).as_str(), "unknown");
    }

    #[test]
    fn test_launch_spec_args() {
        let spec = LaunchSpec::new("gw", "image:tag")
            .port(PortMapping::new(80, 8000))
            .mount(Mount::bind("/var/run/docker.sock", "/var/run/docker.sock"))
            .env("A", "1");

        assert_eq!(spec.ports[0].to_arg(), "80:8000");
        assert_eq!(spec.mounts[0].to_arg(), "/var/run/docker.sock:/var/run/docker.sock");
        assert_eq!(spec.env.get("A"), Some(&"1".to_string()));
    }
}
