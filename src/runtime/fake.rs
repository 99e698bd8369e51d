//! In-memory process handle for tests

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ExecOutput, ProcessHandle, RuntimeError};
use crate::models::{LaunchSpec, ProcessState, ProcessSummary, RunState};

#[derive(Clone, Debug)]
struct FakeProcess {
    image: String,
    running: bool,
    env: BTreeMap<String, String>,
    stdin: Vec<u8>,
}

/// Fake runtime keeping containers in a map
#[derive(Default)]
pub struct FakeRuntime {
    processes: Mutex<BTreeMap<String, FakeProcess>>,
    fail_remove: Mutex<BTreeSet<String>>,
    fail_stop: Mutex<BTreeSet<String>>,
    reject_start: Mutex<Option<String>>,
    unavailable: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    logs: Mutex<String>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a container as if something else had started it
    pub fn with_process(self, name: &str, image: &str, running: bool) -> Self {
        self.processes.lock().unwrap().insert(
            name.to_string(),
            FakeProcess {
                image: image.to_string(),
                running,
                env: BTreeMap::new(),
                stdin: Vec::new(),
            },
        );
        self
    }

    pub fn fail_remove_of(self, name: &str) -> Self {
        self.fail_remove.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn fail_stop_of(self, name: &str) -> Self {
        self.fail_stop.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn reject_start(self, diagnostic: &str) -> Self {
        *self.reject_start.lock().unwrap() = Some(diagnostic.to_string());
        self
    }

    pub fn unavailable(self) -> Self {
        *self.unavailable.lock().unwrap() = true;
        self
    }

    pub fn with_logs(self, logs: &str) -> Self {
        *self.logs.lock().unwrap() = logs.to_string();
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.processes.lock().unwrap().keys().cloned().collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.processes
            .lock()
            .unwrap()
            .keys()
            .filter(|n| n.as_str() == name)
            .count()
    }

    pub fn stdin_of(&self, name: &str) -> Option<Vec<u8>> {
        self.processes
            .lock()
            .unwrap()
            .get(name)
            .map(|p| p.stdin.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_available(&self) -> Result<(), RuntimeError> {
        if *self.unavailable.lock().unwrap() {
            return Err(RuntimeError::Unavailable("fake runtime offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessHandle for FakeRuntime {
    async fn state(&self, name: &str) -> ProcessState {
        self.record(format!("state {name}"));
        if let Err(e) = self.check_available() {
            return ProcessState::Unknown(e.to_string());
        }

        match self.processes.lock().unwrap().get(name) {
            None => ProcessState::Absent,
            Some(p) if p.running => ProcessState::Present(RunState::Running),
            Some(_) => ProcessState::Present(RunState::Stopped),
        }
    }

    async fn start(&self, spec: &LaunchSpec) -> Result<(), RuntimeError> {
        self.record(format!("start {}", spec.name));
        self.check_available()?;

        if let Some(diagnostic) = self.reject_start.lock().unwrap().clone() {
            return Err(RuntimeError::command_failed("docker run", diagnostic));
        }

        let mut processes = self.processes.lock().unwrap();
        if processes.contains_key(&spec.name) {
            return Err(RuntimeError::command_failed(
                "docker run",
                format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            ));
        }

        processes.insert(
            spec.name.clone(),
            FakeProcess {
                image: spec.image.clone(),
                running: true,
                env: spec.env.clone(),
                stdin: spec.stdin.clone(),
            },
        );
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("stop {name}"));
        self.check_available()?;

        if self.fail_stop.lock().unwrap().contains(name) {
            return Err(RuntimeError::command_failed("docker stop", "timeout"));
        }

        match self.processes.lock().unwrap().get_mut(name) {
            Some(p) => {
                p.running = false;
                Ok(())
            }
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        self.record(format!("remove {name} force={force}"));
        self.check_available()?;

        if self.fail_remove.lock().unwrap().contains(name) {
            return Err(RuntimeError::command_failed(
                "docker rm",
                "removal of container is already in progress",
            ));
        }

        let mut processes = self.processes.lock().unwrap();
        let running = match processes.get(name) {
            Some(p) => p.running,
            None => return Err(RuntimeError::NotFound(name.to_string())),
        };
        if running && !force {
            return Err(RuntimeError::command_failed(
                "docker rm",
                "cannot remove a running container",
            ));
        }

        processes.remove(name);
        Ok(())
    }

    async fn list(&self, all: bool) -> Result<Vec<ProcessSummary>, RuntimeError> {
        self.check_available()?;

        Ok(self
            .processes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| all || p.running)
            .enumerate()
            .map(|(i, (name, p))| ProcessSummary {
                id: format!("{i:012x}"),
                name: name.clone(),
                image: p.image.clone(),
                status: if p.running { "Up" } else { "Exited (0)" }.to_string(),
                ports: String::new(),
                running: p.running,
            })
            .collect())
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError> {
        self.check_available()?;
        if !self.processes.lock().unwrap().contains_key(name) {
            return Err(RuntimeError::NotFound(name.to_string()));
        }

        let logs = self.logs.lock().unwrap().clone();
        let lines: Vec<&str> = logs.lines().collect();
        Ok(lines[lines.len().saturating_sub(tail)..].join("\n"))
    }

    async fn exec(&self, name: &str, command: &[&str]) -> Result<ExecOutput, RuntimeError> {
        self.record(format!("exec {name} {}", command.join(" ")));
        self.check_available()?;

        let processes = self.processes.lock().unwrap();
        let process = processes
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;

        let output = match command {
            ["printenv", var] => match process.env.get(*var) {
                Some(value) => ExecOutput {
                    exit_code: 0,
                    stdout: format!("{value}\n"),
                    stderr: String::new(),
                },
                None => ExecOutput {
                    exit_code: 1,
                    ..Default::default()
                },
            },
            ["test", "-S", _] => ExecOutput::default(),
            ["ls", ..] => ExecOutput {
                exit_code: 0,
                stdout: "total 4.0K\n-rw-r--r-- 1 root root 120 gateway.md\n".to_string(),
                stderr: String::new(),
            },
            _ => ExecOutput {
                exit_code: 127,
                stdout: String::new(),
                stderr: "command not found".to_string(),
            },
        };
        Ok(output)
    }
}
