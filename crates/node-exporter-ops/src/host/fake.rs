//! In-memory [`HostOps`] for tests.
//!
//! Tracks accounts and unit states in memory, journals every call, and fails any
//! operation on request. Running a program returns canned output registered with
//! [`FakeHost::set_output`]; unregistered programs behave as if missing.

use std::{
  collections::{BTreeMap, BTreeSet},
  io,
  sync::{Mutex, MutexGuard},
};

use super::*;

/// One recorded host operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostCall {
  /// `systemctl start <unit>`
  StartService(String),
  /// `systemctl stop <unit>`
  StopService(String),
  /// `systemctl enable <unit>`
  EnableService(String),
  /// `systemctl disable <unit>`
  DisableService(String),
  /// `systemctl daemon-reload`
  DaemonReload,
  /// `groupadd <group>`
  CreateGroup(String),
  /// `useradd ... <user>`
  CreateUser(String),
  /// `userdel <user>`
  DeleteUser(String),
  /// `groupdel <group>`
  DeleteGroup(String),
  /// `chown(2)` on a path
  Chown(PathBuf),
  /// Any program run for its output
  Run(PathBuf),
}

impl HostCall {
  /// Discriminant used to match injected failures regardless of arguments.
  fn kind(&self) -> std::mem::Discriminant<Self> { std::mem::discriminant(self) }
}

/// Mutable state behind the fake.
#[derive(Debug, Default)]
struct FakeHostState {
  users:          BTreeSet<String>,
  groups:         BTreeSet<String>,
  enabled:        BTreeSet<String>,
  running:        BTreeSet<String>,
  owners:         BTreeMap<PathBuf, ServiceIdentity>,
  outputs:        BTreeMap<PathBuf, CommandOutput>,
  failing:        Vec<HostCall>,
  calls:          Vec<HostCall>,
  daemon_reloads: usize,
}

/// A host that exists only in memory.
#[derive(Debug, Default)]
pub struct FakeHost {
  state: Mutex<FakeHostState>,
}

impl FakeHost {
  /// Creates an empty host with no accounts and no units.
  pub fn new() -> Self { Self::default() }

  /// Locks the state, recovering it if a panicking test poisoned the lock.
  fn state(&self) -> MutexGuard<'_, FakeHostState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Makes every future call of the same kind as `call` fail, whatever its arguments.
  pub fn fail_on(&self, call: HostCall) { self.state().failing.push(call); }

  /// Registers the output returned when `program` is run.
  pub fn set_output(&self, program: impl Into<PathBuf>, output: CommandOutput) {
    self.state().outputs.insert(program.into(), output);
  }

  /// Registers a successful run of `program` printing `stdout`.
  pub fn set_stdout(&self, program: impl Into<PathBuf>, stdout: &str) {
    self.set_output(program, CommandOutput {
      code:   Some(0),
      stdout: stdout.to_string(),
      stderr: String::new(),
    });
  }

  /// Every call made so far, in order, including failed ones.
  pub fn calls(&self) -> Vec<HostCall> { self.state().calls.clone() }

  /// Whether `user` currently exists.
  pub fn has_user(&self, user: &str) -> bool { self.state().users.contains(user) }

  /// Whether `group` currently exists.
  pub fn has_group(&self, group: &str) -> bool { self.state().groups.contains(group) }

  /// Whether `service` is enabled.
  pub fn is_enabled(&self, service: &str) -> bool { self.state().enabled.contains(service) }

  /// Whether `service` is running.
  pub fn is_running(&self, service: &str) -> bool { self.state().running.contains(service) }

  /// The identity `path` was last handed to.
  pub fn owner_of(&self, path: &Path) -> Option<ServiceIdentity> {
    self.state().owners.get(path).cloned()
  }

  /// Number of `daemon-reload`s so far.
  pub fn daemon_reloads(&self) -> usize { self.state().daemon_reloads }

  /// Journals `call` and returns the state if it should succeed.
  fn record(&self, call: HostCall) -> Result<MutexGuard<'_, FakeHostState>, ExporterError> {
    let mut state = self.state();
    let fails = state.failing.iter().any(|f| f.kind() == call.kind());
    let command = format!("{call:?}");
    state.calls.push(call);
    if fails {
      return Err(ExporterError::Command { command, code: Some(1) });
    }
    Ok(state)
  }
}

impl HostOps for FakeHost {
  fn start_service(&self, service: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::StartService(service.to_string()))?;
    state.running.insert(service.to_string());
    Ok(())
  }

  fn stop_service(&self, service: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::StopService(service.to_string()))?;
    state.running.remove(service);
    Ok(())
  }

  fn enable_service(&self, service: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::EnableService(service.to_string()))?;
    state.enabled.insert(service.to_string());
    Ok(())
  }

  fn disable_service(&self, service: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::DisableService(service.to_string()))?;
    state.enabled.remove(service);
    Ok(())
  }

  fn daemon_reload(&self) -> Result<(), ExporterError> {
    self.record(HostCall::DaemonReload)?.daemon_reloads += 1;
    Ok(())
  }

  // Existing accounts are accepted, matching `SystemHost`'s tolerated exit code.
  fn create_group(&self, group: &str) -> Result<(), ExporterError> {
    self.record(HostCall::CreateGroup(group.to_string()))?.groups.insert(group.to_string());
    Ok(())
  }

  fn create_system_user(&self, identity: &ServiceIdentity) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::CreateUser(identity.user.clone()))?;
    if !state.groups.contains(&identity.group) {
      return Err(ExporterError::UnknownIdentity { kind: "group", name: identity.group.clone() });
    }
    state.users.insert(identity.user.clone());
    Ok(())
  }

  fn delete_user(&self, user: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::DeleteUser(user.to_string()))?;
    if !state.users.remove(user) {
      return Err(ExporterError::UnknownIdentity { kind: "user", name: user.to_string() });
    }
    Ok(())
  }

  fn delete_group(&self, group: &str) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::DeleteGroup(group.to_string()))?;
    if !state.groups.remove(group) {
      return Err(ExporterError::UnknownIdentity { kind: "group", name: group.to_string() });
    }
    Ok(())
  }

  fn chown(&self, path: &Path, identity: &ServiceIdentity) -> Result<(), ExporterError> {
    let mut state = self.record(HostCall::Chown(path.to_path_buf()))?;
    if !state.users.contains(&identity.user) {
      return Err(ExporterError::UnknownIdentity { kind: "user", name: identity.user.clone() });
    }
    if !path.exists() {
      return Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()).into());
    }
    state.owners.insert(path.to_path_buf(), identity.clone());
    Ok(())
  }

  fn run(&self, program: &Path, _args: &[&str]) -> Result<CommandOutput, ExporterError> {
    let state = self.record(HostCall::Run(program.to_path_buf()))?;
    state.outputs.get(program).cloned().ok_or_else(|| {
      io::Error::new(io::ErrorKind::NotFound, format!("{} not found", program.display())).into()
    })
  }
}
