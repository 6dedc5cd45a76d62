//! The narrow set of host mutations the installer is allowed to perform.
//!
//! Plain file writes happen directly against the [`InstallLayout`] paths; everything that
//! needs a system utility or a system call goes through [`HostOps`]:
//! - systemd unit control (`systemctl start|stop|enable|disable|daemon-reload`)
//! - account management (`groupadd`, `useradd`, `userdel`, `groupdel`)
//! - ownership changes (`chown(2)`)
//! - running an arbitrary program and capturing its output
//!
//! [`SystemHost`] performs these for real. With the `test-utils` feature, [`fake::FakeHost`]
//! records them in memory and can be told to fail any of them.
//!
//! How a failed operation affects the surrounding lifecycle step is decided by a
//! [`FailurePolicy`], not by the host implementation.

use std::process::Command;

use nix::unistd::{chown, Group, User};

use super::*;

#[cfg(any(test, feature = "test-utils"))] pub mod fake;

/// Exit code `groupadd`/`useradd` use when the account already exists.
const EXIT_ALREADY_EXISTS: i32 = 9;

/// Captured result of running a program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit code, `None` when terminated by a signal
  pub code:   Option<i32>,
  /// Captured standard output, lossily decoded
  pub stdout: String,
  /// Captured standard error, lossily decoded
  pub stderr: String,
}

impl CommandOutput {
  /// Whether the program exited with status zero.
  pub fn success(&self) -> bool { self.code == Some(0) }
}

/// Host capabilities needed to install and remove the exporter.
///
/// Every method reports failure through its `Result`; none of them decide whether the
/// failure is fatal.
pub trait HostOps {
  /// Starts a systemd unit.
  fn start_service(&self, service: &str) -> Result<(), ExporterError>;

  /// Stops a systemd unit.
  fn stop_service(&self, service: &str) -> Result<(), ExporterError>;

  /// Enables a systemd unit for boot-time start.
  fn enable_service(&self, service: &str) -> Result<(), ExporterError>;

  /// Disables a systemd unit.
  fn disable_service(&self, service: &str) -> Result<(), ExporterError>;

  /// Makes systemd re-read unit files.
  fn daemon_reload(&self) -> Result<(), ExporterError>;

  /// Creates a group. An already existing group is not an error.
  fn create_group(&self, group: &str) -> Result<(), ExporterError>;

  /// Creates a system user without home directory or login shell, whose primary group is
  /// `identity.group`. An already existing user is not an error.
  fn create_system_user(&self, identity: &ServiceIdentity) -> Result<(), ExporterError>;

  /// Deletes a user.
  fn delete_user(&self, user: &str) -> Result<(), ExporterError>;

  /// Deletes a group.
  fn delete_group(&self, group: &str) -> Result<(), ExporterError>;

  /// Hands ownership of `path` to the service identity.
  fn chown(&self, path: &Path, identity: &ServiceIdentity) -> Result<(), ExporterError>;

  /// Runs a program to completion and captures its output, whatever its exit status.
  fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput, ExporterError>;
}

/// What a lifecycle step does when a host operation fails.
///
/// Install is fail-fast ([`FailurePolicy::Abort`]) and uninstall is fail-soft
/// ([`FailurePolicy::Continue`]); both are configurable on the [`Installer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
  /// Log and stop, surfacing [`ExporterError::Operational`] with the step's message.
  Abort,
  /// Log and keep going.
  Continue,
}

impl FailurePolicy {
  /// Applies the policy to the result of one step.
  ///
  /// Returns `Ok(true)` if the step succeeded, `Ok(false)` if it failed but was tolerated.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::Operational`] carrying `message` if the step failed under
  /// [`FailurePolicy::Abort`].
  pub fn check<T>(
    self,
    result: Result<T, ExporterError>,
    message: &str,
  ) -> Result<bool, ExporterError> {
    match result {
      Ok(_) => Ok(true),
      Err(e) => {
        error!("{message} ({e})");
        match self {
          FailurePolicy::Abort => Err(ExporterError::Operational(message.to_string())),
          FailurePolicy::Continue => Ok(false),
        }
      },
    }
  }
}

/// The real host, driven through systemd and shadow-utils.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl SystemHost {
  /// Runs a utility and maps a non-zero exit to [`ExporterError::Command`].
  ///
  /// Exit codes listed in `tolerated` count as success.
  fn exec(&self, program: &str, args: &[&str], tolerated: &[i32]) -> Result<(), ExporterError> {
    let command =
      std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
    debug!("Running `{command}`");

    let output = Command::new(program).args(args).output()?;
    match output.status.code() {
      Some(0) => Ok(()),
      Some(code) if tolerated.contains(&code) => {
        debug!("`{command}` exited with tolerated status {code}");
        Ok(())
      },
      code => {
        trace!("`{command}` stderr: {}", String::from_utf8_lossy(&output.stderr));
        Err(ExporterError::Command { command, code })
      },
    }
  }

  /// Runs `systemctl <action> [unit]`.
  fn systemctl(&self, action: &str, service: Option<&str>) -> Result<(), ExporterError> {
    let args = match service {
      Some(service) => vec![action, service],
      None => vec![action],
    };
    self.exec("systemctl", &args, &[])
  }
}

impl HostOps for SystemHost {
  fn start_service(&self, service: &str) -> Result<(), ExporterError> {
    self.systemctl("start", Some(service))
  }

  fn stop_service(&self, service: &str) -> Result<(), ExporterError> {
    self.systemctl("stop", Some(service))
  }

  fn enable_service(&self, service: &str) -> Result<(), ExporterError> {
    self.systemctl("enable", Some(service))
  }

  fn disable_service(&self, service: &str) -> Result<(), ExporterError> {
    self.systemctl("disable", Some(service))
  }

  fn daemon_reload(&self) -> Result<(), ExporterError> { self.systemctl("daemon-reload", None) }

  fn create_group(&self, group: &str) -> Result<(), ExporterError> {
    self.exec("groupadd", &[group], &[EXIT_ALREADY_EXISTS])
  }

  fn create_system_user(&self, identity: &ServiceIdentity) -> Result<(), ExporterError> {
    let gid = format!("--gid={}", identity.group);
    self.exec(
      "useradd",
      &["--system", "--no-create-home", &gid, "--shell=/usr/sbin/nologin", &identity.user],
      &[EXIT_ALREADY_EXISTS],
    )
  }

  fn delete_user(&self, user: &str) -> Result<(), ExporterError> {
    self.exec("userdel", &[user], &[])
  }

  fn delete_group(&self, group: &str) -> Result<(), ExporterError> {
    self.exec("groupdel", &[group], &[])
  }

  fn chown(&self, path: &Path, identity: &ServiceIdentity) -> Result<(), ExporterError> {
    let user = User::from_name(&identity.user)?.ok_or_else(|| ExporterError::UnknownIdentity {
      kind: "user",
      name: identity.user.clone(),
    })?;
    let group =
      Group::from_name(&identity.group)?.ok_or_else(|| ExporterError::UnknownIdentity {
        kind: "group",
        name: identity.group.clone(),
      })?;

    debug!("Changing owner of {} to {}:{}", path.display(), identity.user, identity.group);
    Ok(chown(path, Some(user.uid), Some(group.gid))?)
  }

  fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput, ExporterError> {
    debug!("Running `{} {}`", program.display(), args.join(" "));
    let output = Command::new(program).args(args).output()?;
    Ok(CommandOutput {
      code:   output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}
