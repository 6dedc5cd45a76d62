//! File templates written during install.
//!
//! Both templates are compiled into the binary and rendered by substituting `{name}`
//! placeholders, so installs do not depend on the working directory they run from.

use super::*;

/// systemd unit template.
pub const SERVICE_UNIT_TEMPLATE: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/node_exporter.service"));

/// Sysconfig (environment file) template.
pub const SYSCONFIG_TEMPLATE: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/node_exporter.tmpl"));

/// Replaces every `{key}` in `template` with its value.
fn render(template: &str, values: &[(&str, &str)]) -> String {
  values
    .iter()
    .fold(template.to_string(), |rendered, (key, value)| {
      rendered.replace(&format!("{{{key}}}"), value)
    })
}

/// Renders the systemd unit for `layout`.
///
/// The unit runs the installed binary as the layout's service identity and reads its flags
/// from the sysconfig file.
pub fn render_service_unit(layout: &InstallLayout) -> String {
  let binary_path = layout.artifact.binary_path.display().to_string();
  let sysconfig_path = layout.artifact.sysconfig_path.display().to_string();
  render(SERVICE_UNIT_TEMPLATE, &[
    ("user", layout.identity.user.as_str()),
    ("group", layout.identity.group.as_str()),
    ("binary_path", binary_path.as_str()),
    ("sysconfig_path", sysconfig_path.as_str()),
  ])
}

/// Renders the sysconfig file for `layout`.
///
/// # Examples
///
/// ```
/// use node_exporter_ops::{templates::render_sysconfig, InstallLayout};
///
/// let rendered = render_sysconfig(&InstallLayout::default());
/// assert!(rendered.starts_with("OPTIONS=\"--web.listen-address=0.0.0.0:9100 "));
/// ```
pub fn render_sysconfig(layout: &InstallLayout) -> String {
  let listen_address = layout.listen_address();
  let textfile_dir = layout.artifact.textfile_dir.display().to_string();
  render(SYSCONFIG_TEMPLATE, &[
    ("listen_address", listen_address.as_str()),
    ("textfile_dir", textfile_dir.as_str()),
  ])
}
