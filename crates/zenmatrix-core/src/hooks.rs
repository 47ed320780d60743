use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;

/// Session lifecycle events a hook script can attach to.
#[derive(Debug, Clone, Copy)]
pub enum HookEvent {
    Login,
    Logout,
}

impl HookEvent {
    fn script_prefix(self) -> &'static str {
        match self {
            Self::Login => "on-login.",
            Self::Logout => "on-logout.",
        }
    }
}

/// Runs executable scripts under `<data>/hooks/` when a session is created
/// or torn down, forced logout included. Scripts are matched by the
/// `on-login.` / `on-logout.` name prefix and run in name order.
#[derive(Debug, Clone)]
pub struct HookRunner {
    enabled: bool,
    hooks_dir: PathBuf,
}

impl HookRunner {
    pub fn new(cfg: &Config, data_dir: &Path) -> Self {
        let runner = Self {
            enabled: cfg.get_bool("hooks").unwrap_or(true),
            hooks_dir: data_dir.join("hooks"),
        };
        debug!(
            enabled = runner.enabled,
            hooks_dir = %runner.hooks_dir.display(),
            "initialized hook runner"
        );
        runner
    }

    #[instrument(skip(self))]
    pub fn run_on_login(&self) -> anyhow::Result<()> {
        self.run_event(HookEvent::Login)
    }

    #[instrument(skip(self))]
    pub fn run_on_logout(&self) -> anyhow::Result<()> {
        self.run_event(HookEvent::Logout)
    }

    fn run_event(&self, event: HookEvent) -> anyhow::Result<()> {
        if !self.enabled {
            debug!(?event, "hooks disabled; skipping");
            return Ok(());
        }

        for script in self.scripts_for(event)? {
            run_script(&script)?;
        }
        Ok(())
    }

    fn scripts_for(&self, event: HookEvent) -> anyhow::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.hooks_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read hooks dir {}", self.hooks_dir.display())
                });
            }
        };

        let mut scripts = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let named_for_event = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(event.script_prefix()));
            if !named_for_event || !path.is_file() {
                continue;
            }

            if is_executable(&path)? {
                scripts.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-executable hook");
            }
        }

        scripts.sort();
        debug!(?event, count = scripts.len(), "collected hook scripts");
        Ok(scripts)
    }
}

fn run_script(path: &Path) -> anyhow::Result<()> {
    info!(hook = %path.display(), "running hook");

    let output = Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("failed to run hook {}", path.display()))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!(hook = %path.display(), stderr = %stderr.trim(), "hook wrote stderr");
    }

    if output.status.success() {
        Ok(())
    } else {
        Err(anyhow!("hook {} failed: {}", path.display(), output.status))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> anyhow::Result<bool> {
    use std::os::unix::fs::PermissionsExt;

    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> anyhow::Result<bool> {
    Ok(path.is_file())
}
