use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::User;
use crate::view::ViewState;

/// The authenticated identity: bearer token plus the profile the server
/// returned with it. Held on disk between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// On-disk client state under the data directory: `session.data` for the
/// credentials, `view.data` for the sticky view-state.
#[derive(Debug)]
pub struct StateDir {
    pub data_dir: PathBuf,
    pub session_path: PathBuf,
    pub view_path: PathBuf,
}

impl StateDir {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let session_path = data_dir.join("session.data");
        let view_path = data_dir.join("view.data");

        info!(
            data_dir = %data_dir.display(),
            session = %session_path.display(),
            view = %view_path.display(),
            "opened state directory"
        );

        Ok(Self {
            data_dir,
            session_path,
            view_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_session(&self) -> anyhow::Result<Option<Session>> {
        load_json(&self.session_path).context("failed to load session.data")
    }

    #[tracing::instrument(skip(self, session))]
    pub fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        save_json_atomic(&self.session_path, session).context("failed to save session.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_session(&self) -> anyhow::Result<()> {
        if self.session_path.exists() {
            fs::remove_file(&self.session_path)
                .with_context(|| format!("failed to remove {}", self.session_path.display()))?;
            info!("session cleared");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_view(&self) -> anyhow::Result<Option<ViewState>> {
        load_json(&self.view_path).context("failed to load view.data")
    }

    #[tracing::instrument(skip(self, view))]
    pub fn save_view(&self, view: &ViewState) -> anyhow::Result<()> {
        save_json_atomic(&self.view_path, view).context("failed to save view.data")
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed reading {}", path.display()));
        }
    };

    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str(raw.trim())
        .with_context(|| format!("failed parsing {}", path.display()))?;
    debug!(file = %path.display(), "loaded state file");
    Ok(Some(value))
}

/// Write-to-temp-then-rename so a crash mid-write never truncates the
/// previous state.
fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;

    serde_json::to_writer(&mut temp, value)?;
    temp.write_all(b"\n")?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    debug!(file = %path.display(), "state file written");
    Ok(())
}
