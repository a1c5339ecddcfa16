//! CSV export of group members into a per-run output directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::client::Member;
use crate::error::Result;

/// Directory name format for one run, e.g. `2024-05-01 13-45-07`
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

pub const CSV_HEADER: [&str; 4] = ["id", "username", "first_name", "last_name"];

static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Remove characters that are not allowed in file names on common filesystems.
pub fn sanitize(name: &str) -> String {
    ILLEGAL_CHARS.replace_all(name, "").into_owned()
}

pub fn run_dir_name(started_at: DateTime<Local>) -> String {
    started_at.format(RUN_DIR_FORMAT).to_string()
}

/// Writes one CSV per group into the run directory.
#[derive(Debug)]
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    /// Create the run directory `<root>/<started_at>`.
    ///
    /// Fails if the directory already exists.
    pub fn create(root: &Path, started_at: DateTime<Local>) -> Result<Self> {
        let dir = root.join(run_dir_name(started_at));
        fs::create_dir(&dir)?;
        tracing::info!("Exporting to {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, group_name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sanitize(group_name)))
    }

    /// Write `members` in the given order, replacing any existing file of the same name.
    pub fn export(&self, group_name: &str, members: &[Member]) -> Result<PathBuf> {
        let path = self.path_for(group_name);
        if path.exists() {
            tracing::warn!("{} already exists and will be overwritten", path.display());
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&path)?;

        writer.write_record(CSV_HEADER)?;
        for member in members {
            writer.write_record([
                member.id.to_string().as_str(),
                member.username.as_deref().unwrap_or(""),
                member.first_name.as_deref().unwrap_or(""),
                member.last_name.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;

        Ok(path)
    }
}
