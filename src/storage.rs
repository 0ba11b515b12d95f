//! On-disk locations and resume files.
//!
//! Config (the credential) and data (auto-saved resumes, logs) live under the
//! OS config/data dirs. `STAR_RESUME_CONFIG_HOME` replaces both roots, which
//! keeps tests and portable installs self-contained.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "star-resume";
pub const HOME_OVERRIDE_ENV: &str = "STAR_RESUME_CONFIG_HOME";

fn override_root() -> Option<PathBuf> {
    std::env::var_os(HOME_OVERRIDE_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Directory holding the saved credential.
pub fn config_dir() -> Option<PathBuf> {
    override_root()
        .or_else(dirs::config_dir)
        .map(|p| p.join(APP_DIR))
}

/// Directory holding auto-saved resumes and logs.
pub fn data_dir() -> Option<PathBuf> {
    override_root()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join(APP_DIR))
}

pub fn credential_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("credential"))
}

pub fn logs_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}

fn resumes_dir() -> Result<PathBuf> {
    let dir = data_dir()
        .context("no data directory available")?
        .join("resumes");
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// File-name friendly UTC timestamp, e.g. `20240105T093015Z`.
pub fn file_timestamp() -> String {
    let fmt = time::macros::format_description!("[year][month][day]T[hour][minute][second]Z");
    time::OffsetDateTime::now_utc()
        .format(&fmt)
        .unwrap_or_else(|_| "now".into())
}

/// Save a generated resume into the data dir under a timestamped name.
pub fn save_resume(text: &str) -> Result<PathBuf> {
    save_timestamped(&resumes_dir()?, "resume", text)
}

const MAX_NAME_SUFFIX: u32 = 1000;

/// Write `text` to `dir/{prefix}-{timestamp}.txt`, adding `-1`, `-2`, ...
/// when a save in the same second already took the name.
pub fn save_timestamped(dir: &Path, prefix: &str, text: &str) -> Result<PathBuf> {
    use std::io::Write;

    let stem = format!("{prefix}-{}", file_timestamp());
    for n in 0..MAX_NAME_SUFFIX {
        let name = if n == 0 {
            format!("{stem}.txt")
        } else {
            format!("{stem}-{n}.txt")
        };
        let path = dir.join(name);
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("create {}", path.display())),
        };
        file.write_all(with_trailing_newline(text).as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        return Ok(path);
    }
    anyhow::bail!("no free file name for {stem}.txt in {}", dir.display())
}

/// Write a generated resume to an explicit path.
pub fn export_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, with_trailing_newline(text))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn with_trailing_newline(text: &str) -> String {
    let mut body = text.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_text_creates_parents_and_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/resume.txt");
        export_text(&path, "JOHN DOE").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "JOHN DOE\n");
    }

    #[test]
    fn test_file_timestamp_shape() {
        let ts = file_timestamp();
        assert_eq!(ts.len(), 16, "{ts}");
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[8..9], "T");
    }

    #[test]
    fn test_saves_in_the_same_second_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|i| save_timestamped(dir.path(), "resume", &format!("draft {i}")).unwrap())
            .collect();

        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(std::fs::read_to_string(path).unwrap(), format!("draft {i}\n"));
        }
    }

    #[test]
    fn test_taken_name_gets_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let first = save_timestamped(dir.path(), "resume", "a").unwrap();
        let stem = first.file_stem().unwrap().to_str().unwrap().to_string();
        // Pre-claim the first suffix too, so the next save must skip past it.
        std::fs::write(dir.path().join(format!("{stem}-1.txt")), "taken").unwrap();

        let next = save_timestamped(dir.path(), "resume", "b").unwrap();
        let name = next.file_name().unwrap().to_str().unwrap();
        // A second boundary may fall between the two calls.
        assert!(name == format!("{stem}-2.txt") || !name.starts_with(&stem), "{name}");
        assert_eq!(
            std::fs::read_to_string(dir.path().join(format!("{stem}-1.txt"))).unwrap(),
            "taken"
        );
    }
}
