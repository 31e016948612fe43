use super::types::Assignment;
use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Load a JSON array (subjects or participants) from a file.
pub fn load_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    serde_json::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a previously saved assignment.
pub fn load_assignment(path: &Path) -> Result<Assignment> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open assignment file at {}", path.display()))?;

    let assignment: Assignment =
        serde_json::from_reader(file).context("Failed to load assignment")?;

    if assignment.version != 1 {
        anyhow::bail!("Unsupported assignment version: {}", assignment.version);
    }

    Ok(assignment)
}

/// Save an assignment to a JSON file atomically
///
/// A draw is only valid once, so an existing file is never overwritten.
pub fn save_assignment(path: &Path, assignment: &Assignment) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "Assignment file {} already exists; remove it to draw again",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, assignment).context("Failed to serialize assignment")?;

    file.commit().context("Failed to save assignment")?;

    Ok(())
}
