use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::scoring::Category;

/// A module selected for grading.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModuleTarget {
    pub category: Category,
    pub name: String,
}

impl ModuleTarget {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }

    /// Source directory of this module under `modules_root`.
    pub fn dir(&self, modules_root: &Path) -> PathBuf {
        module_dir(modules_root, self.category, &self.name)
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

pub fn module_dir(modules_root: &Path, category: Category, name: &str) -> PathBuf {
    modules_root.join(category.as_str()).join(name)
}

/// List module identifiers under `<modules_root>/<category>`.
///
/// A subdirectory counts as a module only if it contains `config_artifact`.
/// A missing category directory yields no modules. Names are sorted.
pub fn discover_modules(
    modules_root: &Path,
    category: Category,
    config_artifact: &str,
) -> Result<Vec<String>> {
    let category_dir = modules_root.join(category.as_str());

    let entries = match fs::read_dir(&category_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(dir = %category_dir.display(), "category directory not found");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to list modules in {}", category_dir.display())
            })
        }
    };

    let mut modules = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    dir = %category_dir.display(),
                    error = %e,
                    "skipping unreadable entry"
                );
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %path.display(), "skipping module with non UTF-8 name");
            continue;
        };
        if path.join(config_artifact).is_file() {
            modules.push(name);
        } else {
            tracing::warn!(module = %name, artifact = config_artifact, "module has no config");
        }
    }

    modules.sort();
    Ok(modules)
}

/// Discover modules in every category, fruits first.
///
/// A category that cannot be listed is logged and contributes no modules;
/// the other category is still searched.
pub fn discover_all(modules_root: &Path, config_artifact: &str) -> Vec<ModuleTarget> {
    let mut targets = Vec::new();
    for category in Category::ALL {
        match discover_modules(modules_root, category, config_artifact) {
            Ok(names) => {
                tracing::info!(category = %category, count = names.len(), "modules found");
                targets.extend(names.into_iter().map(|name| ModuleTarget::new(category, name)));
            }
            Err(e) => {
                tracing::error!(
                    category = %category,
                    error = %format!("{:#}", e),
                    "discovery failed"
                );
            }
        }
    }
    targets
}

pub fn has_secret_file(module_dir: &Path, secret_file: &str) -> bool {
    module_dir.join(secret_file).is_file()
}

/// Read a module's secret marker, trimmed. `None` if absent or unreadable.
pub fn reveal_secret(module_dir: &Path, secret_file: &str) -> Option<String> {
    let path = module_dir.join(secret_file);
    match fs::read_to_string(&path) {
        Ok(content) => Some(content.trim().to_string()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "secret not readable");
            None
        }
    }
}
