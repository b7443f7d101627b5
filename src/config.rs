//! Run configuration, loaded from a TOML manifest.
//!
//! ```toml
//! [header]
//! path = "include/meshly.h"
//! includes = ["include"]
//! defines = [{ name = "MSH_EXPORT", value = "" }]
//!
//! [targets.fortran]
//! output = "bindings/fortran/generated"
//!
//! [targets.python]
//! output = "bindings/python/meshly"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct Manifest {
    header: HeaderSection,
    #[serde(default)]
    targets: TargetsSection,
}

#[derive(Debug, Deserialize)]
struct HeaderSection {
    path: PathBuf,
    #[serde(default)]
    includes: Vec<PathBuf>,
    #[serde(default)]
    defines: Vec<Define>,
    cpp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Define {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetsSection {
    pub fortran: Option<TargetOutput>,
    pub python: Option<TargetOutput>,
}

impl TargetsSection {
    pub fn available(&self) -> Vec<&'static str> {
        let mut targets = Vec::new();
        if self.fortran.is_some() {
            targets.push("fortran");
        }
        if self.python.is_some() {
            targets.push("python");
        }
        targets
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetOutput {
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub header: PathBuf,
    pub includes: Vec<PathBuf>,
    pub defines: Vec<Define>,
    /// Preprocessor executable; anything accepting `-E -I -D` works.
    pub cpp: String,
    pub targets: TargetsSection,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest: Manifest = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Config {
            header: manifest.header.path,
            includes: manifest.header.includes,
            defines: manifest.header.defines,
            cpp: manifest.header.cpp.unwrap_or_else(|| "gcc".to_string()),
            targets: manifest.targets,
        })
    }
}
