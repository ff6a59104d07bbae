//! `doofconfig.json` reader (SPEC_FULL.md §10.3), generalized from the
//! teacher's `cli.rs` commented-out `tsrsonfig.json` handling and
//! `CompilerOptions` struct.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompilerError, CompilerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Cpp,
    Js,
    Ts,
    Vm,
}

impl std::str::FromStr for Target {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" => Ok(Target::Cpp),
            "js" => Ok(Target::Js),
            "ts" => Ok(Target::Ts),
            "vm" => Ok(Target::Vm),
            other => Err(CompilerError::UnknownTarget(other.to_string())),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::Cpp
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub emit_header: bool,
    #[serde(default = "default_true")]
    pub emit_source: bool,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub allow_top_level_statements: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_roots: vec![PathBuf::from(".")],
            target: Target::default(),
            out_dir: None,
            emit_header: true,
            emit_source: true,
            namespace: None,
            allow_top_level_statements: false,
        }
    }
}

impl ProjectConfig {
    pub fn load(path: &Path) -> CompilerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CompilerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CompilerError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn write_default(path: &Path) -> CompilerResult<()> {
        let config = ProjectConfig::default();
        let text = serde_json::to_string_pretty(&config).expect("default config always serializable");
        std::fs::write(path, text).map_err(|source| CompilerError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Derive the canonical dotted module name for a file relative to
    /// the nearest configured source root (spec §4.4): non-identifier
    /// characters become `_`, a leading digit is prefixed with `_`.
    pub fn module_name_for(&self, file: &Path) -> String {
        let relative = self
            .source_roots
            .iter()
            .filter_map(|root| file.strip_prefix(root).ok())
            .max_by_key(|p| p.as_os_str().len())
            .unwrap_or(file);

        let mut stem = relative.with_extension("");
        if stem.as_os_str().is_empty() {
            stem = file.with_extension("");
        }
        let dotted: Vec<String> = stem
            .components()
            .map(|c| sanitize_segment(&c.as_os_str().to_string_lossy()))
            .collect();
        dotted.join(".")
    }
}

fn sanitize_segment(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_sanitizes_non_identifier_chars() {
        let cfg = ProjectConfig {
            source_roots: vec![PathBuf::from("src")],
            ..ProjectConfig::default()
        };
        let name = cfg.module_name_for(Path::new("src/my-widget.doof"));
        assert_eq!(name, "my_widget");
    }

    #[test]
    fn module_name_prefixes_leading_digit() {
        let cfg = ProjectConfig {
            source_roots: vec![PathBuf::from("src")],
            ..ProjectConfig::default()
        };
        let name = cfg.module_name_for(Path::new("src/2d.doof"));
        assert_eq!(name, "_2d");
    }

    #[test]
    fn target_parses_case_insensitively() {
        assert_eq!("CPP".parse::<Target>().unwrap(), Target::Cpp);
        assert!("cobol".parse::<Target>().is_err());
    }
}
