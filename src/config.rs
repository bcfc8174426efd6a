use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::fill::{DataMap, StyleOverride};
use crate::keys::FormData;

pub const CONFIG_FILE_NAME: &str = "docx-filler.toml";
pub const CONFIG_ENV_VAR: &str = "DOCX_FILLER_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub style: StyleSection,
    /// The fixed contract form. Validated before a batch when present.
    #[serde(default)]
    pub form: Option<FormData>,
    /// Free-form `key = "value"` placeholders, applied over the form.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct BatchSection {
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Name for the first template directly in `source_dir`.
    #[serde(default)]
    pub output_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StyleSection {
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub font_family: Option<String>,
}

impl AppConfig {
    /// Form values first, then `[data]` entries on top.
    pub fn data_map(&self) -> DataMap {
        let mut map = self
            .form
            .as_ref()
            .map(FormData::to_data_map)
            .unwrap_or_default();
        map.extend(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }

    pub fn style_override(&self) -> StyleOverride {
        StyleOverride {
            force_bold: self.style.bold.unwrap_or(false),
            force_italic: self.style.italic.unwrap_or(false),
            font_family: self
                .style
                .font_family
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        }
    }

    /// Relative batch folders are taken relative to the config file.
    pub fn resolve_paths(&mut self, config_path: &Path) {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        for dir in [&mut self.batch.source_dir, &mut self.batch.output_dir]
            .into_iter()
            .flatten()
        {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

/// `$DOCX_FILLER_CONFIG`, then `docx-filler.toml` upwards from the current
/// directory, then upwards from the executable.
pub fn find_default_config() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from) {
        if p.is_file() {
            return Some(p);
        }
        log::warn!("{CONFIG_ENV_VAR} points to a missing file: {}", p.display());
    }
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, CONFIG_FILE_NAME, 8) {
            return Some(p);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, CONFIG_FILE_NAME, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let mut cfg: AppConfig = toml::from_str(&text)
        .with_context(|| format!("parse config toml: {}", path.display()))?;
    cfg.resolve_paths(path);
    Ok(cfg)
}

const DEFAULT_CONFIG_TOML: &str = r#"# docx-filler configuration. Command line flags override these values.

[batch]
# source_dir = "templates"
# output_dir = "filled"
# Name for the first template found directly in source_dir (".docx" is added when missing).
# output_name = "Report"

[style]
# Applied to substituted text only.
bold = false
italic = false
# font_family = "Times New Roman"

# Contract form. When this section is present every object needs a name and a serial number.
# [form]
# object_desc = ""
# sub_contractor = ""
# sub_contractor_name = ""
# contractor = ""
# contractor_name = ""
# design_org = ""
# design_org_name = ""
# customer = ""
# customer_name = ""
# certification = ""
# design_doc = ""
# sub_contractor_co = ""
# contractor_co = ""
# design_co = ""
# customer_co = ""
#
# [[form.instances]]
# name = ""
# sr_num = ""
# (nine [[form.instances]] tables in total: object_name_1..9 / sr_num_1..9)

# Any other placeholders, {key} -> value. Overrides [form] values.
[data]
# code = "A-001"
"#;

/// Writes a commented default config into `dir`. An existing file is kept
/// unless `force` is set.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILE_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}
