//! Configuration loading for Explorae.
//! Reads the file given by `--config` / EXPLORAE_CONFIG, else explorae.toml
//! from the current directory, else built-in defaults. Resolved once at
//! startup and handed to the components that need it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use explorae_common::ExploraeError;
use explorae_scoring::{AffinityEstimator, ArtifactLocator, ContactScorer, RunLayout};
use explorae_store::{SheetSelector, StoreOptions};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "explorae.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub affinity: AffinityConfig,
    /// Directory that relative paths in the file resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Single-character field separator; inferred from the extension if unset.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Worksheet of an `.xlsx` store: zero-based position or name.
    #[serde(default)]
    pub sheet: SheetSelector,
}

fn default_id_column() -> String { "jobs".to_string() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { id_column: default_id_column(), delimiter: None, sheet: SheetSelector::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_ranking_file")]
    pub ranking_file: String,
    #[serde(default = "default_structure_template")]
    pub structure_template: String,
    #[serde(default = "default_data_template")]
    pub data_template: String,
}

fn default_ranking_file()       -> String { "ranking_debug.json".to_string() }
fn default_structure_template() -> String { "unrelaxed_{model}.pdb".to_string() }
fn default_data_template()      -> String { "result_{model}.pkl".to_string() }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            ranking_file: default_ranking_file(),
            structure_template: default_structure_template(),
            data_template: default_data_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_script")]
    pub script: PathBuf,
    #[serde(default = "default_cutoff")]
    pub pae_cutoff: u32,
    #[serde(default = "default_cutoff")]
    pub dist_cutoff: u32,
}

fn default_interpreter() -> String  { "python3".to_string() }
fn default_script()      -> PathBuf { PathBuf::from("ipsae.py") }
fn default_cutoff()      -> u32     { 10 }

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_script(),
            pae_cutoff: default_cutoff(),
            dist_cutoff: default_cutoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Program and fixed leading arguments.
    #[serde(default = "default_affinity_command")]
    pub command: Vec<String>,
    /// Forces PRODIGY to print the Kd; empty disables it.
    #[serde(default = "default_verbose_flag")]
    pub verbose_flag: String,
}

fn default_affinity_command() -> Vec<String> { vec!["prodigy".to_string()] }
fn default_verbose_flag()     -> String      { "--showall".to_string() }

impl Default for AffinityConfig {
    fn default() -> Self {
        Self { command: default_affinity_command(), verbose_flag: default_verbose_flag() }
    }
}


impl Config {
    /// Pick the configuration source. An explicitly requested file must
    /// exist; the implicit explorae.toml is optional.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Self::from_file(path);
        }

        let implicit = cwd.join(DEFAULT_CONFIG_FILE);
        if implicit.exists() {
            return Self::from_file(&implicit);
        }

        Ok(Self { base_dir: cwd.to_path_buf(), ..Self::default() })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExploraeError> {
        if self.store.id_column.is_empty() {
            return Err(ExploraeError::Config("store.id_column must not be empty".to_string()));
        }
        if self.affinity.command.is_empty() {
            return Err(ExploraeError::Config("affinity.command must name a program".to_string()));
        }
        self.delimiter()?;
        Ok(())
    }

    fn delimiter(&self) -> Result<Option<u8>, ExploraeError> {
        match self.store.delimiter.as_deref() {
            None => Ok(None),
            Some(d) if d.len() == 1 => Ok(Some(d.as_bytes()[0])),
            Some(d) => Err(ExploraeError::Config(format!(
                "store.delimiter must be a single ASCII character, got {:?}",
                d
            ))),
        }
    }

    pub fn store_options(&self) -> Result<StoreOptions, ExploraeError> {
        Ok(StoreOptions {
            id_column: self.store.id_column.clone(),
            delimiter: self.delimiter()?,
            sheet: self.store.sheet.clone(),
        })
    }

    /// ipSAE script location, relative paths taken from the config's directory.
    pub fn script_path(&self) -> PathBuf {
        if self.contact.script.is_absolute() {
            self.contact.script.clone()
        } else {
            self.base_dir.join(&self.contact.script)
        }
    }

    pub fn locator(&self) -> ArtifactLocator {
        ArtifactLocator::new(RunLayout {
            ranking_file: self.layout.ranking_file.clone(),
            structure_template: self.layout.structure_template.clone(),
            data_template: self.layout.data_template.clone(),
        })
    }

    pub fn contact_scorer(&self) -> ContactScorer {
        ContactScorer::new(
            &self.contact.interpreter,
            self.script_path(),
            self.contact.pae_cutoff,
            self.contact.dist_cutoff,
        )
    }

    pub fn affinity_estimator(&self) -> AffinityEstimator {
        let flag = Some(self.affinity.verbose_flag.clone()).filter(|f| !f.is_empty());
        AffinityEstimator::new(self.affinity.command.clone(), flag)
    }
}
