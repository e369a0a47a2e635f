use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "markstats.json";

pub const DEFAULT_SUBJECTS: [&str; 6] = ["Machine Learning", "UHV", "DMGT", "DBMS", "OT", "ES"];
pub const DEFAULT_DATA_FILE: &str = "student_data.csv";
pub const DEFAULT_SUBJECT_CHART_FILE: &str = "subject_averages.svg";
pub const DEFAULT_GRADE_CHART_FILE: &str = "grade_distribution.svg";

/// Everything the store, metrics and reports need to know about a markbook:
/// which subjects exist (in column order) and where files live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub subjects: Vec<String>,
    pub data_file: PathBuf,
    pub subject_chart_file: PathBuf,
    pub grade_chart_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subjects: DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect(),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            subject_chart_file: PathBuf::from(DEFAULT_SUBJECT_CHART_FILE),
            grade_chart_file: PathBuf::from(DEFAULT_GRADE_CHART_FILE),
        }
    }
}

impl AppConfig {
    /// Best-effort: a missing, unreadable or invalid `markstats.json` must not
    /// prevent the program from starting. Defaults are used instead.
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Self::default().rooted_at(dir);
        }
        match Self::load(&path) {
            Ok(cfg) => {
                log::info!("loaded configuration from {}", path.display());
                cfg.rooted_at(dir)
            }
            Err(e) => {
                log::warn!("ignoring {}: {:#}", path.display(), e);
                Self::default().rooted_at(dir)
            }
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subjects.is_empty() {
            return Err(anyhow!("subjects must not be empty"));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for s in &self.subjects {
            let t = s.trim();
            if t.is_empty() {
                return Err(anyhow!("subject names must not be blank"));
            }
            if t == crate::store::NAME_COLUMN {
                return Err(anyhow!(
                    "'{}' is reserved for the student name column",
                    crate::store::NAME_COLUMN
                ));
            }
            if !seen.insert(t) {
                return Err(anyhow!("duplicate subject: {}", t));
            }
        }
        Ok(())
    }

    /// Resolve relative file locations against `dir`. Absolute paths are kept.
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        self.data_file = dir.join(&self.data_file);
        self.subject_chart_file = dir.join(&self.subject_chart_file);
        self.grade_chart_file = dir.join(&self.grade_chart_file);
        self
    }
}
