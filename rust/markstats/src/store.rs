use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NAME_COLUMN: &str = "Name";
pub const MIN_MARK: i64 = 0;
pub const MAX_MARK: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: String,
    pub marks: HashMap<String, i64>,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marks: HashMap::new(),
        }
    }

    /// Pairs `subjects` with `marks` positionally. Extra marks are ignored.
    #[cfg(test)]
    pub fn with_marks(name: impl Into<String>, subjects: &[String], marks: &[i64]) -> Self {
        let mut record = Self::new(name);
        for (subject, mark) in subjects.iter().zip(marks.iter()) {
            record.marks.insert(subject.clone(), *mark);
        }
        record
    }

    pub fn mark(&self, subject: &str) -> Option<i64> {
        self.marks.get(subject).copied()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing Name column")]
    MissingNameColumn,

    #[error("line {line}: invalid mark {value:?} for {subject}")]
    BadMark {
        line: u64,
        subject: String,
        value: String,
    },
}

impl StoreError {
    /// True when the file exists but its contents can't be read as a table.
    /// Plain IO failures are not corruption and are never "repaired".
    pub fn is_corrupt(&self) -> bool {
        match self {
            StoreError::Io(_) => false,
            StoreError::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            StoreError::MissingNameColumn => true,
            StoreError::BadMark { .. } => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Recreated { backup: Option<PathBuf> },
    Migrated { added: Vec<String> },
    Ready,
}

struct LoadedTable {
    missing: Vec<String>,
    records: Vec<StudentRecord>,
}

/// Flat CSV table of student marks: `Name` followed by one column per subject.
/// Every mutation reloads and rewrites the whole file.
pub struct MarkStore {
    path: PathBuf,
    subjects: Vec<String>,
}

impl MarkStore {
    pub fn new(path: impl Into<PathBuf>, subjects: &[String]) -> Self {
        Self {
            path: path.into(),
            subjects: subjects.to_vec(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn header(&self) -> Vec<&str> {
        let mut cols = Vec::with_capacity(self.subjects.len() + 1);
        cols.push(NAME_COLUMN);
        cols.extend(self.subjects.iter().map(|s| s.as_str()));
        cols
    }

    pub fn initialize(&self) -> Result<InitOutcome, StoreError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.len() == 0 => {
                self.save(&[])?;
                return Ok(InitOutcome::Recreated { backup: None });
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.save(&[])?;
                log::info!("created {}", self.path.display());
                return Ok(InitOutcome::Created);
            }
            Err(e) => return Err(e.into()),
        }

        match self.read_table() {
            Ok(None) => {
                self.save(&[])?;
                Ok(InitOutcome::Recreated { backup: None })
            }
            Ok(Some(table)) => {
                self.save(&table.records)?;
                if table.missing.is_empty() {
                    Ok(InitOutcome::Ready)
                } else {
                    log::info!(
                        "added missing subject columns to {}: {}",
                        self.path.display(),
                        table.missing.join(", ")
                    );
                    Ok(InitOutcome::Migrated {
                        added: table.missing,
                    })
                }
            }
            Err(e) if e.is_corrupt() => {
                let backup = self.sibling(".bak");
                std::fs::copy(&self.path, &backup)?;
                log::warn!(
                    "{} is unreadable ({}); copied to {} and recreated",
                    self.path.display(),
                    e,
                    backup.display()
                );
                self.save(&[])?;
                Ok(InitOutcome::Recreated {
                    backup: Some(backup),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` when there is no table at all (file absent, empty, or headerless).
    pub fn read(&self) -> Result<Option<Vec<StudentRecord>>, StoreError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.len() == 0 => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        Ok(self.read_table()?.map(|t| t.records))
    }

    pub fn load(&self) -> Result<Vec<StudentRecord>, StoreError> {
        Ok(self.read()?.unwrap_or_default())
    }

    pub fn save(&self, records: &[StudentRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write the whole table next to the target, then swap it in.
        let temp_path = self.sibling(".tmp");
        {
            let mut wtr = csv::Writer::from_path(&temp_path)?;
            wtr.write_record(self.header())?;
            for r in records {
                let mut row: Vec<String> = Vec::with_capacity(self.subjects.len() + 1);
                row.push(r.name.clone());
                for s in &self.subjects {
                    row.push(r.mark(s).unwrap_or(0).to_string());
                }
                wtr.write_record(&row)?;
            }
            wtr.flush()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        log::debug!("saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Load, push, save. Returns the row count after the append.
    pub fn append(&self, record: StudentRecord) -> Result<usize, StoreError> {
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)?;
        Ok(records.len())
    }

    fn read_table(&self) -> Result<Option<LoadedTable>, StoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let headers = rdr.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Ok(None);
        }

        let name_idx = headers
            .iter()
            .position(|h| h.trim() == NAME_COLUMN)
            .ok_or(StoreError::MissingNameColumn)?;
        let subject_cols: Vec<(&String, Option<usize>)> = self
            .subjects
            .iter()
            .map(|s| (s, headers.iter().position(|h| h.trim() == s.as_str())))
            .collect();
        let missing: Vec<String> = subject_cols
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(s, _)| (*s).clone())
            .collect();

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let mut record = StudentRecord::new(row.get(name_idx).unwrap_or(""));
            for (subject, idx) in &subject_cols {
                let cell = idx.and_then(|i| row.get(i)).unwrap_or("");
                let Some(mark) = parse_mark(cell) else {
                    return Err(StoreError::BadMark {
                        line,
                        subject: (*subject).clone(),
                        value: cell.to_string(),
                    });
                };
                record.marks.insert((*subject).clone(), mark);
            }
            records.push(record);
        }

        Ok(Some(LoadedTable { missing, records }))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

/// Empty cells are 0. Integral floats (`80.0`) are accepted since other
/// spreadsheet tools write whole marks that way. Anything outside
/// `MIN_MARK..=MAX_MARK` is rejected.
fn parse_mark(cell: &str) -> Option<i64> {
    let t = cell.trim();
    if t.is_empty() {
        return Some(0);
    }
    let mark = match t.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = t.parse::<f64>().ok()?;
            if !(MIN_MARK as f64..=MAX_MARK as f64).contains(&f) || f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    (MIN_MARK..=MAX_MARK).contains(&mark).then_some(mark)
}
