use crate::calc::{self, StudentResult};
use crate::charts;
use crate::config::AppConfig;
use crate::console::Console;
use crate::entry;
use crate::report;
use crate::store::{InitOutcome, MarkStore, StudentRecord};
use anyhow::Context;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainChoice {
    AddStudent,
    Analyze,
    Exit,
}

impl MainChoice {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(MainChoice::AddStudent),
            "2" => Some(MainChoice::Analyze),
            "3" => Some(MainChoice::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisChoice {
    ViewAll,
    SubjectAverages,
    TopperDuller,
    ClassStats,
    Back,
}

impl AnalysisChoice {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(AnalysisChoice::ViewAll),
            "2" => Some(AnalysisChoice::SubjectAverages),
            "3" => Some(AnalysisChoice::TopperDuller),
            "4" => Some(AnalysisChoice::ClassStats),
            "5" => Some(AnalysisChoice::Back),
            _ => None,
        }
    }
}

/// Records and scores loaded once on entering the analysis menu.
struct AnalysisSession {
    records: Vec<StudentRecord>,
    results: Vec<StudentResult>,
}

enum Flow {
    Continue,
    Quit,
}

pub struct App<R, W> {
    config: AppConfig,
    store: MarkStore,
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> App<R, W> {
    pub fn new(config: AppConfig, console: Console<R, W>) -> Self {
        let store = MarkStore::new(config.data_file.clone(), &config.subjects);
        Self {
            config,
            store,
            console,
        }
    }

    /// Prepares the table, then loops on the main menu until Exit or end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.prepare_store()?;
        self.console.say("\nSTUDENT PERFORMANCE ANALYZER")?;

        loop {
            self.console.say("\nMAIN MENU")?;
            self.console.say("1. Add Student")?;
            self.console.say("2. Analyze Performance")?;
            self.console.say("3. Exit")?;
            let Some(raw) = self.console.prompt("Enter choice (1-3): ")? else {
                break;
            };

            match MainChoice::parse(&raw) {
                Some(MainChoice::AddStudent) => {
                    if !entry::add_student(&mut self.console, &self.store)? {
                        break;
                    }
                }
                Some(MainChoice::Analyze) => {
                    if let Flow::Quit = self.analyze()? {
                        break;
                    }
                }
                Some(MainChoice::Exit) => break,
                None => self.console.say("Invalid choice! Please enter 1-3")?,
            }
        }

        self.console.say("Exiting program...")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    fn prepare_store(&mut self) -> anyhow::Result<()> {
        match self.store.initialize() {
            Ok(InitOutcome::Recreated {
                backup: Some(backup),
            }) => {
                self.console.say(format_args!(
                    "Student data was unreadable; a copy was kept at {} and a new table was started.",
                    backup.display()
                ))?;
            }
            Ok(outcome) => log::debug!("store ready: {:?}", outcome),
            Err(e) => {
                // Carry on: every later read degrades to an empty table.
                log::warn!("could not prepare {}: {}", self.store.path().display(), e);
                self.console.say(format_args!(
                    "Could not prepare student data ({}); continuing without it.",
                    e
                ))?;
            }
        }
        Ok(())
    }

    fn open_session(&mut self) -> anyhow::Result<Option<AnalysisSession>> {
        let records = match self.store.read() {
            Ok(Some(records)) => records,
            Ok(None) => {
                self.console.say("No data found! Add students first.")?;
                return Ok(None);
            }
            Err(e) => {
                log::warn!("could not read {}: {}", self.store.path().display(), e);
                self.console.say(format_args!(
                    "Could not read student data ({}). No data found! Add students first.",
                    e
                ))?;
                return Ok(None);
            }
        };
        if records.is_empty() {
            self.console.say("No student records found!")?;
            return Ok(None);
        }

        let results = calc::score_students(&records, &self.config.subjects);
        Ok(Some(AnalysisSession { records, results }))
    }

    fn analyze(&mut self) -> anyhow::Result<Flow> {
        let Some(session) = self.open_session()? else {
            return Ok(Flow::Continue);
        };

        loop {
            self.console.say("\n--- Performance Analysis ---")?;
            self.console.say("1. View All Students")?;
            self.console.say("2. Subject-wise Averages")?;
            self.console.say("3. Find Topper and Duller")?;
            self.console.say("4. Class Statistics")?;
            self.console.say("5. Back to Main Menu")?;
            let Some(raw) = self.console.prompt("Enter choice (1-5): ")? else {
                return Ok(Flow::Quit);
            };

            let outcome = match AnalysisChoice::parse(&raw) {
                Some(AnalysisChoice::ViewAll) => self.view_all(&session),
                Some(AnalysisChoice::SubjectAverages) => self.subject_averages(&session),
                Some(AnalysisChoice::TopperDuller) => self.topper_duller(&session),
                Some(AnalysisChoice::ClassStats) => self.class_stats(&session),
                Some(AnalysisChoice::Back) => return Ok(Flow::Continue),
                None => {
                    self.console.say("Invalid choice! Please enter 1-5")?;
                    continue;
                }
            };

            // A failed action never leaves the submenu.
            if let Err(e) = outcome {
                log::warn!("analysis action failed: {:#}", e);
                self.console
                    .say(format_args!("An error occurred during analysis: {:#}", e))?;
            }
        }
    }

    fn view_all(&mut self, session: &AnalysisSession) -> anyhow::Result<()> {
        let table = report::student_table(&self.config.subjects, &session.results);
        self.console.say("\nAll Students:")?;
        self.console.say(table)?;
        Ok(())
    }

    fn subject_averages(&mut self, session: &AnalysisSession) -> anyhow::Result<()> {
        let averages = calc::subject_averages(&session.records, &self.config.subjects)?;
        let out = &self.config.subject_chart_file;
        charts::render_subject_averages(&averages, out)
            .with_context(|| format!("could not save {}", out.display()))?;

        self.console.say("\nSubject-wise Averages:")?;
        self.console.say(report::subject_averages_table(&averages))?;
        self.console
            .say(format_args!("Graph saved as '{}'", out.display()))?;
        Ok(())
    }

    fn topper_duller(&mut self, session: &AnalysisSession) -> anyhow::Result<()> {
        let top = calc::topper(&session.results)?;
        let low = calc::duller(&session.results)?;
        self.console.say(report::topper_duller(top, low))?;
        Ok(())
    }

    fn class_stats(&mut self, session: &AnalysisSession) -> anyhow::Result<()> {
        let summary = calc::class_summary(&session.records, &self.config.subjects)?;
        let out = &self.config.grade_chart_file;
        charts::render_grade_distribution(&summary.grade_counts, out)
            .with_context(|| format!("could not save {}", out.display()))?;

        self.console.say(report::class_statistics(&summary))?;
        self.console.say(format_args!(
            "Grade distribution chart saved as '{}'",
            out.display()
        ))?;
        Ok(())
    }
}
