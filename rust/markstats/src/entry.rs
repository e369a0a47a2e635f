use crate::console::Console;
use crate::store::{MarkStore, StudentRecord, MAX_MARK, MIN_MARK};
use anyhow::Context;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkInput {
    Valid(i64),
    NotANumber,
    OutOfRange(i64),
}

pub fn parse_mark_input(raw: &str) -> MarkInput {
    match raw.trim().parse::<i64>() {
        Ok(v) if (MIN_MARK..=MAX_MARK).contains(&v) => MarkInput::Valid(v),
        Ok(v) => MarkInput::OutOfRange(v),
        Err(_) => MarkInput::NotANumber,
    }
}

/// Asks until a mark in range is given. `Ok(None)` only when input runs out.
pub fn read_mark<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    subject: &str,
) -> std::io::Result<Option<i64>> {
    let label = format!("Enter {} marks (out of 100): ", subject);
    loop {
        let Some(raw) = console.prompt(&label)? else {
            return Ok(None);
        };
        match parse_mark_input(&raw) {
            MarkInput::Valid(v) => return Ok(Some(v)),
            MarkInput::OutOfRange(v) => {
                log::debug!("rejected mark {} for {}", v, subject);
                console.say("Marks should be between 0 and 100!")?
            }
            MarkInput::NotANumber => console.say("Please enter a valid number!")?,
        }
    }
}

/// Collects one student interactively. Nothing is returned if input ends
/// part way through, so a half-entered student is never stored.
pub fn collect_student<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    subjects: &[String],
) -> std::io::Result<Option<StudentRecord>> {
    console.say("\n--- Add Student ---")?;
    let Some(name) = console.prompt("Enter student name: ")? else {
        return Ok(None);
    };

    let mut record = StudentRecord::new(name);
    for subject in subjects {
        let Some(mark) = read_mark(console, subject)? else {
            return Ok(None);
        };
        record.marks.insert(subject.clone(), mark);
    }
    Ok(Some(record))
}

/// Menu action: collect a student and append it to the table.
/// Returns false when input ended before the student was complete.
pub fn add_student<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    store: &MarkStore,
) -> anyhow::Result<bool> {
    let Some(record) = collect_student(console, store.subjects())? else {
        log::info!("input closed during student entry; nothing saved");
        return Ok(false);
    };

    let name = record.name.clone();
    match store.append(record) {
        Ok(count) => {
            log::debug!("appended {:?}; table now has {} rows", name, count);
            console.say("Student added successfully!")?;
        }
        Err(e) => {
            log::warn!("append to {} failed: {}", store.path().display(), e);
            console
                .say(format_args!("Could not save student: {}", e))
                .context("failed to write to console")?;
        }
    }
    Ok(true)
}
