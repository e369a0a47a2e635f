use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Line-oriented terminal: prompts go out unterminated and flushed, answers
/// come back one line at a time. Generic so tests can script a session.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    /// `Ok(None)` once input is exhausted.
    pub fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            // Keep the transcript readable when stdin is a pipe.
            writeln!(self.output)?;
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}
