use crate::calc::{ClassSummary, StudentResult, SubjectAverage};
use comfy_table::{presets::ASCII_MARKDOWN, Cell, CellAlignment, Row, Table};

/// Whole numbers keep one decimal (`80.0`); everything else prints as rounded.
pub fn display_number(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn student_table(subjects: &[String], results: &[StudentResult]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);

    let mut header: Vec<String> = Vec::with_capacity(subjects.len() + 3);
    header.push("Name".to_string());
    header.extend(subjects.iter().cloned());
    header.push("Percentage".to_string());
    header.push("Grade".to_string());
    table.set_header(header);

    for r in results {
        let mut row = Row::new();
        row.add_cell(Cell::new(&r.name).set_alignment(CellAlignment::Left));
        for m in &r.marks {
            row.add_cell(right(m));
        }
        row.add_cell(right(display_number(r.percentage)));
        row.add_cell(right(r.grade));
        table.add_row(row);
    }

    table.to_string()
}

pub fn subject_averages_table(averages: &[SubjectAverage]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);
    table.set_header(vec!["Subject", "Average"]);
    for a in averages {
        let mut row = Row::new();
        row.add_cell(Cell::new(&a.subject));
        row.add_cell(right(display_number(a.average)));
        table.add_row(row);
    }
    table.to_string()
}

fn performer_block(title: &str, r: &StudentResult) -> String {
    format!(
        "\n--- {} ---\nName: {}\nPercentage: {}%\nGrade: {}",
        title,
        r.name,
        display_number(r.percentage),
        r.grade
    )
}

pub fn topper_duller(topper: &StudentResult, duller: &StudentResult) -> String {
    let mut out = performer_block("TOPPER", topper);
    out.push('\n');
    out.push_str(&performer_block("DULLER", duller));
    out
}

pub fn class_statistics(summary: &ClassSummary) -> String {
    format!(
        "\nClass Average Percentage: {}%\nClass Overall Grade: {}\nHighest Subject Average: {}\nLowest Subject Average: {}",
        display_number(summary.class_average),
        summary.class_grade,
        display_number(summary.highest_subject_average),
        display_number(summary.lowest_subject_average)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{self, Grade};
    use crate::store::StudentRecord;

    fn subjects() -> Vec<String> {
        vec!["Math".to_string(), "Physics".to_string()]
    }

    #[test]
    fn display_number_keeps_one_decimal_for_whole_values() {
        assert_eq!(display_number(80.0), "80.0");
        assert_eq!(display_number(0.0), "0.0");
        assert_eq!(display_number(81.17), "81.17");
        assert_eq!(display_number(67.5), "67.5");
    }

    #[test]
    fn student_table_lists_rows_in_stored_order() {
        let subs = subjects();
        let records = vec![
            StudentRecord::with_marks("Zed", &subs, &[91, 89]),
            StudentRecord::with_marks("Amy", &subs, &[40, 45]),
        ];
        let results = calc::score_students(&records, &subs);
        let text = student_table(&subs, &results);

        let header = text.lines().next().expect("header line");
        for col in ["Name", "Math", "Physics", "Percentage", "Grade"] {
            assert!(header.contains(col), "missing {} in {}", col, header);
        }
        let zed = text.find("Zed").expect("Zed row");
        let amy = text.find("Amy").expect("Amy row");
        assert!(zed < amy);
        assert!(text.contains("90.0"));
        assert!(text.contains("42.5"));
        assert!(text.contains("A+"));
        assert!(text.contains(" D "));
    }

    #[test]
    fn topper_duller_block_format() {
        let top = StudentResult {
            name: "Ada".to_string(),
            marks: vec![],
            percentage: 80.0,
            grade: Grade::A,
        };
        let low = StudentResult {
            name: "Bo".to_string(),
            marks: vec![],
            percentage: 33.33,
            grade: Grade::F,
        };
        let text = topper_duller(&top, &low);
        assert!(text.contains("--- TOPPER ---\nName: Ada\nPercentage: 80.0%\nGrade: A"));
        assert!(text.contains("--- DULLER ---\nName: Bo\nPercentage: 33.33%\nGrade: F"));
    }

    #[test]
    fn class_statistics_lines() {
        let subs = subjects();
        let records = vec![
            StudentRecord::with_marks("A", &subs, &[80, 80]),
            StudentRecord::with_marks("B", &subs, &[60, 60]),
        ];
        let summary = calc::class_summary(&records, &subs).expect("summary");
        let text = class_statistics(&summary);
        assert!(text.contains("Class Average Percentage: 70.0%"));
        assert!(text.contains("Class Overall Grade: B+"));
        assert!(text.contains("Highest Subject Average: 70.0"));
        assert!(text.contains("Lowest Subject Average: 70.0"));
    }

    #[test]
    fn subject_averages_table_has_every_subject() {
        let averages = vec![
            SubjectAverage {
                subject: "Math".to_string(),
                average: 72.5,
            },
            SubjectAverage {
                subject: "Physics".to_string(),
                average: 60.0,
            },
        ];
        let text = subject_averages_table(&averages);
        assert!(text.contains("Math"));
        assert!(text.contains("72.5"));
        assert!(text.contains("60.0"));
    }
}
