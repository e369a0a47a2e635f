use crate::store::StudentRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Round to 2 decimals, exact ties to even (`70.125` -> `70.12`).
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

/// Lower bounds, highest first. Anything below the last bound is an F.
const GRADE_THRESHOLDS: [(f64, Grade); 6] = [
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (70.0, Grade::BPlus),
    (60.0, Grade::B),
    (50.0, Grade::C),
    (40.0, Grade::D),
];

impl Grade {
    pub fn from_percentage(percentage: f64) -> Grade {
        GRADE_THRESHOLDS
            .iter()
            .find(|(min, _)| percentage >= *min)
            .map(|(_, g)| *g)
            .unwrap_or(Grade::F)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn no_students() -> Self {
        Self::new("no_students", "no students to analyze")
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub name: String,
    /// Marks in subject order; absent subjects read as 0.
    pub marks: Vec<i64>,
    pub percentage: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub class_average: f64,
    pub class_grade: Grade,
    pub highest_subject_average: f64,
    pub lowest_subject_average: f64,
    pub grade_counts: Vec<GradeCount>,
}

/// Overall percentage across all subjects, 2 decimals. A record missing any
/// subject is reported and scores 0.0 rather than failing the whole class.
pub fn percentage(record: &StudentRecord, subjects: &[String]) -> f64 {
    if subjects.is_empty() {
        return 0.0;
    }
    let mut total: i64 = 0;
    for s in subjects {
        let Some(mark) = record.mark(s) else {
            log::warn!("missing subject data for {}", record.name);
            return 0.0;
        };
        total += mark;
    }
    round_off_2_decimals((total as f64 / (subjects.len() as f64 * 100.0)) * 100.0)
}

pub fn grade(percentage: f64) -> Grade {
    Grade::from_percentage(percentage)
}

pub fn score_students(records: &[StudentRecord], subjects: &[String]) -> Vec<StudentResult> {
    records
        .iter()
        .map(|r| {
            let p = percentage(r, subjects);
            StudentResult {
                name: r.name.clone(),
                marks: subjects.iter().map(|s| r.mark(s).unwrap_or(0)).collect(),
                percentage: p,
                grade: grade(p),
            }
        })
        .collect()
}

pub fn subject_averages(
    records: &[StudentRecord],
    subjects: &[String],
) -> Result<Vec<SubjectAverage>, CalcError> {
    if records.is_empty() {
        return Err(CalcError::no_students());
    }
    let n = records.len() as f64;
    Ok(subjects
        .iter()
        .map(|s| {
            let sum: i64 = records.iter().map(|r| r.mark(s).unwrap_or(0)).sum();
            SubjectAverage {
                subject: s.clone(),
                average: round_off_2_decimals(sum as f64 / n),
            }
        })
        .collect())
}

pub fn class_average(results: &[StudentResult]) -> Result<f64, CalcError> {
    if results.is_empty() {
        return Err(CalcError::no_students());
    }
    let sum: f64 = results.iter().map(|r| r.percentage).sum();
    Ok(round_off_2_decimals(sum / results.len() as f64))
}

/// Highest percentage. On ties the earliest stored student wins.
pub fn topper(results: &[StudentResult]) -> Result<&StudentResult, CalcError> {
    pick_first_by(results, |candidate, best| candidate > best)
}

/// Lowest percentage. On ties the earliest stored student wins.
pub fn duller(results: &[StudentResult]) -> Result<&StudentResult, CalcError> {
    pick_first_by(results, |candidate, best| candidate < best)
}

// Only a strictly better value replaces the current pick.
fn pick_first_by(
    results: &[StudentResult],
    better: impl Fn(f64, f64) -> bool,
) -> Result<&StudentResult, CalcError> {
    let mut iter = results.iter();
    let Some(mut best) = iter.next() else {
        return Err(CalcError::no_students());
    };
    for r in iter {
        if better(r.percentage, best.percentage) {
            best = r;
        }
    }
    Ok(best)
}

/// Count per grade present, ordered alphabetically by label.
pub fn grade_counts(results: &[StudentResult]) -> Vec<GradeCount> {
    let mut counts: HashMap<Grade, usize> = HashMap::new();
    for r in results {
        *counts.entry(r.grade).or_insert(0) += 1;
    }
    let mut out: Vec<GradeCount> = counts
        .into_iter()
        .map(|(grade, count)| GradeCount { grade, count })
        .collect();
    out.sort_by(|a, b| a.grade.label().cmp(b.grade.label()));
    out
}

pub fn class_summary(
    records: &[StudentRecord],
    subjects: &[String],
) -> Result<ClassSummary, CalcError> {
    let results = score_students(records, subjects);
    let class_avg = class_average(&results)?;
    let averages = subject_averages(records, subjects)?;

    let highest = averages
        .iter()
        .map(|a| a.average)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);
    let lowest = averages
        .iter()
        .map(|a| a.average)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);

    Ok(ClassSummary {
        class_average: class_avg,
        class_grade: grade(class_avg),
        highest_subject_average: highest,
        lowest_subject_average: lowest,
        grade_counts: grade_counts(&results),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects() -> Vec<String> {
        ["Machine Learning", "UHV", "DMGT", "DBMS", "OT", "ES"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn student(name: &str, marks: &[i64]) -> StudentRecord {
        StudentRecord::with_marks(name, &subjects(), marks)
    }

    #[test]
    fn round_off_keeps_two_decimals() {
        assert_eq!(round_off_2_decimals(0.0), 0.0);
        assert_eq!(round_off_2_decimals(81.16666), 81.17);
        assert_eq!(round_off_2_decimals(33.333333), 33.33);
        assert_eq!(round_off_2_decimals(70.0), 70.0);
    }

    #[test]
    fn round_off_sends_exact_ties_to_even() {
        assert_eq!(round_off_2_decimals(70.125), 70.12);
        assert_eq!(round_off_2_decimals(70.375), 70.38);
        assert_eq!(round_off_2_decimals(0.125), 0.12);
        assert_eq!(round_off_2_decimals(-0.125), -0.12);
    }

    #[test]
    fn averages_round_ties_to_even() {
        let subs = vec!["Math".to_string()];
        let mut records: Vec<StudentRecord> = (0..7)
            .map(|i| StudentRecord::with_marks(format!("S{}", i), &subs, &[70]))
            .collect();
        records.push(StudentRecord::with_marks("S7", &subs, &[71]));

        let per_subject = subject_averages(&records, &subs).expect("subject averages");
        assert_eq!(per_subject[0].average, 70.12);

        let results = score_students(&records, &subs);
        assert_eq!(class_average(&results).expect("class average"), 70.12);
    }

    #[test]
    fn grade_boundaries_are_inclusive_lower_bounds() {
        let cases = [
            (100.0, "A+"),
            (90.0, "A+"),
            (89.99, "A"),
            (80.0, "A"),
            (70.0, "B+"),
            (60.0, "B"),
            (50.0, "C"),
            (40.0, "D"),
            (39.99, "F"),
            (0.0, "F"),
        ];
        for (p, expected) in cases {
            assert_eq!(grade(p).label(), expected, "percentage {}", p);
        }
    }

    #[test]
    fn percentage_matches_formula_for_any_marks() {
        let subs = subjects();
        let samples: [[i64; 6]; 5] = [
            [0, 0, 0, 0, 0, 0],
            [100, 100, 100, 100, 100, 100],
            [87, 92, 45, 66, 71, 100],
            [1, 2, 3, 4, 5, 6],
            [99, 0, 50, 33, 67, 12],
        ];
        for marks in samples {
            let sum: i64 = marks.iter().sum();
            let expected = ((sum as f64 / (6.0 * 100.0)) * 100.0 * 100.0).round() / 100.0;
            let r = student("x", &marks);
            assert_eq!(percentage(&r, &subs), expected, "marks {:?}", marks);

            let mut reversed = marks;
            reversed.reverse();
            let r2 = student("y", &reversed);
            assert_eq!(percentage(&r2, &subs), expected);
        }
    }

    #[test]
    fn percentage_is_zero_when_a_subject_is_absent() {
        let subs = subjects();
        let mut r = student("Gap", &[90, 90, 90, 90, 90, 90]);
        r.marks.remove("DBMS");
        assert_eq!(percentage(&r, &subs), 0.0);

        let results = score_students(&[r], &subs);
        assert_eq!(results[0].percentage, 0.0);
        assert_eq!(results[0].grade, Grade::F);
        assert_eq!(results[0].marks[3], 0);
    }

    #[test]
    fn two_student_scenario() {
        let subs = subjects();
        let records = vec![student("A", &[80; 6]), student("B", &[60; 6])];
        let results = score_students(&records, &subs);

        assert_eq!(results[0].percentage, 80.0);
        assert_eq!(results[0].grade, Grade::A);
        assert_eq!(results[1].percentage, 60.0);
        assert_eq!(results[1].grade, Grade::B);

        let avg = class_average(&results).expect("class average");
        assert_eq!(avg, 70.0);
        assert_eq!(grade(avg), Grade::BPlus);

        let per_subject = subject_averages(&records, &subs).expect("subject averages");
        assert_eq!(per_subject.len(), 6);
        assert!(per_subject.iter().all(|a| a.average == 70.0));
        assert_eq!(per_subject[0].subject, "Machine Learning");

        assert_eq!(topper(&results).expect("topper").name, "A");
        assert_eq!(duller(&results).expect("duller").name, "B");
    }

    #[test]
    fn extrema_ties_go_to_first_stored() {
        let subs = subjects();
        let records = vec![
            student("Mid", &[50; 6]),
            student("TopFirst", &[90; 6]),
            student("LowFirst", &[10; 6]),
            student("TopSecond", &[90; 6]),
            student("LowSecond", &[10; 6]),
        ];
        let results = score_students(&records, &subs);
        assert_eq!(topper(&results).expect("topper").name, "TopFirst");
        assert_eq!(duller(&results).expect("duller").name, "LowFirst");

        let same = score_students(&[student("One", &[70; 6]), student("Two", &[70; 6])], &subs);
        assert_eq!(topper(&same).expect("topper").name, "One");
        assert_eq!(duller(&same).expect("duller").name, "One");
    }

    #[test]
    fn empty_input_is_reported_as_no_students() {
        let subs = subjects();
        assert_eq!(
            subject_averages(&[], &subs).expect_err("empty").code,
            "no_students"
        );
        assert_eq!(class_average(&[]).expect_err("empty").code, "no_students");
        assert_eq!(topper(&[]).expect_err("empty").code, "no_students");
        assert_eq!(duller(&[]).expect_err("empty").code, "no_students");
        assert_eq!(class_summary(&[], &subs).expect_err("empty").code, "no_students");
        assert!(grade_counts(&[]).is_empty());
    }

    #[test]
    fn grade_counts_sort_by_label() {
        let subs = subjects();
        let records = vec![
            student("f", &[10; 6]),
            student("a+", &[95; 6]),
            student("b", &[65; 6]),
            student("a", &[85; 6]),
            student("a+ again", &[100; 6]),
            student("b+", &[75; 6]),
        ];
        let counts = grade_counts(&score_students(&records, &subs));
        let labels: Vec<(&str, usize)> = counts.iter().map(|c| (c.grade.label(), c.count)).collect();
        assert_eq!(
            labels,
            vec![("A", 1), ("A+", 2), ("B", 1), ("B+", 1), ("F", 1)]
        );
    }

    #[test]
    fn class_summary_reports_subject_extremes() {
        let subs = subjects();
        let records = vec![
            student("p", &[100, 40, 70, 70, 70, 70]),
            student("q", &[90, 20, 70, 70, 70, 70]),
        ];
        let summary = class_summary(&records, &subs).expect("summary");
        assert_eq!(summary.highest_subject_average, 95.0);
        assert_eq!(summary.lowest_subject_average, 30.0);
        assert_eq!(summary.class_average, 67.5);
        assert_eq!(summary.class_grade, Grade::B);
        // p is 70.0 (B+), q is 65.0 (B)
        let labels: Vec<&str> = summary.grade_counts.iter().map(|c| c.grade.label()).collect();
        assert_eq!(labels, vec!["B", "B+"]);
    }

    #[test]
    fn calc_error_serializes_without_empty_details() {
        let e = CalcError::no_students();
        let v = serde_json::to_value(&e).expect("serialize");
        assert_eq!(v["code"], "no_students");
        assert!(v.get("details").is_none());
        assert_eq!(
            serde_json::to_value(Grade::APlus).expect("serialize grade"),
            serde_json::json!("A+")
        );
    }
}
