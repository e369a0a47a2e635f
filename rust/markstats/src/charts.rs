use crate::calc::{GradeCount, SubjectAverage};
use crate::report::display_number;
use anyhow::{anyhow, Context};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

/// Slice colors, reused in order when there are more grades than colors.
const GRADE_PALETTE: [RGBColor; 6] = [
    RGBColor(0x4C, 0xAF, 0x50),
    RGBColor(0x8B, 0xC3, 0x4A),
    RGBColor(0xFF, 0xC1, 0x07),
    RGBColor(0xFF, 0x98, 0x00),
    RGBColor(0xFF, 0x57, 0x22),
    RGBColor(0xF4, 0x43, 0x36),
];

const PIE_START_ANGLE: f64 = 140.0;

/// Bar per subject, in the order given, with the average written above it.
pub fn render_subject_averages(averages: &[SubjectAverage], out: &Path) -> anyhow::Result<()> {
    if averages.is_empty() {
        return Err(anyhow!("no subject averages to plot"));
    }

    let root = SVGBackend::new(out, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = averages
        .iter()
        .map(|a| a.average)
        .fold(100.0_f64, f64::max)
        * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Subject-wise Average Marks", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d((0..averages.len()).into_segmented(), 0.0..y_max)
        .context("failed to lay out subject chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Average Marks")
        .x_labels(averages.len())
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => averages
                .get(*i)
                .map(|a| a.subject.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .context("failed to draw subject chart axes")?;

    chart
        .draw_series(averages.iter().enumerate().map(|(i, a)| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), a.average),
                ],
                SKY_BLUE.filled(),
            );
            bar.set_margin(0, 0, 12, 12);
            bar
        }))
        .context("failed to draw subject bars")?;

    let value_style = TextStyle::from(("sans-serif", 14).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(averages.iter().enumerate().map(|(i, a)| {
            Text::new(
                display_number(a.average),
                (SegmentValue::CenterOf(i), a.average),
                value_style.clone(),
            )
        }))
        .context("failed to annotate subject bars")?;

    root.present()
        .with_context(|| format!("failed to write {}", out.display()))?;
    log::debug!("wrote subject chart to {}", out.display());
    Ok(())
}

/// `<grade> (<share>%)` with the share to one decimal place.
pub fn slice_labels(counts: &[GradeCount]) -> Vec<String> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    counts
        .iter()
        .map(|c| {
            let share = if total > 0 {
                100.0 * c.count as f64 / total as f64
            } else {
                0.0
            };
            format!("{} ({:.1}%)", c.grade, share)
        })
        .collect()
}

/// Slice per grade present, sized by head count.
pub fn render_grade_distribution(counts: &[GradeCount], out: &Path) -> anyhow::Result<()> {
    if counts.is_empty() {
        return Err(anyhow!("no grades to plot"));
    }

    let root = SVGBackend::new(out, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let title_style = TextStyle::from(("sans-serif", 28).into_font()).color(&BLACK);
    let area = root
        .titled("Grade Distribution", title_style)
        .context("failed to draw pie title")?;

    let dims = area.dim_in_pixel();
    let center = (dims.0 as i32 / 2, dims.1 as i32 / 2);
    let radius = f64::from(dims.0.min(dims.1)) * 0.35;
    let sizes: Vec<f64> = counts.iter().map(|c| c.count as f64).collect();
    let colors: Vec<RGBColor> = (0..counts.len())
        .map(|i| GRADE_PALETTE[i % GRADE_PALETTE.len()])
        .collect();
    let labels = slice_labels(counts);

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(PIE_START_ANGLE);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    area.draw(&pie).context("failed to draw pie")?;

    root.present()
        .with_context(|| format!("failed to write {}", out.display()))?;
    log::debug!("wrote grade chart to {}", out.display());
    Ok(())
}
