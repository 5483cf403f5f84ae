// src/report.rs

use crate::cli::{Format, OrderBy};
use crate::error::ReportError;
use crate::model::AuthorStats;
use std::cmp::Reverse;
use std::io::Write;

const HEADER: [&str; 4] = ["Name", "Lines", "Commits", "Files"];

/// Sorts descending by the chosen column, then by the remaining columns in
/// lines, commits, files order, then by name.
pub fn sort_stats(stats: &mut [AuthorStats], order: OrderBy) {
    stats.sort_by(|a, b| {
        let key = |s: &AuthorStats| match order {
            OrderBy::Lines => (s.lines, s.commits, s.files),
            OrderBy::Commits => (s.commits, s.lines, s.files),
            OrderBy::Files => (s.files, s.lines, s.commits),
        };
        Reverse(key(a))
            .cmp(&Reverse(key(b)))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn render<W: Write>(stats: &[AuthorStats], format: Format, out: &mut W) -> Result<(), ReportError> {
    match format {
        Format::Tabular => render_tabular(stats, out)?,
        Format::Csv => render_csv(stats, out)?,
        Format::Json => {
            serde_json::to_writer(&mut *out, stats)?;
            writeln!(out)?;
        }
        Format::JsonLines => {
            for row in stats {
                serde_json::to_writer(&mut *out, row)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn cells(row: &AuthorStats) -> [String; 4] {
    [
        row.name.clone(),
        row.lines.to_string(),
        row.commits.to_string(),
        row.files.to_string(),
    ]
}

fn render_tabular<W: Write>(stats: &[AuthorStats], out: &mut W) -> std::io::Result<()> {
    let rows: Vec<[String; 4]> = stats.iter().map(cells).collect();
    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut write_row = |row: [&str; 4]| -> std::io::Result<()> {
        let [name, lines, commits, files] = row;
        writeln!(
            out,
            "{name:<w0$} {lines:<w1$} {commits:<w2$} {files}",
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        )
    };
    write_row(HEADER)?;
    for row in &rows {
        write_row([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()])?;
    }
    Ok(())
}

fn render_csv<W: Write>(stats: &[AuthorStats], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", HEADER.join(","))?;
    for row in stats {
        let [name, lines, commits, files] = cells(row);
        writeln!(out, "{},{lines},{commits},{files}", csv_field(&name))?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
