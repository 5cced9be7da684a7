use std::fmt::Write;

use anyhow::Result;

use crate::{bench::TargetRuns, config::BenchmarkCase};

/// Minimum width of every column.
const COLUMN_WIDTH: usize = 14;
const COLUMN_PADDING: &str = "  ";

/// Widest cell of each column, header included, but never below
/// `COLUMN_WIDTH`.
fn column_widths(rows: &[Vec<String>]) -> Vec<usize> {
  let columns = rows.iter().map(Vec::len).max().unwrap_or(0);

  (0..columns)
    .map(|col| {
      rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(String::len)
        .chain([COLUMN_WIDTH])
        .max()
        .unwrap_or(COLUMN_WIDTH)
    })
    .collect()
}

/// The first column is left aligned, the rest right aligned.
fn format_row(row: &[String], widths: &[usize]) -> String {
  row
    .iter()
    .zip(widths)
    .enumerate()
    .map(|(i, (col, &width))| {
      if i == 0 {
        format!("{col:<width$}")
      } else {
        format!("{col:>width$}")
      }
    })
    .collect::<Vec<_>>()
    .join(COLUMN_PADDING)
}

/// Writes `header` and `rows` as an aligned table, with a `=` rule under the
/// header.
fn write_table(table: &mut String, header: Vec<String>, rows: Vec<Vec<String>>) -> Result<()> {
  let mut all = vec![header];
  all.extend(rows);

  let widths = column_widths(&all);
  let mut rows = all.iter();

  if let Some(header) = rows.next() {
    let header = format_row(header, &widths);
    writeln!(table, "{header}\n{}", "=".repeat(header.len()))?;
  }
  for row in rows {
    writeln!(table, "{}", format_row(row, &widths))?;
  }

  Ok(())
}

/// Lists the benchmark cases with their expected scores.
pub fn format_cases(cases: &[BenchmarkCase]) -> Result<String> {
  let mut table = String::new();

  let header = vec!["sequence".to_string(), "expected".to_string()];
  let rows = cases
    .iter()
    .map(|case| vec![case.sequence.clone(), case.expected_score.to_string()])
    .collect();

  write_table(&mut table, header, rows)?;

  Ok(table)
}

/// One row per case, one column per target. Cells hold `score (duration)` as
/// reported, or the kind of failure.
pub fn format(cases: &[BenchmarkCase], results: &[TargetRuns]) -> Result<String> {
  let mut table = String::new();

  for (i, target) in results.iter().enumerate() {
    writeln!(table, "[{i}] {}", target.target.name())?;
  }
  writeln!(table)?;

  let header = ["sequence".to_string(), "expected".to_string()]
    .into_iter()
    .chain((0..results.len()).map(|i| format!("[{i}]")))
    .collect::<Vec<_>>();

  let rows = cases
    .iter()
    .enumerate()
    .map(|(row, case)| {
      [case.sequence.clone(), case.expected_score.to_string()]
        .into_iter()
        .chain(results.iter().map(|r| match r.runs.get(row) {
          Some(Ok(run)) => format!("{} ({})", run.score, run.duration),
          Some(Err(err)) => err.label().to_string(),
          None => "-".to_string(),
        }))
        .collect::<Vec<_>>()
    })
    .collect();

  write_table(&mut table, header, rows)?;

  Ok(table)
}
