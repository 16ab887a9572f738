use pods_core::skeleton::WriteOutcome;
use serde::Serialize;
use std::path::Path;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:w$}"))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

/// `  created: path` / `  exists:  path`, relative to `root`.
pub fn print_outcomes(root: &Path, outcomes: &[WriteOutcome]) {
    for outcome in outcomes {
        let (label, path) = match outcome {
            WriteOutcome::Created(p) => ("created:", p),
            WriteOutcome::Kept(p) => ("exists: ", p),
        };
        let shown = path.strip_prefix(root).unwrap_or(path);
        println!("  {label} {}", shown.display());
    }
}
