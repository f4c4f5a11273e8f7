use std::fmt::Write as _;

use crate::preview::RowObjects;

const ELLIPSIS: char = '…';

/// Renders preview rows as aligned plain-text columns.
///
/// Cells wider than `max_width` characters are cut and suffixed with an
/// ellipsis; `0` disables truncation.
pub fn render_table(objects: &RowObjects, max_width: usize) -> String {
    let header_cells = objects
        .columns
        .iter()
        .map(|c| fit_cell(c, max_width))
        .collect::<Vec<_>>();
    let body = objects
        .rows
        .iter()
        .map(|row| {
            (0..header_cells.len())
                .map(|idx| fit_cell(row.get(idx).map(String::as_str).unwrap_or(""), max_width))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut widths = header_cells
        .iter()
        .map(|cell| cell.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in &body {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        let padding = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat_n(' ', padding));
    }
    line.truncate(line.trim_end().len());
    line
}

fn fit_cell(value: &str, max_width: usize) -> String {
    let flattened = value.replace(['\r', '\n', '\t'], " ");
    if max_width == 0 || flattened.chars().count() <= max_width {
        return flattened;
    }
    let mut cut = flattened
        .chars()
        .take(max_width.saturating_sub(1))
        .collect::<String>();
    cut.push(ELLIPSIS);
    cut
}
