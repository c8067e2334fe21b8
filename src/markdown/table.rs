//! Tables have no structured representation on Telegra.ph, so they are
//! rendered as fixed-width text for a `pre`/`code` block.

use super::token::{Align, Table};

/// Render `table` as a pipe-delimited ASCII table, one `\n`-terminated line
/// per row, with a dash separator under the header.
pub fn render_ascii(table: &Table) -> String {
    let columns = table.header.len();
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| width(c))
                .chain(std::iter::once(width(&table.header[i])))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let align = |i: usize| table.align.get(i).copied().unwrap_or(Align::None);

    let mut out = String::new();
    push_row(&mut out, &table.header, &widths, &align);

    out.push_str("|-");
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&dashes.join("-|-"));
    out.push_str("-|\n");

    for row in &table.rows {
        push_row(&mut out, row, &widths, &align);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize], align: &dyn Fn(usize) -> Align) {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            pad(cell, *w, align(i))
        })
        .collect();
    out.push_str("| ");
    out.push_str(&padded.join(" | "));
    out.push_str(" |\n");
}

fn pad(cell: &str, target: usize, align: Align) -> String {
    let gap = target.saturating_sub(width(cell));
    match align {
        Align::Right => format!("{}{cell}", " ".repeat(gap)),
        Align::Center => {
            let left = gap / 2;
            format!("{}{cell}{}", " ".repeat(left), " ".repeat(gap - left))
        }
        Align::None | Align::Left => format!("{cell}{}", " ".repeat(gap)),
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}
