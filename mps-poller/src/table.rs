//! Plain text table: left aligned cells, two space gutter.

const GUTTER: &str = "  ";

/// Width of every column, counted in characters, header included.
pub fn column_widths<const N: usize, S: AsRef<str>>(rows: &[[S; N]]) -> [usize; N] {
    let mut widths = [0; N];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.as_ref().chars().count());
        }
    }
    widths
}

/// Render `rows` one per line; every cell is padded to its column width.
pub fn render<const N: usize, S: AsRef<str>>(rows: &[[S; N]]) -> String {
    let widths = column_widths(rows);
    let mut out = String::new();
    for row in rows {
        let line = row.iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = width))
            .collect::<Vec<_>>()
            .join(GUTTER);
        out.push_str(&line);
        out.push('\n');
    }
    out
}
