use std::fmt;

pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct DisplayFn<F> {
        f: F,
    }
    impl<F> fmt::Display for DisplayFn<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.f)(formatter)
        }
    }
    DisplayFn { f }
}

/// Write the rows of a text table, padding every column to its widest cell.
pub fn write_columns(f: &mut fmt::Formatter<'_>, rows: &[Vec<String>]) -> fmt::Result {
    let ncols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; ncols];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    for row in rows {
        // trailing empty cells are omitted.
        let len = row.iter().rposition(|cell| !cell.is_empty()).map_or(0, |i| i + 1);
        let mut line = String::new();
        for (i, (cell, width)) in row[..len].iter().zip(&widths).enumerate() {
            if i > 0 {
                line.push_str(" | ");
            }
            line.push_str(cell);
            line.extend(std::iter::repeat(' ').take(width - cell.chars().count()));
        }
        writeln!(f, "{}", line.trim_end())?;
    }

    Ok(())
}
