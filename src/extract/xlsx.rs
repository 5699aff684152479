//! Excel workbooks: cached cell values of every sheet, row by row.
//!
//! Rows are read from A1 to the end of the used range, so leading empty rows and
//! columns still produce separators. Cells are joined by a single space and each
//! row ends with a newline.

use crate::error::ExtractError;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::path::Path;
use tracing::debug;

pub(crate) fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let mut text = String::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        debug!(sheet = %name, rows = range.height(), "reading sheet");
        push_sheet(&mut text, &range);
    }
    Ok(text)
}

fn push_sheet(text: &mut String, range: &Range<Data>) {
    let (Some((first_row, first_col)), Some((_, last_col))) = (range.start(), range.end()) else {
        // An empty sheet still reports a single empty row.
        text.push('\n');
        return;
    };
    let width = last_col as usize + 1;

    for _ in 0..first_row {
        text.push_str(&" ".repeat(width - 1));
        text.push('\n');
    }
    for row in range.rows() {
        let cells: Vec<String> = std::iter::repeat(String::new())
            .take(first_col as usize)
            .chain(row.iter().map(cell_text))
            .collect();
        text.push_str(&cells.join(" "));
        text.push('\n');
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}
