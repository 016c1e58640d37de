//! A1-notation helpers and the JSON shape returned by `gsheets_read`.

use crate::drive::ValueRange;
use serde::Serialize;

/// One cell with its absolute A1 location.
#[derive(Debug, Serialize)]
pub(crate) struct Cell {
    value: serde_json::Value,
    location: String,
}

/// The values of one range, annotated for the agent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetRange {
    sheet_name: String,
    range: String,
    total_rows: usize,
    total_columns: usize,
    data: Vec<Vec<Cell>>,
}

/// Column letters for a zero-based index: 0 → `A`, 26 → `AA`.
pub(crate) fn column_name(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Zero-based index for column letters, `None` if `letters` is not purely alphabetic.
pub(crate) fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |acc, b| {
        b.is_ascii_alphabetic()
            .then(|| acc * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1)
    })
    .map(|n| n - 1)
}

/// A1 range covering a whole sheet: the title quoted, inner quotes doubled.
pub(crate) fn whole_sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Split `Sheet1!B2:D9` into the sheet name and the zero-based start cell.
///
/// Missing parts default to the first row or column.
fn range_origin(range: &str) -> (String, usize, usize) {
    let (sheet, cells) = match range.rsplit_once('!') {
        Some((sheet, cells)) => (sheet.trim_matches('\'').replace("''", "'"), cells),
        None => (String::new(), range),
    };
    let start = cells.split(':').next().unwrap_or_default();
    let digits_at = start.find(|c: char| c.is_ascii_digit()).unwrap_or(start.len());
    let (letters, digits) = start.split_at(digits_at);
    let col = column_index(letters).unwrap_or(0);
    let row = digits.parse::<usize>().map(|r| r.saturating_sub(1)).unwrap_or(0);
    (sheet, col, row)
}

/// Annotate each non-empty range with cell locations.
pub(crate) fn annotate(ranges: Vec<ValueRange>) -> Vec<SheetRange> {
    ranges
        .into_iter()
        .filter(|r| !r.values.is_empty())
        .map(|r| {
            let (sheet_name, col0, row0) = range_origin(&r.range);
            let total_columns = r.values.iter().map(Vec::len).max().unwrap_or(0);
            let data = r
                .values
                .into_iter()
                .enumerate()
                .map(|(i, row)| {
                    row.into_iter()
                        .enumerate()
                        .map(|(j, value)| Cell {
                            value,
                            location: format!("{}{}", column_name(col0 + j), row0 + i + 1),
                        })
                        .collect()
                })
                .collect::<Vec<Vec<Cell>>>();
            SheetRange {
                sheet_name,
                range: r.range,
                total_rows: data.len(),
                total_columns,
                data,
            }
        })
        .collect()
}
