//! Sheet-text normalizer.
//!
//! Produces the tab-separated form a spreadsheet export yields: one row per
//! line, cells joined by `\t`. Already tabular text passes through unchanged.

/// Normalizes raw sheet text into `processed_data`.
///
/// - `\r\n` and lone `\r` become `\n`
/// - every cell is trimmed of surrounding spaces
/// - rows with no non-empty cell are dropped
///
/// ```
/// assert_eq!(file_store::extract::sheet_text("A\tB\n1\t2"), "A\tB\n1\t2");
/// assert_eq!(file_store::extract::sheet_text(" A \t B\r\n\r\n1\t2\r\n"), "A\tB\n1\t2");
/// ```
pub fn sheet_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .split('\n')
        .filter_map(|row| {
            let cells: Vec<&str> = row.split('\t').map(|c| c.trim_matches(' ')).collect();
            if cells.iter().all(|c| c.trim().is_empty()) {
                None
            } else {
                Some(cells.join("\t"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabular_text_is_identity() {
        assert_eq!(sheet_text("A\tB\n1\t2"), "A\tB\n1\t2");
    }

    #[test]
    fn empty_cells_inside_a_row_are_kept() {
        assert_eq!(sheet_text("A\t\tC\n\t\t\n1\t\t3"), "A\t\tC\n1\t\t3");
    }

    #[test]
    fn crlf_and_padding_are_normalized() {
        assert_eq!(sheet_text("  name \t qty \r\n pen\t3 \r\n"), "name\tqty\npen\t3");
    }

    #[test]
    fn blank_input_yields_empty_string() {
        assert_eq!(sheet_text(" \n\r\n\t"), "");
    }
}
