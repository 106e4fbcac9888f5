//! Stateless helper utilities used by the writer and reader.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::error::{ExcelError, ExcelResult};
use crate::spec::{SpecCellRegion, SpecExtMsg, SpecExtMsgLayout, SpecValidationList};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Cast a zero-based row index to the engine's row type.
pub fn cast_row_num(value: usize) -> ExcelResult<u32> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(ExcelError::Layout(format!("row index overflow: {value}")));
    }
    u32::try_from(value).map_err(|_| ExcelError::Layout(format!("row index overflow: {value}")))
}

/// Cast a zero-based column index to the engine's column type.
pub fn cast_col_num(value: usize) -> ExcelResult<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(ExcelError::Layout(format!("column index overflow: {value}")));
    }
    u16::try_from(value)
        .map_err(|_| ExcelError::Layout(format!("column index overflow: {value}")))
}

/// Column letters for a zero-based column index (`0 -> "A"`, `27 -> "AB"`).
pub fn derive_column_letters(col: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col + 1;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_rem as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// A1 address for a zero-based `(row, col)`.
pub fn format_cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", derive_column_letters(col), row + 1)
}

/// Parse an A1 address (`"B3"`, `"$B$3"`) into zero-based `(row, col)`.
pub fn parse_cell_reference(cell_reference: &str) -> Option<(usize, usize)> {
    let c_ref = cell_reference.trim().replace('$', "");
    let n_split = c_ref.find(|ch: char| !ch.is_ascii_alphabetic())?;
    let (c_letters, c_digits) = c_ref.split_at(n_split);
    if c_letters.is_empty() || c_digits.is_empty() || !c_digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let mut n_col: usize = 0;
    for ch in c_letters.bytes() {
        let n_digit = usize::from(ch.to_ascii_uppercase() - b'A') + 1;
        n_col = n_col.checked_mul(26)?.checked_add(n_digit)?;
    }
    let n_row: usize = c_digits.parse().ok()?;
    if n_row == 0 {
        return None;
    }
    Some((n_row - 1, n_col - 1))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RangePlanning

/// Convert sorted indices to contiguous inclusive ranges.
pub fn derive_contiguous_ranges(sorted_indices: &[usize]) -> Vec<(usize, usize)> {
    if sorted_indices.is_empty() {
        return vec![];
    }

    let mut l_contiguous_ranges = Vec::new();
    let mut n_idx_start = sorted_indices[0];
    let mut n_idx_end = sorted_indices[0];

    for idx in &sorted_indices[1..] {
        if *idx == n_idx_end + 1 {
            n_idx_end = *idx;
        } else {
            l_contiguous_ranges.push((n_idx_start, n_idx_end));
            n_idx_start = *idx;
            n_idx_end = *idx;
        }
    }

    l_contiguous_ranges.push((n_idx_start, n_idx_end));
    l_contiguous_ranges
}

/// Coalesce per-cell validation registrations into column blocks.
///
/// `cells` holds `(row, col, values)`; cells of one column that share a list
/// and sit on consecutive rows become one registration.
pub fn plan_validation_lists(cells: &[(usize, usize, Arc<[String]>)]) -> Vec<SpecValidationList> {
    let mut dict_rows: BTreeMap<(usize, Arc<[String]>), Vec<usize>> = BTreeMap::new();
    for (row, col, values) in cells {
        dict_rows
            .entry((*col, Arc::clone(values)))
            .or_default()
            .push(*row);
    }

    let mut l_lists = Vec::new();
    for ((col, values), mut l_rows) in dict_rows {
        l_rows.sort_unstable();
        l_rows.dedup();
        for (row_start, row_end) in derive_contiguous_ranges(&l_rows) {
            l_lists.push(SpecValidationList {
                region: SpecCellRegion {
                    first_row: row_start,
                    last_row: row_end,
                    first_col: col,
                    last_col: col,
                },
                values: Arc::clone(&values),
            });
        }
    }
    l_lists.sort_by_key(|list| (list.region.first_col, list.region.first_row));
    l_lists
}

/// Placement of one auxiliary title/message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtMsgPlacement {
    /// Label cell.
    pub title: SpecCellRegion,
    /// Message block; a merge when the layout spans extra columns.
    pub msg: SpecCellRegion,
}

/// Lay out title/message pairs from `row_start`, `n_pairs_per_row` per row.
///
/// Returns the placements and the number of rows used.
pub fn plan_ext_msg_block(
    ext_msgs: &[SpecExtMsg],
    layout: &SpecExtMsgLayout,
    row_start: usize,
) -> (Vec<SpecExtMsgPlacement>, usize) {
    let n_per_row = layout.n_pairs_per_row.max(1);
    let n_cols_pair = 2 + layout.n_col_span;

    let l_placements = (0..ext_msgs.len())
        .map(|n_idx| {
            let n_row = row_start + n_idx / n_per_row;
            let n_col = (n_idx % n_per_row) * n_cols_pair;
            SpecExtMsgPlacement {
                title: SpecCellRegion::cell(n_row, n_col),
                msg: SpecCellRegion {
                    first_row: n_row,
                    last_row: n_row,
                    first_col: n_col + 1,
                    last_col: n_col + 1 + layout.n_col_span,
                },
            }
        })
        .collect();

    (l_placements, ext_msgs.len().div_ceil(n_per_row))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
