//! Workbook reader that scans a worksheet into typed records.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveTime;
use tracing::debug;

use crate::codec::RowDecoder;
use crate::conf::{C_FMT_DATE_DEFAULT, C_FMT_DATETIME_DEFAULT};
use crate::convert::ConverterRegistry;
use crate::error::{ExcelError, ExcelResult};
use crate::record::{ExcelRecord, SpecRecordSchema};
use crate::spec::{EnumSheetSelector, SpecReadOptions, SpecReadOutcome};
use crate::util::format_cell_reference;

/// Worksheet reader over an `.xlsx` source.
pub struct ExcelReader<RS: Read + Seek> {
    workbook: Xlsx<RS>,
}

impl ExcelReader<BufReader<File>> {
    /// Open a workbook file.
    pub fn open(path: impl AsRef<Path>) -> ExcelResult<Self> {
        let path = path.as_ref();
        let workbook: Xlsx<_> =
            open_workbook(path).map_err(ExcelError::read(format!("opening {}", path.display())))?;
        Ok(Self { workbook })
    }
}

impl<RS: Read + Seek> ExcelReader<RS> {
    /// Read a workbook from an in-memory or custom stream.
    pub fn from_reader(reader: RS) -> ExcelResult<Self> {
        let workbook = Xlsx::new(reader).map_err(ExcelError::read("parsing workbook"))?;
        Ok(Self { workbook })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// Decode the selected worksheet into records of `T`.
    pub fn read_table<T: ExcelRecord>(
        &mut self,
        options: &SpecReadOptions,
        registry: &mut ConverterRegistry,
    ) -> ExcelResult<SpecReadOutcome<T>> {
        let schema = T::schema();
        self.read_table_with_schema(&schema, options, registry)
    }

    /// Decode the selected worksheet using an explicit schema.
    ///
    /// The sheet is scanned row-major; wholly empty rows are skipped and each
    /// non-empty cell is fed to the decoder with its A1 address.
    pub fn read_table_with_schema<T: Default>(
        &mut self,
        schema: &SpecRecordSchema<T>,
        options: &SpecReadOptions,
        registry: &mut ConverterRegistry,
    ) -> ExcelResult<SpecReadOutcome<T>> {
        let c_sheet_name = self.derive_sheet_name(&options.sheet)?;
        let range = self
            .workbook
            .worksheet_range(&c_sheet_name)
            .map_err(ExcelError::read(format!("loading sheet {c_sheet_name:?}")))?;

        let mut decoder = RowDecoder::new(schema, registry, options.start_row)?;
        let (n_row_origin, n_col_origin) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        for (n_offset_row, row) in range.rows().enumerate() {
            let n_row = n_row_origin + n_offset_row;
            let l_cells: Vec<(usize, String)> = row
                .iter()
                .enumerate()
                .filter_map(|(n_offset_col, cell)| {
                    derive_cell_text(cell).map(|text| (n_col_origin + n_offset_col, text))
                })
                .collect();
            if l_cells.is_empty() {
                continue;
            }

            decoder.start_row(n_row);
            for (n_col, c_text) in &l_cells {
                decoder.cell(Some(&format_cell_reference(n_row, *n_col)), c_text);
            }
            decoder.end_row(n_row);
        }

        let outcome = decoder.finish();
        debug!(
            record = schema.name(),
            sheet = %c_sheet_name,
            n_records = outcome.records.len(),
            n_issues = outcome.issues.len(),
            "table read"
        );
        Ok(outcome)
    }

    fn derive_sheet_name(&self, selector: &EnumSheetSelector) -> ExcelResult<String> {
        let l_names = self.sheet_names();
        let c_name = match selector {
            EnumSheetSelector::Name(name) => l_names.iter().find(|val| *val == name).cloned(),
            EnumSheetSelector::Index(n_idx) => l_names.get(*n_idx).cloned(),
        };
        c_name.ok_or_else(|| {
            ExcelError::Configuration(format!(
                "sheet {selector:?} not found; workbook has {l_names:?}."
            ))
        })
    }
}

/// Cell text as seen by the decoder; `None` for empty cells.
fn derive_cell_text(cell: &Data) -> Option<String> {
    let c_text = match cell {
        Data::Empty => return None,
        Data::String(val) => val.clone(),
        Data::Int(val) => val.to_string(),
        Data::Float(val) => format_float_text(*val),
        Data::Bool(val) => val.to_string(),
        Data::DateTime(val) => match val.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => {
                dt.date().format(C_FMT_DATE_DEFAULT).to_string()
            }
            Some(dt) => dt.format(C_FMT_DATETIME_DEFAULT).to_string(),
            None => format_float_text(val.as_f64()),
        },
        Data::DateTimeIso(val) | Data::DurationIso(val) => val.clone(),
        Data::Error(err) => err.to_string(),
    };
    (!c_text.is_empty()).then_some(c_text)
}

/// Integral floats without a decimal point, others in shortest round-trip form.
fn format_float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
