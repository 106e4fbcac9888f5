//! CSV export of record tables.

use std::io::Write;

use csv::WriterBuilder;
use tracing::debug;

use crate::codec::RowEncoder;
use crate::convert::ConverterRegistry;
use crate::error::{ExcelError, ExcelResult};
use crate::options::OptionsRegistry;
use crate::record::{ExcelRecord, SpecRecordSchema};

/// Separator between title path segments in the CSV header line.
pub const C_CSV_TITLE_SEPARATOR: &str = "/";

/// Write `records` as CSV: one header line, then one line per record.
///
/// Returns the number of data lines written.
pub fn write_table_csv<T: ExcelRecord, W: Write>(
    writer: W,
    records: &[T],
    registry: &mut ConverterRegistry,
    options: &OptionsRegistry,
) -> ExcelResult<usize> {
    let schema = T::schema();
    write_table_csv_with_schema(writer, &schema, records, registry, options)
}

/// [`write_table_csv`] with an explicit schema.
///
/// Columns span `0..=max index`; indices without a field and absent values
/// become empty fields.
pub fn write_table_csv_with_schema<T, W: Write>(
    writer: W,
    schema: &SpecRecordSchema<T>,
    records: &[T],
    registry: &mut ConverterRegistry,
    options: &OptionsRegistry,
) -> ExcelResult<usize> {
    let encoder = RowEncoder::new(schema, registry, options)?;
    let n_cols = schema.max_column_index().map_or(0, |n_idx| n_idx + 1);

    let mut l_header = vec![String::new(); n_cols];
    for field in schema.fields() {
        l_header[field.column.index] = field.column.title.join(C_CSV_TITLE_SEPARATOR);
    }

    let mut csv_writer = WriterBuilder::new().flexible(false).from_writer(writer);
    csv_writer
        .write_record(&l_header)
        .map_err(ExcelError::csv("writing header line"))?;

    for record in records {
        let row = encoder.encode_row(record)?;
        let mut l_fields = vec![String::new(); n_cols];
        for cell in row.cells {
            l_fields[cell.col] = cell.text;
        }
        csv_writer
            .write_record(&l_fields)
            .map_err(ExcelError::csv("writing data line"))?;
    }

    csv_writer
        .flush()
        .map_err(ExcelError::io("flushing csv output"))?;
    debug!(record = schema.name(), n_records = records.len(), "csv table written");
    Ok(records.len())
}
