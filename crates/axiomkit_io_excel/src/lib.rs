//! `axiomkit_io_excel` v1:
//! Typed record tables to and from Excel worksheets.
//!
//! Module layout:
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options
//! - `error`   : crate error type
//! - `header`  : multi-level header tree and placement plan
//! - `convert` : field converters and the converter registry
//! - `options` : validation-list sources
//! - `record`  : record schemas (column index to field accessors)
//! - `codec`   : row encoding (write path) and decoding (read path)
//! - `util`    : pure helper functions
//! - `writer`  : workbook writer (`rust_xlsxwriter`)
//! - `reader`  : worksheet reader (`calamine`)
//! - `export`  : CSV export
pub mod codec;
pub mod conf;
pub mod convert;
pub mod error;
pub mod export;
pub mod header;
pub mod options;
pub mod reader;
pub mod record;
pub mod spec;
pub mod util;
pub mod writer;

pub use codec::{RowDecoder, RowEncoder};
pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_OPTIONS_MAX,
    N_WIDTH_COLUMN_DEFAULT, TUP_EXCEL_ILLEGAL, derive_default_excel_formats,
};
pub use convert::{
    BooleanConverter, Converter, ConverterFactory, ConverterRegistry, DateConverter,
    DateTimeConverter, FloatConverter, IdentityConverter, IntegerConverter, MappingConverter,
};
pub use error::{ExcelError, ExcelResult};
pub use export::{write_table_csv, write_table_csv_with_schema};
pub use header::{HeaderNode, HeaderTree, plan_header};
pub use options::{OptionsRegistry, OptionsSource, StaticOptions};
pub use reader::ExcelReader;
pub use record::{ExcelRecord, SpecFieldBinding, SpecRecordSchema};
pub use spec::{
    EnumFieldType, EnumFieldValue, EnumSheetSelector, SpecCellFormat, SpecCellRegion,
    SpecColumn, SpecEncodedCell, SpecEncodedRow, SpecExcelReport, SpecExtMsg, SpecExtMsgLayout,
    SpecHeaderCell, SpecHeaderPlan, SpecReadIssue, SpecReadOptions, SpecReadOutcome,
    SpecStyleConfig, SpecTableOptions, SpecValidationList,
};
pub use util::{derive_contiguous_ranges, parse_cell_reference, sanitize_sheet_name};
pub use writer::ExcelWriter;
