//! Shared record-mapping specification models.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::conf::{N_WIDTH_COLUMN_DEFAULT, derive_default_style_config};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification, converted to a `rust_xlsxwriter::Format` at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

/// Per-table formats for the title row, header block and data cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStyleConfig {
    /// Title row format.
    pub fmt_title: SpecCellFormat,
    /// Header cell format.
    pub fmt_header: SpecCellFormat,
    /// Data cell format.
    pub fmt_cell: SpecCellFormat,
}

impl Default for SpecStyleConfig {
    fn default() -> Self {
        derive_default_style_config()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSpecification

/// Immutable per-field column metadata.
///
/// `title` is the header path from the outermost group down to the leaf
/// label, e.g. `["Region", "North", "Q1"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// Zero-based column index, unique per table.
    pub index: usize,
    /// Header title path (at least one segment).
    pub title: Vec<String>,
    /// Column width in character units; `0` selects the default width.
    pub width: u32,
    /// `chrono` pattern for date/date-time fields.
    pub date_format: Option<String>,
    /// Explicit converter reference registered in the converter registry.
    pub converter: Option<String>,
    /// Options source reference registered in the options registry.
    pub options: Option<String>,
    /// Header comment rendered as a cell note.
    pub comment: Option<String>,
}

impl SpecColumn {
    /// Create a column with default width and no format/converter/options.
    pub fn new<I, S>(index: usize, title: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index,
            title: title.into_iter().map(Into::into).collect(),
            width: 0,
            date_format: None,
            converter: None,
            options: None,
            comment: None,
        }
    }

    /// Set the declared width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the date/date-time pattern.
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }

    /// Set the explicit converter reference.
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    /// Set the options source reference.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Set the header comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Declared width, or [`N_WIDTH_COLUMN_DEFAULT`] when none is declared.
    pub fn effective_width(&self) -> u32 {
        if self.width > 0 {
            self.width
        } else {
            N_WIDTH_COLUMN_DEFAULT
        }
    }

    /// Leaf label (last title segment).
    pub fn leaf_title(&self) -> &str {
        self.title.last().map(String::as_str).unwrap_or_default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldValues

/// Declared field type used for converter resolution.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumFieldType {
    /// Plain text; never routed through the converter registry.
    Text,
    /// Boolean flag.
    Boolean,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// Calendar date.
    Date,
    /// Date and time without zone.
    DateTime,
    /// User-defined type tag.
    Custom(String),
}

impl EnumFieldType {
    /// Whether this type accepts a date/date-time pattern.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

/// Native field value exchanged between records and converters.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumFieldValue {
    /// Absent value; skipped on write.
    #[default]
    None,
    /// Text value.
    Text(String),
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Date value.
    Date(NaiveDate),
    /// Date-time value.
    DateTime(NaiveDateTime),
}

impl EnumFieldValue {
    /// Whether the value is absent.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrow text content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(val) => Some(val),
            _ => None,
        }
    }

    /// Take text content.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(val) => Some(val),
            _ => None,
        }
    }

    /// Boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(val) => Some(*val),
            _ => None,
        }
    }

    /// Integer content.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(val) => Some(*val),
            _ => None,
        }
    }

    /// Float content; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(val) => Some(*val),
            Self::Integer(val) => Some(*val as f64),
            _ => None,
        }
    }

    /// Date content.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(val) => Some(*val),
            _ => None,
        }
    }

    /// Date-time content.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(val) => Some(*val),
            _ => None,
        }
    }
}

impl fmt::Display for EnumFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Text(val) => write!(f, "{val}"),
            Self::Boolean(val) => write!(f, "{val}"),
            Self::Integer(val) => write!(f, "{val}"),
            Self::Float(val) => write!(f, "{val}"),
            Self::Date(val) => write!(f, "{val}"),
            Self::DateTime(val) => write!(f, "{val}"),
        }
    }
}

impl From<String> for EnumFieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for EnumFieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for EnumFieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for EnumFieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for EnumFieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for EnumFieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for EnumFieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<V: Into<EnumFieldValue>> From<Option<V>> for EnumFieldValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutSpecification

/// Rectangular cell block with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecCellRegion {
    /// First row (inclusive).
    pub first_row: usize,
    /// Last row (inclusive).
    pub last_row: usize,
    /// First column (inclusive).
    pub first_col: usize,
    /// Last column (inclusive).
    pub last_col: usize,
}

impl SpecCellRegion {
    /// Single-cell region.
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            first_row: row,
            last_row: row,
            first_col: col,
            last_col: col,
        }
    }

    /// Whether the region spans more than one cell.
    pub fn is_merge(&self) -> bool {
        self.last_row > self.first_row || self.last_col > self.first_col
    }

    /// Shift all rows down by `n_rows`.
    pub fn offset_rows(self, n_rows: usize) -> Self {
        Self {
            first_row: self.first_row + n_rows,
            last_row: self.last_row + n_rows,
            ..self
        }
    }

    /// Whether two regions share at least one cell.
    pub fn overlaps(&self, other: &SpecCellRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

/// One placed header cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHeaderCell {
    /// Label text.
    pub text: String,
    /// Occupied block, relative to the header block's first row.
    pub region: SpecCellRegion,
    /// Bound column index for leaf cells.
    pub column_index: Option<usize>,
    /// Leaf comment.
    pub comment: Option<String>,
}

/// Full header placement for one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecHeaderPlan {
    /// Header block height (longest title path).
    pub n_rows: usize,
    /// Cell writes in placement (pre-order) order.
    pub cells: Vec<SpecHeaderCell>,
    /// Merge instructions; single-cell regions are never included.
    pub merges: Vec<SpecCellRegion>,
    /// `(column index, width)` per leaf column.
    pub widths: Vec<(usize, u32)>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowCodecSpecification

/// One encoded data cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEncodedCell {
    /// Target column index.
    pub col: usize,
    /// Cell text.
    pub text: String,
}

/// Encoded data row plus its validation-list registrations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecEncodedRow {
    /// Non-null cells in column order.
    pub cells: Vec<SpecEncodedCell>,
    /// `(column index, allowed values)` for written cells with an options source.
    pub validations: Vec<(usize, Arc<[String]>)>,
}

/// Validation-list registration over a cell block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecValidationList {
    /// Covered cells.
    pub region: SpecCellRegion,
    /// Allowed values (at most [`crate::conf::N_OPTIONS_MAX`]).
    pub values: Arc<[String]>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableOptions

/// One title/message pair of the auxiliary block above the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtMsg {
    /// Label cell text.
    pub title: String,
    /// Value cell text.
    pub msg: String,
}

impl SpecExtMsg {
    /// Create a title/message pair.
    pub fn new(title: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            msg: msg.into(),
        }
    }
}

/// Grid layout of the auxiliary message block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecExtMsgLayout {
    /// Pairs per row.
    pub n_pairs_per_row: usize,
    /// Extra columns the message cell spans beyond its own.
    pub n_col_span: usize,
}

impl Default for SpecExtMsgLayout {
    fn default() -> Self {
        Self {
            n_pairs_per_row: 1,
            n_col_span: 0,
        }
    }
}

/// Per-table write options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTableOptions {
    /// Requested sheet name; sanitized and de-duplicated on write.
    pub sheet_name: String,
    /// Title written in row 0 and merged across all columns.
    pub head_title: Option<String>,
    /// Auxiliary title/message pairs written below the title.
    pub ext_msgs: Vec<SpecExtMsg>,
    /// Layout of `ext_msgs`.
    pub ext_msg_layout: SpecExtMsgLayout,
    /// Explicit first data row; defaults to the row right below the header.
    pub start_row: Option<usize>,
    /// Freeze panes below the header block.
    pub if_freeze_header: bool,
    /// Table formats.
    pub style: SpecStyleConfig,
}

impl Default for SpecTableOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet".to_string(),
            head_title: None,
            ext_msgs: Vec::new(),
            ext_msg_layout: SpecExtMsgLayout::default(),
            start_row: None,
            if_freeze_header: false,
            style: SpecStyleConfig::default(),
        }
    }
}

impl SpecTableOptions {
    /// Options for a named sheet with defaults elsewhere.
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Self::default()
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadOptions

/// Worksheet selector for reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumSheetSelector {
    /// Select by sheet name.
    Name(String),
    /// Select by zero-based sheet position.
    Index(usize),
}

/// Per-table read options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReadOptions {
    /// Worksheet to scan.
    pub sheet: EnumSheetSelector,
    /// Rows with a smaller index are never decoded.
    pub start_row: usize,
}

impl Default for SpecReadOptions {
    fn default() -> Self {
        Self {
            sheet: EnumSheetSelector::Index(0),
            start_row: 1,
        }
    }
}

/// Non-fatal read-time conversion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReadIssue {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
    /// Target field name.
    pub field: String,
    /// Raw cell text.
    pub text: String,
    /// Converter message.
    pub message: String,
}

/// Decoded records plus per-field failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecReadOutcome<T> {
    /// One record per decoded row, in row order.
    pub records: Vec<T>,
    /// Conversion failures; the affected fields kept their default value.
    pub issues: Vec<SpecReadIssue>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-table write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExcelReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Header block height.
    pub n_rows_header: usize,
    /// First data row.
    pub row_data_start: usize,
    /// Data rows written.
    pub n_rows_data: usize,
    /// Merge regions emitted (title, message block and header).
    pub n_merges: usize,
    /// Validation lists registered.
    pub n_validations: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecExcelReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
