//! Crate error type.

use thiserror::Error;

/// Errors raised by header planning, row encoding and workbook IO.
#[derive(Error, Debug)]
pub enum ExcelError {
    /// Invalid column declarations or options; raised before any sheet mutation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A converter rejected a value on the write path.
    #[error("conversion error in {record}.{field} (column {column}): {message}")]
    Conversion {
        /// Record schema name.
        record: String,
        /// Field name.
        field: String,
        /// Column index.
        column: usize,
        /// Converter message.
        message: String,
    },

    /// Header placement produced an invalid region.
    #[error("layout error: {0}")]
    Layout(String),

    /// Workbook engine failure.
    #[error("xlsx write error while {context}: {source}")]
    Xlsx {
        /// Operation being performed.
        context: String,
        /// Engine error.
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// Workbook parsing failure.
    #[error("xlsx read error while {context}: {source}")]
    Read {
        /// Operation being performed.
        context: String,
        /// Parser error.
        #[source]
        source: calamine::XlsxError,
    },

    /// Stream failure.
    #[error("io error while {context}: {source}")]
    Io {
        /// Operation being performed.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding failure.
    #[error("csv error while {context}: {source}")]
    Csv {
        /// Operation being performed.
        context: String,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
}

/// Result alias for this crate.
pub type ExcelResult<T> = Result<T, ExcelError>;

impl ExcelError {
    /// Wrap a workbook engine error with operation context.
    pub fn xlsx(context: impl Into<String>) -> impl FnOnce(rust_xlsxwriter::XlsxError) -> Self {
        let context = context.into();
        move |source| Self::Xlsx { context, source }
    }

    /// Wrap a workbook parser error with operation context.
    pub fn read(context: impl Into<String>) -> impl FnOnce(calamine::XlsxError) -> Self {
        let context = context.into();
        move |source| Self::Read { context, source }
    }

    /// Wrap a stream error with operation context.
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }

    /// Wrap a CSV error with operation context.
    pub fn csv(context: impl Into<String>) -> impl FnOnce(csv::Error) -> Self {
        let context = context.into();
        move |source| Self::Csv { context, source }
    }
}
