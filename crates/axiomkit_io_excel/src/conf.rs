//! Excel constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{SpecCellFormat, SpecStyleConfig};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Column width (character units) used when a column declares none.
pub const N_WIDTH_COLUMN_DEFAULT: u32 = 16;
/// Upper bound on the allowed values of one validation list.
pub const N_OPTIONS_MAX: usize = 100;
/// Title row height in points.
pub const N_HEIGHT_TITLE_ROW: f64 = 50.0;

/// Default `chrono` pattern for date fields.
pub const C_FMT_DATE_DEFAULT: &str = "%Y-%m-%d";
/// Default `chrono` pattern for date-time fields.
pub const C_FMT_DATETIME_DEFAULT: &str = "%Y-%m-%d %H:%M:%S";

/// Error box shown when a cell value is not in its validation list.
pub const C_VALIDATION_ERROR_TITLE: &str = "Invalid value";
/// Error message shown when a cell value is not in its validation list.
pub const C_VALIDATION_ERROR_MESSAGE: &str = "Please select a value from the drop-down list.";

/// Build default named format presets used by [`crate::writer::ExcelWriter`].
pub fn derive_default_excel_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Times New Roman".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert("cell".to_string(), cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        "header".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            text_wrap: Some(true),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "title".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            font_size: Some(16),
            bold: Some(true),
            border: Some(0),
            align: Some("center".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Build default per-table style configuration from the named presets.
pub fn derive_default_style_config() -> SpecStyleConfig {
    let dict_fmt = derive_default_excel_formats();
    let take = |key: &str| dict_fmt.get(key).cloned().unwrap_or_default();
    SpecStyleConfig {
        fmt_title: take("title"),
        fmt_header: take("header"),
        fmt_cell: take("cell"),
    }
}
