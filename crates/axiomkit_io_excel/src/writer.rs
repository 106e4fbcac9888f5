//! Workbook writer that lays out typed record tables as worksheets.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use rust_xlsxwriter::{
    DataValidation, Format, FormatAlign, FormatBorder, Note, Workbook, Worksheet,
};
use tracing::debug;

use crate::codec::RowEncoder;
use crate::conf::{
    C_VALIDATION_ERROR_MESSAGE, C_VALIDATION_ERROR_TITLE, N_HEIGHT_TITLE_ROW,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NROWS_EXCEL_MAX,
};
use crate::convert::ConverterRegistry;
use crate::error::{ExcelError, ExcelResult};
use crate::header::plan_header;
use crate::options::OptionsRegistry;
use crate::record::{ExcelRecord, SpecRecordSchema};
use crate::spec::{
    SpecCellFormat, SpecCellRegion, SpecEncodedRow, SpecExcelReport, SpecTableOptions,
};
use crate::util::{
    cast_col_num, cast_row_num, plan_ext_msg_block, plan_validation_lists, sanitize_sheet_name,
};

/// Stateful workbook writer.
///
/// Every [`Self::write_table`] call appends one worksheet; the workbook is
/// buffered in memory until [`Self::close`] or [`Self::save_to_buffer`].
pub struct ExcelWriter {
    path_file_out: Option<PathBuf>,
    workbook: Workbook,
    set_sheet_keys_existing: BTreeSet<String>,
    l_reports: Vec<SpecExcelReport>,
    if_closed: bool,
}

impl ExcelWriter {
    /// Create writer bound to an output path.
    pub fn new(path_file_out: impl Into<PathBuf>) -> Self {
        Self {
            path_file_out: Some(path_file_out.into()),
            ..Self::new_in_memory()
        }
    }

    /// Create writer without an output path; use [`Self::save_to_buffer`].
    pub fn new_in_memory() -> Self {
        Self {
            path_file_out: None,
            workbook: Workbook::new(),
            set_sheet_keys_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string, empty for in-memory writers.
    pub fn file_out(&self) -> String {
        self.path_file_out
            .as_ref()
            .map(|path| path.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Return immutable snapshot of per-table write reports.
    pub fn report(&self) -> Vec<SpecExcelReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> ExcelResult<()> {
        if self.if_closed {
            return Ok(());
        }
        let path_file_out = self.path_file_out.as_ref().ok_or_else(|| {
            ExcelError::Configuration("in-memory writer has no output path.".to_string())
        })?;
        self.workbook
            .save(path_file_out)
            .map_err(ExcelError::xlsx(format!("saving {}", path_file_out.display())))?;
        self.if_closed = true;
        debug!(path = %path_file_out.display(), n_tables = self.l_reports.len(), "workbook saved");
        Ok(())
    }

    /// Serialize the workbook to bytes.
    pub fn save_to_buffer(&mut self) -> ExcelResult<Vec<u8>> {
        self.workbook
            .save_to_buffer()
            .map_err(ExcelError::xlsx("saving workbook to buffer"))
    }

    /// Write `records` as one table on a new worksheet.
    pub fn write_table<T: ExcelRecord>(
        &mut self,
        records: &[T],
        registry: &mut ConverterRegistry,
        options: &OptionsRegistry,
        table: &SpecTableOptions,
    ) -> ExcelResult<SpecExcelReport> {
        let schema = T::schema();
        self.write_table_with_schema(&schema, records, registry, options, table)
    }

    /// Write `records` as one table, using an explicit schema.
    ///
    /// Configuration and conversion errors surface before the worksheet is
    /// added, so a failed table leaves the workbook unchanged.
    pub fn write_table_with_schema<T>(
        &mut self,
        schema: &SpecRecordSchema<T>,
        records: &[T],
        registry: &mut ConverterRegistry,
        options: &OptionsRegistry,
        table: &SpecTableOptions,
    ) -> ExcelResult<SpecExcelReport> {
        if self.if_closed {
            return Err(ExcelError::Configuration(
                "writer is closed; no further tables can be written.".to_string(),
            ));
        }
        debug!(record = schema.name(), sheet = %table.sheet_name, n_records = records.len(), "writing table");

        schema.validate()?;
        let plan = plan_header(&schema.columns())?;
        let encoder = RowEncoder::new(schema, registry, options)?;
        let n_cols_total = schema.max_column_index().map_or(1, |n_idx| n_idx + 1);

        // Row layout: title, message block plus spacer, header, data.
        let mut n_row_cursor = 0usize;
        let if_title = table.head_title.is_some();
        if if_title {
            n_row_cursor += 1;
        }
        let (l_ext_placements, n_rows_ext) =
            plan_ext_msg_block(&table.ext_msgs, &table.ext_msg_layout, n_row_cursor);
        if n_rows_ext > 0 {
            n_row_cursor += n_rows_ext + 1;
        }
        let row_header_start = n_row_cursor;
        let row_header_end = row_header_start + plan.n_rows;
        let row_data_start = table.start_row.unwrap_or(row_header_end);
        if row_data_start < row_header_end {
            return Err(ExcelError::Configuration(format!(
                "start_row {row_data_start} overlaps the header block ending at row {}.",
                row_header_end.saturating_sub(1)
            )));
        }
        if row_data_start + records.len() > N_NROWS_EXCEL_MAX {
            return Err(ExcelError::Configuration(format!(
                "{} records from row {row_data_start} exceed the worksheet row limit.",
                records.len()
            )));
        }

        let l_encoded = records
            .iter()
            .map(|record| encoder.encode_row(record))
            .collect::<ExcelResult<Vec<SpecEncodedRow>>>()?;

        let mut report = SpecExcelReport {
            sheet_name: String::new(),
            n_rows_header: plan.n_rows,
            row_data_start,
            n_rows_data: l_encoded.len(),
            ..Default::default()
        };

        let fmt_title = derive_rust_xlsx_format(&table.style.fmt_title);
        let fmt_header = derive_rust_xlsx_format(&table.style.fmt_header);
        let fmt_cell = derive_rust_xlsx_format(&table.style.fmt_cell);

        let mut worksheet = Worksheet::new();

        if let Some(c_title) = &table.head_title {
            worksheet
                .set_row_height(0, N_HEIGHT_TITLE_ROW)
                .map_err(ExcelError::xlsx("sizing title row"))?;
            let region = SpecCellRegion {
                first_row: 0,
                last_row: 0,
                first_col: 0,
                last_col: n_cols_total - 1,
            };
            report.n_merges += write_region(&mut worksheet, &region, c_title, &fmt_title)?;
        }

        for (placement, ext_msg) in l_ext_placements.iter().zip(&table.ext_msgs) {
            write_region(&mut worksheet, &placement.title, &ext_msg.title, &fmt_header)?;
            report.n_merges += write_region(&mut worksheet, &placement.msg, &ext_msg.msg, &fmt_cell)?;
        }

        for cell in &plan.cells {
            let region = cell.region.offset_rows(row_header_start);
            report.n_merges += write_region(&mut worksheet, &region, &cell.text, &fmt_header)?;
            if let Some(c_comment) = &cell.comment {
                worksheet
                    .insert_note(
                        cast_row_num(region.first_row)?,
                        cast_col_num(region.first_col)?,
                        &Note::new(c_comment),
                    )
                    .map_err(ExcelError::xlsx("inserting header note"))?;
            }
        }

        for (n_col, n_width) in &plan.widths {
            worksheet
                .set_column_width(cast_col_num(*n_col)?, *n_width)
                .map_err(ExcelError::xlsx("setting column width"))?;
        }

        let mut l_validation_cells: Vec<(usize, usize, Arc<[String]>)> = Vec::new();
        for (n_offset, row) in l_encoded.iter().enumerate() {
            let n_row = row_data_start + n_offset;
            for cell in &row.cells {
                worksheet
                    .write_string_with_format(
                        cast_row_num(n_row)?,
                        cast_col_num(cell.col)?,
                        &cell.text,
                        &fmt_cell,
                    )
                    .map_err(ExcelError::xlsx("writing data cell"))?;
            }
            l_validation_cells.extend(
                row.validations
                    .iter()
                    .map(|(n_col, values)| (n_row, *n_col, Arc::clone(values))),
            );
        }

        for validation in plan_validation_lists(&l_validation_cells) {
            let data_validation = DataValidation::new()
                .allow_list_strings(&validation.values[..])
                .map_err(ExcelError::xlsx("building validation list"))?
                .set_error_title(C_VALIDATION_ERROR_TITLE)
                .map_err(ExcelError::xlsx("building validation list"))?
                .set_error_message(C_VALIDATION_ERROR_MESSAGE)
                .map_err(ExcelError::xlsx("building validation list"))?;
            let region = validation.region;
            worksheet
                .add_data_validation(
                    cast_row_num(region.first_row)?,
                    cast_col_num(region.first_col)?,
                    cast_row_num(region.last_row)?,
                    cast_col_num(region.last_col)?,
                    &data_validation,
                )
                .map_err(ExcelError::xlsx("adding validation list"))?;
            report.n_validations += 1;
        }

        if table.if_freeze_header && plan.n_rows > 0 {
            worksheet
                .set_freeze_panes(cast_row_num(row_header_end)?, 0)
                .map_err(ExcelError::xlsx("freezing header"))?;
        }

        let c_sheet_name_sanitized = sanitize_sheet_name(&table.sheet_name, "_");
        if c_sheet_name_sanitized != table.sheet_name {
            report.warn(format!(
                "Sheet name {:?} sanitized to {c_sheet_name_sanitized:?}.",
                table.sheet_name
            ));
        }
        let c_sheet_name = self.derive_unique_sheet_name(&c_sheet_name_sanitized);
        if c_sheet_name != c_sheet_name_sanitized {
            report.warn(format!(
                "Sheet name {c_sheet_name_sanitized:?} already used; renamed to {c_sheet_name:?}."
            ));
        }
        worksheet
            .set_name(&c_sheet_name)
            .map_err(ExcelError::xlsx(format!("naming sheet {c_sheet_name:?}")))?;
        self.workbook.push_worksheet(worksheet);

        report.sheet_name = c_sheet_name;
        debug!(
            sheet = %report.sheet_name,
            n_rows_header = report.n_rows_header,
            n_rows_data = report.n_rows_data,
            n_merges = report.n_merges,
            n_validations = report.n_validations,
            "table written"
        );
        self.l_reports.push(report.clone());
        Ok(report)
    }

    /// Reserve `name`, or the first free `name__N`.
    ///
    /// Excel compares sheet names case-insensitively, so reservations are
    /// keyed by the lowercased name.
    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let mut c_candidate = name.to_string();
        let mut n_idx = 2usize;
        while !self.set_sheet_keys_existing.insert(c_candidate.to_lowercase()) {
            let c_suffix = format!("__{n_idx}");
            let c_base: String = name
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len()).max(1))
                .collect();
            c_candidate = format!("{c_base}{c_suffix}");
            n_idx += 1;
        }
        c_candidate
    }
}

/// Write `text` into `region`, merging when it spans several cells.
///
/// Returns the number of merges emitted (0 or 1).
fn write_region(
    worksheet: &mut Worksheet,
    region: &SpecCellRegion,
    text: &str,
    format: &Format,
) -> ExcelResult<usize> {
    if region.is_merge() {
        worksheet
            .merge_range(
                cast_row_num(region.first_row)?,
                cast_col_num(region.first_col)?,
                cast_row_num(region.last_row)?,
                cast_col_num(region.last_col)?,
                text,
                format,
            )
            .map_err(ExcelError::xlsx("merging cells"))?;
        return Ok(1);
    }
    worksheet
        .write_string_with_format(
            cast_row_num(region.first_row)?,
            cast_col_num(region.first_col)?,
            text,
            format,
        )
        .map_err(ExcelError::xlsx("writing cell"))?;
    Ok(0)
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}
