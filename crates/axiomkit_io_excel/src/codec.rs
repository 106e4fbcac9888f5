//! Row codec: records to cell text (write path) and cell text to records
//! (read path).

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::convert::{Converter, ConverterRegistry};
use crate::error::{ExcelError, ExcelResult};
use crate::options::OptionsRegistry;
use crate::record::{SpecFieldBinding, SpecRecordSchema};
use crate::spec::{
    EnumFieldType, EnumFieldValue, SpecEncodedCell, SpecEncodedRow, SpecReadIssue,
    SpecReadOutcome,
};
use crate::util::parse_cell_reference;

/// Resolve converters for every non-text field, aligned with `schema.fields()`.
fn resolve_field_converters<T>(
    schema: &SpecRecordSchema<T>,
    registry: &mut ConverterRegistry,
) -> ExcelResult<Vec<Option<Arc<dyn Converter>>>> {
    schema
        .fields()
        .iter()
        .map(|field| match field.field_type {
            EnumFieldType::Text => Ok(None),
            _ => registry
                .resolve(schema.name(), &field.column, &field.field_type)
                .map(Some),
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////
// #region WritePath

/// Encodes records of one schema into sparse cell rows.
///
/// Converters and option lists are resolved once, when the encoder opens;
/// every configuration error surfaces here, before any row is encoded.
pub struct RowEncoder<'s, T> {
    schema: &'s SpecRecordSchema<T>,
    l_positions: Vec<usize>,
    l_converters: Vec<Option<Arc<dyn Converter>>>,
    l_options: Vec<Option<Arc<[String]>>>,
}

impl<'s, T> RowEncoder<'s, T> {
    /// Open an encoder for `schema`.
    pub fn new(
        schema: &'s SpecRecordSchema<T>,
        registry: &mut ConverterRegistry,
        options: &OptionsRegistry,
    ) -> ExcelResult<Self> {
        let dict_idx = schema.index_map()?;
        let l_converters = resolve_field_converters(schema, registry)?;
        let l_options = schema
            .fields()
            .iter()
            .map(|field| options.resolve(&field.column))
            .collect::<ExcelResult<Vec<_>>>()?;

        Ok(Self {
            schema,
            l_positions: dict_idx.into_values().collect(),
            l_converters,
            l_options,
        })
    }

    /// Encode one record.
    ///
    /// Absent values produce no cell; text fields are written as-is; every
    /// other field goes through its converter. A converter failure aborts
    /// with [`ExcelError::Conversion`].
    pub fn encode_row(&self, record: &T) -> ExcelResult<SpecEncodedRow> {
        let mut row = SpecEncodedRow::default();
        for &n_pos in &self.l_positions {
            let field = &self.schema.fields()[n_pos];
            let value = (field.getter)(record);
            if value.is_none() {
                continue;
            }

            let c_text = match (&self.l_converters[n_pos], value) {
                (_, EnumFieldValue::Text(val)) if field.field_type == EnumFieldType::Text => val,
                (Some(converter), value) => converter.to_text(&value).map_err(|message| {
                    ExcelError::Conversion {
                        record: self.schema.name().to_string(),
                        field: field.name.to_string(),
                        column: field.column.index,
                        message,
                    }
                })?,
                (None, value) => value.to_string(),
            };

            row.cells.push(SpecEncodedCell {
                col: field.column.index,
                text: c_text,
            });
            if let Some(values) = &self.l_options[n_pos] {
                row.validations
                    .push((field.column.index, Arc::clone(values)));
            }
        }
        Ok(row)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadPath

/// Push-based decoder fed by a forward-only, row-major cell scan.
///
/// Rows below `start_row` are ignored. A fresh record is allocated at
/// [`Self::start_row`], filled by [`Self::cell`], and appended at
/// [`Self::end_row`]. Cells without a bound field are ignored; conversion
/// failures are logged and recorded, and the field keeps its default.
pub struct RowDecoder<'s, T> {
    schema: &'s SpecRecordSchema<T>,
    dict_idx: BTreeMap<usize, usize>,
    l_converters: Vec<Option<Arc<dyn Converter>>>,
    start_row: usize,
    n_row_current: Option<usize>,
    n_col_current: Option<usize>,
    record: Option<T>,
    l_records: Vec<T>,
    l_issues: Vec<SpecReadIssue>,
}

impl<'s, T: Default> RowDecoder<'s, T> {
    /// Open a decoder for `schema` that skips rows before `start_row`.
    pub fn new(
        schema: &'s SpecRecordSchema<T>,
        registry: &mut ConverterRegistry,
        start_row: usize,
    ) -> ExcelResult<Self> {
        Ok(Self {
            schema,
            dict_idx: schema.index_map()?,
            l_converters: resolve_field_converters(schema, registry)?,
            start_row,
            n_row_current: None,
            n_col_current: None,
            record: None,
            l_records: Vec::new(),
            l_issues: Vec::new(),
        })
    }

    /// Begin row `row`.
    pub fn start_row(&mut self, row: usize) {
        self.n_row_current = Some(row);
        self.n_col_current = None;
        self.record = (row >= self.start_row).then(T::default);
    }

    /// Consume one cell of the current row.
    ///
    /// `cell_reference` is an A1 address; when missing (or malformed) the
    /// column after the previous cell is assumed.
    pub fn cell(&mut self, cell_reference: Option<&str>, text: &str) {
        let Some(n_row) = self.n_row_current else {
            return;
        };
        let n_col = cell_reference
            .and_then(parse_cell_reference)
            .map(|(_, n_col)| n_col)
            .unwrap_or_else(|| self.n_col_current.map_or(0, |n_col| n_col + 1));
        self.n_col_current = Some(n_col);

        if self.record.is_none() {
            return;
        }
        let Some((field, res_value)) = self.decode_cell(n_col, text) else {
            return;
        };
        let setter = field.setter;
        let c_field = field.name;

        match res_value {
            Ok(EnumFieldValue::None) => {}
            Ok(value) => {
                if let Some(record) = self.record.as_mut() {
                    setter(record, value);
                }
            }
            Err(message) => {
                warn!(
                    record = self.schema.name(),
                    field = c_field,
                    row = n_row,
                    col = n_col,
                    "cell conversion failed: {message}"
                );
                self.l_issues.push(SpecReadIssue {
                    row: n_row,
                    col: n_col,
                    field: c_field.to_string(),
                    text: text.to_string(),
                    message,
                });
            }
        }
    }

    /// Finish row `row`, appending its record when the row is decoded.
    pub fn end_row(&mut self, _row: usize) {
        if let Some(record) = self.record.take() {
            self.l_records.push(record);
        }
        self.n_row_current = None;
    }

    /// Resolve the field bound to column `col` and convert `text` for it.
    ///
    /// Returns `None` when no field is bound to the column. Empty text on a
    /// non-text field converts to [`EnumFieldValue::None`].
    pub fn decode_cell(
        &self,
        col: usize,
        text: &str,
    ) -> Option<(&'s SpecFieldBinding<T>, Result<EnumFieldValue, String>)> {
        let schema: &'s SpecRecordSchema<T> = self.schema;
        let n_pos = *self.dict_idx.get(&col)?;
        let field = &schema.fields()[n_pos];

        let res_value = match &self.l_converters[n_pos] {
            _ if field.field_type == EnumFieldType::Text => {
                Ok(EnumFieldValue::Text(text.to_string()))
            }
            _ if text.trim().is_empty() => Ok(EnumFieldValue::None),
            Some(converter) => converter.from_text(text),
            None => Ok(EnumFieldValue::Text(text.to_string())),
        };
        Some((field, res_value))
    }

    /// Records decoded so far.
    pub fn records(&self) -> &[T] {
        &self.l_records
    }

    /// Close the decoder; a row left open is appended.
    pub fn finish(mut self) -> SpecReadOutcome<T> {
        if let Some(record) = self.record.take() {
            self.l_records.push(record);
        }
        SpecReadOutcome {
            records: self.l_records,
            issues: self.l_issues,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::convert::MappingConverter;
    use crate::spec::SpecColumn;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Member {
        name: String,
        email: Option<String>,
        age: Option<i64>,
        joined: Option<NaiveDate>,
        level: Option<i64>,
    }

    fn schema_member() -> SpecRecordSchema<Member> {
        SpecRecordSchema::<Member>::new("Member")
            .field(
                "name",
                EnumFieldType::Text,
                SpecColumn::new(0, ["Name"]),
                |rec| EnumFieldValue::from(rec.name.clone()),
                |rec, val| rec.name = val.into_text().unwrap_or_default(),
            )
            .field(
                "email",
                EnumFieldType::Text,
                SpecColumn::new(1, ["Contact", "Email"]),
                |rec| EnumFieldValue::from(rec.email.clone()),
                |rec, val| rec.email = val.into_text(),
            )
            .field(
                "age",
                EnumFieldType::Integer,
                SpecColumn::new(2, ["Contact", "Age"]),
                |rec| EnumFieldValue::from(rec.age),
                |rec, val| rec.age = val.as_i64(),
            )
            .field(
                "joined",
                EnumFieldType::Date,
                SpecColumn::new(3, ["Joined"]).with_date_format("%d.%m.%Y"),
                |rec| EnumFieldValue::from(rec.joined),
                |rec, val| rec.joined = val.as_date(),
            )
            .field(
                "level",
                EnumFieldType::Custom("level".to_string()),
                SpecColumn::new(4, ["Level"])
                    .with_converter("level")
                    .with_options("levels"),
                |rec| EnumFieldValue::from(rec.level),
                |rec, val| rec.level = val.as_i64(),
            )
    }

    fn registries() -> (ConverterRegistry, OptionsRegistry) {
        let mut registry = ConverterRegistry::new();
        registry.register_converter(
            "level",
            Arc::new(MappingConverter::new([(1i64, "Bronze"), (2i64, "Gold")])),
        );
        let mut options = OptionsRegistry::new();
        options.register_values("levels", ["Bronze", "Gold"]);
        (registry, options)
    }

    fn member() -> Member {
        Member {
            name: "Ada".to_string(),
            email: Some("ada@example.org".to_string()),
            age: Some(36),
            joined: NaiveDate::from_ymd_opt(2020, 5, 17),
            level: Some(2),
        }
    }

    #[test]
    fn test_encode_row() {
        let schema = schema_member();
        let (mut registry, options) = registries();
        let encoder = RowEncoder::new(&schema, &mut registry, &options).expect("encoder");

        let row = encoder.encode_row(&member()).expect("encode");
        let l_cells: Vec<(usize, &str)> = row
            .cells
            .iter()
            .map(|cell| (cell.col, cell.text.as_str()))
            .collect();
        assert_eq!(
            l_cells,
            vec![
                (0, "Ada"),
                (1, "ada@example.org"),
                (2, "36"),
                (3, "17.05.2020"),
                (4, "Gold"),
            ]
        );
        assert_eq!(row.validations.len(), 1);
        assert_eq!(row.validations[0].0, 4);
        assert_eq!(&*row.validations[0].1, &["Bronze".to_string(), "Gold".to_string()]);
    }

    #[test]
    fn test_null_fields_are_skipped() {
        let schema = schema_member();
        let (mut registry, options) = registries();
        let encoder = RowEncoder::new(&schema, &mut registry, &options).expect("encoder");

        let rec = Member {
            name: "Bob".to_string(),
            ..Member::default()
        };
        let row = encoder.encode_row(&rec).expect("encode");
        assert_eq!(
            row.cells,
            vec![SpecEncodedCell {
                col: 0,
                text: "Bob".to_string()
            }]
        );
        assert!(row.validations.is_empty());
    }

    #[test]
    fn test_conversion_failure_aborts_encoding() {
        let schema = schema_member();
        let (mut registry, options) = registries();
        let encoder = RowEncoder::new(&schema, &mut registry, &options).expect("encoder");

        let rec = Member {
            level: Some(9),
            ..member()
        };
        let err = encoder.encode_row(&rec).expect_err("unmapped level");
        match err {
            ExcelError::Conversion { field, column, .. } => {
                assert_eq!(field, "level");
                assert_eq!(column, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_too_many_options_fail_before_encoding() {
        let schema = schema_member();
        let (mut registry, _) = registries();
        let mut options = OptionsRegistry::new();
        options.register_values("levels", (0..101).map(|n| format!("L{n}")));

        let err = RowEncoder::new(&schema, &mut registry, &options)
            .err()
            .expect("too many options");
        assert!(matches!(err, ExcelError::Configuration(_)));
    }

    #[test]
    fn test_decode_skips_rows_before_start() {
        let schema = schema_member();
        let (mut registry, _) = registries();
        let mut decoder = RowDecoder::new(&schema, &mut registry, 2).expect("decoder");

        for n_row in 0..4 {
            decoder.start_row(n_row);
            decoder.cell(Some(&format!("A{}", n_row + 1)), &format!("row{n_row}"));
            decoder.end_row(n_row);
        }

        let outcome = decoder.finish();
        let l_names: Vec<&str> = outcome.records.iter().map(|rec| rec.name.as_str()).collect();
        assert_eq!(l_names, vec!["row2", "row3"]);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_decode_full_row() {
        let schema = schema_member();
        let (mut registry, _) = registries();
        let mut decoder = RowDecoder::new(&schema, &mut registry, 0).expect("decoder");

        decoder.start_row(0);
        for (c_ref, c_text) in [
            ("A1", "Ada"),
            ("B1", "ada@example.org"),
            ("C1", "36"),
            ("D1", "17.05.2020"),
            ("E1", "Gold"),
            ("H1", "ignored"),
        ] {
            decoder.cell(Some(c_ref), c_text);
        }
        decoder.end_row(0);

        let outcome = decoder.finish();
        assert_eq!(outcome.records, vec![member()]);
    }

    #[test]
    fn test_decode_failure_leaves_field_default() {
        let schema = schema_member();
        let (mut registry, _) = registries();
        let mut decoder = RowDecoder::new(&schema, &mut registry, 0).expect("decoder");

        decoder.start_row(5);
        decoder.cell(Some("A6"), "Eve");
        decoder.cell(Some("C6"), "not a number");
        decoder.cell(None, "01.01.2001");
        decoder.end_row(5);

        let outcome = decoder.finish();
        assert_eq!(outcome.records.len(), 1);
        let rec = &outcome.records[0];
        assert_eq!(rec.name, "Eve");
        assert_eq!(rec.age, None);
        assert_eq!(rec.joined, NaiveDate::from_ymd_opt(2001, 1, 1));

        assert_eq!(outcome.issues.len(), 1);
        let issue = &outcome.issues[0];
        assert_eq!((issue.row, issue.col), (5, 2));
        assert_eq!(issue.field, "age");
        assert_eq!(issue.text, "not a number");
    }
}
