//! Field value converters and the per-operation converter registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::conf::{C_FMT_DATE_DEFAULT, C_FMT_DATETIME_DEFAULT};
use crate::error::{ExcelError, ExcelResult};
use crate::spec::{EnumFieldType, EnumFieldValue, SpecColumn};

////////////////////////////////////////////////////////////////////////////////
// #region ConverterTrait

/// Bidirectional text/value transformer for one field type.
///
/// Both directions must be pure; `from_text(to_text(v)?)` returns `v` for
/// every value of the converter's own type.
pub trait Converter: Send + Sync {
    /// Render a value as cell text (write path).
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String>;
    /// Parse cell text into a value (read path).
    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String>;
}

fn derive_type_mismatch_text(expected: &str, value: &EnumFieldValue) -> String {
    format!("Expected {expected} value, got {value:?}.")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BuiltinConverters

/// Natural text form on write, raw text on read.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl Converter for IdentityConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        Ok(value.to_string())
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        Ok(EnumFieldValue::Text(text.to_string()))
    }
}

/// `true`/`false`; also reads `1/0`, `yes/no`, `y/n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        match value {
            EnumFieldValue::Boolean(val) => Ok(val.to_string()),
            _ => Err(derive_type_mismatch_text("boolean", value)),
        }
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(EnumFieldValue::Boolean(true)),
            "false" | "0" | "no" | "n" => Ok(EnumFieldValue::Boolean(false)),
            _ => Err(format!("Not a boolean: {text:?}.")),
        }
    }
}

/// Decimal integer text; reads integral floats such as `12.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        match value {
            EnumFieldValue::Integer(val) => Ok(val.to_string()),
            _ => Err(derive_type_mismatch_text("integer", value)),
        }
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        let c_text = text.trim();
        if let Ok(val) = c_text.parse::<i64>() {
            return Ok(EnumFieldValue::Integer(val));
        }
        match c_text.parse::<f64>() {
            Ok(val)
                if val.fract() == 0.0 && val >= i64::MIN as f64 && val < i64::MAX as f64 =>
            {
                Ok(EnumFieldValue::Integer(val as i64))
            }
            _ => Err(format!("Not an integer: {text:?}.")),
        }
    }
}

/// Shortest round-trip decimal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        match value {
            EnumFieldValue::Float(val) => Ok(val.to_string()),
            EnumFieldValue::Integer(val) => Ok(val.to_string()),
            _ => Err(derive_type_mismatch_text("float", value)),
        }
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        text.trim()
            .parse::<f64>()
            .map(EnumFieldValue::Float)
            .map_err(|err| format!("Not a number: {text:?} ({err})."))
    }
}

/// Calendar date with a `chrono` pattern.
#[derive(Debug, Clone)]
pub struct DateConverter {
    format: String,
}

impl DateConverter {
    /// Converter for `format` (e.g. `%Y-%m-%d`).
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Converter for DateConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        match value {
            EnumFieldValue::Date(val) => Ok(val.format(&self.format).to_string()),
            EnumFieldValue::DateTime(val) => Ok(val.date().format(&self.format).to_string()),
            _ => Err(derive_type_mismatch_text("date", value)),
        }
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        NaiveDate::parse_from_str(text.trim(), &self.format)
            .map(EnumFieldValue::Date)
            .map_err(|err| format!("Not a date in {:?}: {text:?} ({err}).", self.format))
    }
}

/// Date and time with a `chrono` pattern.
///
/// Reads bare dates (default date pattern) as midnight.
#[derive(Debug, Clone)]
pub struct DateTimeConverter {
    format: String,
}

impl DateTimeConverter {
    /// Converter for `format` (e.g. `%Y-%m-%d %H:%M:%S`).
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Converter for DateTimeConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        match value {
            EnumFieldValue::DateTime(val) => Ok(val.format(&self.format).to_string()),
            EnumFieldValue::Date(val) => Ok(val
                .and_time(NaiveTime::MIN)
                .format(&self.format)
                .to_string()),
            _ => Err(derive_type_mismatch_text("date-time", value)),
        }
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        let c_text = text.trim();
        match NaiveDateTime::parse_from_str(c_text, &self.format) {
            Ok(val) => Ok(EnumFieldValue::DateTime(val)),
            Err(err) => NaiveDate::parse_from_str(c_text, C_FMT_DATE_DEFAULT)
                .map(|val| EnumFieldValue::DateTime(val.and_time(NaiveTime::MIN)))
                .map_err(|_| {
                    format!("Not a date-time in {:?}: {text:?} ({err}).", self.format)
                }),
        }
    }
}

/// Fixed value/label table, the usual converter for enum-like custom types.
#[derive(Debug, Clone, Default)]
pub struct MappingConverter {
    l_pairs: Vec<(EnumFieldValue, String)>,
}

impl MappingConverter {
    /// Build from `(value, label)` pairs; the first pair wins on duplicates.
    pub fn new<I, V, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, S)>,
        V: Into<EnumFieldValue>,
        S: Into<String>,
    {
        Self {
            l_pairs: pairs
                .into_iter()
                .map(|(value, label)| (value.into(), label.into()))
                .collect(),
        }
    }

    /// Labels in declaration order, usable as a validation list.
    pub fn labels(&self) -> Vec<String> {
        self.l_pairs.iter().map(|(_, label)| label.clone()).collect()
    }
}

impl Converter for MappingConverter {
    fn to_text(&self, value: &EnumFieldValue) -> Result<String, String> {
        self.l_pairs
            .iter()
            .find(|(val, _)| val == value)
            .map(|(_, label)| label.clone())
            .ok_or_else(|| format!("No label mapped for {value:?}."))
    }

    fn from_text(&self, text: &str) -> Result<EnumFieldValue, String> {
        let c_text = text.trim();
        self.l_pairs
            .iter()
            .find(|(_, label)| label == c_text)
            .map(|(val, _)| val.clone())
            .ok_or_else(|| format!("Unknown label {text:?}."))
    }
}

/// Built-in converter for a declared type, if one exists.
pub fn derive_default_converter(field_type: &EnumFieldType) -> Option<Arc<dyn Converter>> {
    match field_type {
        EnumFieldType::Text => Some(Arc::new(IdentityConverter)),
        EnumFieldType::Boolean => Some(Arc::new(BooleanConverter)),
        EnumFieldType::Integer => Some(Arc::new(IntegerConverter)),
        EnumFieldType::Float => Some(Arc::new(FloatConverter)),
        EnumFieldType::Date => Some(Arc::new(DateConverter::new(C_FMT_DATE_DEFAULT))),
        EnumFieldType::DateTime => Some(Arc::new(DateTimeConverter::new(C_FMT_DATETIME_DEFAULT))),
        EnumFieldType::Custom(_) => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ConverterRegistry

/// Builds a converter for a column that references it explicitly.
pub type ConverterFactory = Arc<dyn Fn(&SpecColumn) -> Arc<dyn Converter> + Send + Sync>;

/// Resolves and caches one converter per field.
///
/// Resolution order, first match wins:
/// 1. explicit converter reference on the column;
/// 2. date pattern on a date/date-time field;
/// 3. converter registered (or built in) for the declared type;
/// 4. identity conversion.
///
/// The cache is keyed by `(record name, column index)` and lives as long as
/// the registry; pass one registry per write/read operation.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    dict_factories: BTreeMap<String, ConverterFactory>,
    dict_by_type: BTreeMap<EnumFieldType, Arc<dyn Converter>>,
    dict_cache: BTreeMap<(String, usize), Arc<dyn Converter>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("factories", &self.dict_factories.keys().collect::<Vec<_>>())
            .field("types", &self.dict_by_type.keys().collect::<Vec<_>>())
            .field("cached", &self.dict_cache.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConverterRegistry {
    /// Empty registry; built-in type converters are added lazily.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for an explicit converter reference.
    pub fn register_factory<F>(&mut self, reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&SpecColumn) -> Arc<dyn Converter> + Send + Sync + 'static,
    {
        self.dict_factories
            .insert(reference.into(), Arc::new(factory));
        self
    }

    /// Register a shared converter instance for an explicit converter reference.
    pub fn register_converter(
        &mut self,
        reference: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> &mut Self {
        self.register_factory(reference, move |_| Arc::clone(&converter))
    }

    /// Register (or replace) the converter used for a declared type.
    pub fn register_type(
        &mut self,
        field_type: EnumFieldType,
        converter: Arc<dyn Converter>,
    ) -> &mut Self {
        self.dict_by_type.insert(field_type, converter);
        self
    }

    /// Resolve the converter for one field, reusing the cached instance.
    pub fn resolve(
        &mut self,
        record: &str,
        column: &SpecColumn,
        field_type: &EnumFieldType,
    ) -> ExcelResult<Arc<dyn Converter>> {
        let key = (record.to_string(), column.index);
        if let Some(converter) = self.dict_cache.get(&key) {
            return Ok(Arc::clone(converter));
        }

        let converter = self.resolve_uncached(column, field_type)?;
        self.dict_cache.insert(key, Arc::clone(&converter));
        Ok(converter)
    }

    fn resolve_uncached(
        &mut self,
        column: &SpecColumn,
        field_type: &EnumFieldType,
    ) -> ExcelResult<Arc<dyn Converter>> {
        if let Some(reference) = column.converter.as_deref().filter(|val| !val.is_empty()) {
            let factory = self.dict_factories.get(reference).ok_or_else(|| {
                ExcelError::Configuration(format!(
                    "Column {} references unknown converter {reference:?}.",
                    column.index
                ))
            })?;
            return Ok(factory(column));
        }

        if let Some(format) = column.date_format.as_deref().filter(|val| !val.is_empty()) {
            match field_type {
                EnumFieldType::Date => return Ok(Arc::new(DateConverter::new(format))),
                EnumFieldType::DateTime => return Ok(Arc::new(DateTimeConverter::new(format))),
                _ => {}
            }
        }

        if let Some(converter) = self.dict_by_type.get(field_type) {
            return Ok(Arc::clone(converter));
        }
        if let Some(converter) = derive_default_converter(field_type) {
            self.dict_by_type
                .insert(field_type.clone(), Arc::clone(&converter));
            return Ok(converter);
        }

        Ok(Arc::new(IdentityConverter))
    }

    /// Number of cached per-field converters.
    pub fn cached_len(&self) -> usize {
        self.dict_cache.len()
    }

    /// Drop all cached per-field converters.
    pub fn clear_cache(&mut self) {
        self.dict_cache.clear();
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
