//! Record schemas: a column index bound to a typed field accessor.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ExcelError, ExcelResult};
use crate::spec::{EnumFieldType, EnumFieldValue, SpecColumn};

/// Reads one field of `T` as a value.
pub type FieldGetter<T> = fn(&T) -> EnumFieldValue;
/// Writes one converted value into a field of `T`.
pub type FieldSetter<T> = fn(&mut T, EnumFieldValue);

/// One annotated field.
pub struct SpecFieldBinding<T> {
    /// Field name, used in errors and read issues.
    pub name: &'static str,
    /// Declared type, drives converter resolution.
    pub field_type: EnumFieldType,
    /// Column declaration.
    pub column: SpecColumn,
    /// Accessor used on the write path.
    pub getter: FieldGetter<T>,
    /// Accessor used on the read path.
    pub setter: FieldSetter<T>,
}

impl<T> Clone for SpecFieldBinding<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            field_type: self.field_type.clone(),
            column: self.column.clone(),
            getter: self.getter,
            setter: self.setter,
        }
    }
}

impl<T> std::fmt::Debug for SpecFieldBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecFieldBinding")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("column", &self.column)
            .finish()
    }
}

/// Ordered field bindings of one record type.
///
/// Name the record type on `new` so the accessor closures can be inferred:
///
/// ```
/// use axiomkit_io_excel::{EnumFieldType, EnumFieldValue, SpecColumn, SpecRecordSchema};
///
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: Option<i64>,
/// }
///
/// let schema = SpecRecordSchema::<Person>::new("Person")
///     .field(
///         "name",
///         EnumFieldType::Text,
///         SpecColumn::new(0, ["Name"]),
///         |rec| EnumFieldValue::from(rec.name.clone()),
///         |rec, val| rec.name = val.into_text().unwrap_or_default(),
///     )
///     .field(
///         "age",
///         EnumFieldType::Integer,
///         SpecColumn::new(1, ["Age"]),
///         |rec| EnumFieldValue::from(rec.age),
///         |rec, val| rec.age = val.as_i64(),
///     );
/// assert_eq!(schema.max_column_index(), Some(1));
/// assert!(schema.validate().is_ok());
/// ```
pub struct SpecRecordSchema<T> {
    name: String,
    l_fields: Vec<SpecFieldBinding<T>>,
}

impl<T> Clone for SpecRecordSchema<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            l_fields: self.l_fields.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SpecRecordSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecRecordSchema")
            .field("name", &self.name)
            .field("fields", &self.l_fields)
            .finish()
    }
}

impl<T> SpecRecordSchema<T> {
    /// Empty schema named after the record type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            l_fields: Vec::new(),
        }
    }

    /// Append a field binding.
    pub fn field(
        mut self,
        name: &'static str,
        field_type: EnumFieldType,
        column: SpecColumn,
        getter: FieldGetter<T>,
        setter: FieldSetter<T>,
    ) -> Self {
        self.l_fields.push(SpecFieldBinding {
            name,
            field_type,
            column,
            getter,
            setter,
        });
        self
    }

    /// Record name, used as the converter cache namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bindings in declaration order.
    pub fn fields(&self) -> &[SpecFieldBinding<T>] {
        &self.l_fields
    }

    /// Column declarations in declaration order.
    pub fn columns(&self) -> Vec<SpecColumn> {
        self.l_fields.iter().map(|field| field.column.clone()).collect()
    }

    /// Largest declared column index.
    pub fn max_column_index(&self) -> Option<usize> {
        self.l_fields.iter().map(|field| field.column.index).max()
    }

    /// Check index uniqueness and title paths.
    pub fn validate(&self) -> ExcelResult<()> {
        let mut set_indices = BTreeSet::new();
        for field in &self.l_fields {
            if !set_indices.insert(field.column.index) {
                return Err(ExcelError::Configuration(format!(
                    "{}: duplicate column index {} (field {:?}).",
                    self.name, field.column.index, field.name
                )));
            }
            if field.column.title.is_empty() {
                return Err(ExcelError::Configuration(format!(
                    "{}: field {:?} has an empty title path.",
                    self.name, field.name
                )));
            }
            if field.column.title.iter().any(|seg| seg.trim().is_empty()) {
                return Err(ExcelError::Configuration(format!(
                    "{}: field {:?} has an empty title segment.",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }

    /// Column index to binding position, built once per table.
    pub fn index_map(&self) -> ExcelResult<BTreeMap<usize, usize>> {
        self.validate()?;
        Ok(self
            .l_fields
            .iter()
            .enumerate()
            .map(|(n_pos, field)| (field.column.index, n_pos))
            .collect())
    }
}

/// A plain data type mapped to table rows.
///
/// `Default` supplies the fresh record each decoded row starts from.
pub trait ExcelRecord: Default {
    /// Field bindings of this type.
    fn schema() -> SpecRecordSchema<Self>;
}
