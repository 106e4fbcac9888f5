//! Allowed-value providers for data-validation drop-downs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::conf::N_OPTIONS_MAX;
use crate::error::{ExcelError, ExcelResult};
use crate::spec::SpecColumn;

/// Provider of the allowed values for one writable column.
pub trait OptionsSource: Send + Sync {
    /// Allowed values, in drop-down order.
    fn options(&self) -> Vec<String>;
}

impl<F> OptionsSource for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn options(&self) -> Vec<String> {
        self()
    }
}

/// Fixed list of allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticOptions(pub Vec<String>);

impl OptionsSource for StaticOptions {
    fn options(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Options sources keyed by the reference used in [`SpecColumn::options`].
#[derive(Clone, Default)]
pub struct OptionsRegistry {
    dict_sources: BTreeMap<String, Arc<dyn OptionsSource>>,
}

impl fmt::Debug for OptionsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsRegistry")
            .field("sources", &self.dict_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OptionsRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under `reference`.
    pub fn register<S>(&mut self, reference: impl Into<String>, source: S) -> &mut Self
    where
        S: OptionsSource + 'static,
    {
        self.dict_sources.insert(reference.into(), Arc::new(source));
        self
    }

    /// Register a fixed list under `reference`.
    pub fn register_values<I, S>(&mut self, reference: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(
            reference,
            StaticOptions(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Allowed values for `column`, `None` when it has no (or an empty) list.
    ///
    /// Fails for an unknown reference or more than [`N_OPTIONS_MAX`] values.
    pub fn resolve(&self, column: &SpecColumn) -> ExcelResult<Option<Arc<[String]>>> {
        let Some(reference) = column.options.as_deref().filter(|val| !val.is_empty()) else {
            return Ok(None);
        };
        let source = self.dict_sources.get(reference).ok_or_else(|| {
            ExcelError::Configuration(format!(
                "Column {} references unknown options source {reference:?}.",
                column.index
            ))
        })?;

        let l_values = source.options();
        if l_values.len() > N_OPTIONS_MAX {
            return Err(ExcelError::Configuration(format!(
                "Options source {reference:?} of column {} yields {} values (max {N_OPTIONS_MAX}).",
                column.index,
                l_values.len()
            )));
        }
        if l_values.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::from(l_values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_static_and_closure_sources() {
        let mut registry = OptionsRegistry::new();
        registry
            .register_values("colors", ["red", "green"])
            .register("sizes", || vec!["S".to_string(), "M".to_string()]);

        let column = SpecColumn::new(0, ["Color"]).with_options("colors");
        let values = registry.resolve(&column).expect("resolve").expect("values");
        assert_eq!(&*values, &["red".to_string(), "green".to_string()]);

        let column = SpecColumn::new(1, ["Size"]).with_options("sizes");
        assert_eq!(registry.resolve(&column).expect("resolve").map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_column_without_options_resolves_to_none() {
        let registry = OptionsRegistry::new();
        assert!(registry
            .resolve(&SpecColumn::new(0, ["Plain"]))
            .expect("resolve")
            .is_none());
    }

    #[test]
    fn test_empty_source_resolves_to_none() {
        let mut registry = OptionsRegistry::new();
        registry.register_values("none", Vec::<String>::new());
        let column = SpecColumn::new(0, ["X"]).with_options("none");
        assert!(registry.resolve(&column).expect("resolve").is_none());
    }

    #[test]
    fn test_option_limit() {
        let mut registry = OptionsRegistry::new();
        registry
            .register_values("hundred", (0..100).map(|n| n.to_string()))
            .register_values("too_many", (0..101).map(|n| n.to_string()));

        let column = SpecColumn::new(0, ["X"]).with_options("hundred");
        assert!(registry.resolve(&column).expect("resolve").is_some());

        let column = SpecColumn::new(0, ["X"]).with_options("too_many");
        let err = registry.resolve(&column).expect_err("over limit");
        assert!(matches!(err, ExcelError::Configuration(_)));
    }

    #[test]
    fn test_unknown_source_is_configuration_error() {
        let registry = OptionsRegistry::new();
        let column = SpecColumn::new(0, ["X"]).with_options("nope");
        assert!(matches!(
            registry.resolve(&column),
            Err(ExcelError::Configuration(_))
        ));
    }
}
