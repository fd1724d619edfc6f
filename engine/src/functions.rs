//! Named function table for frame functions.
//!
//! Hosts register per-field and sphere-data functions under
//! `(module, function)` string pairs at process start; frame requests
//! then reference them by name. Resolution of an unknown name is an
//! explicit error, never a silent no-op.

use std::collections::HashMap;
use std::sync::Arc;

use crate::field::FieldIndex;
use crate::panel::{EvalError, Neighborhood, PerFieldFn};
use crate::sphere::SphereDataFn;

/// Resolution failures from the function table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No function registered under this `(module, function)` pair.
    #[error("unknown function reference {module}.{function}")]
    UnknownFunctionRef {
        /// Module part of the reference.
        module: String,
        /// Function part of the reference.
        function: String,
    },
}

/// Registry of named frame functions for one field-data type.
pub struct FunctionTable<T, D = ()> {
    per_field: HashMap<(String, String), Arc<PerFieldFn<T, D>>>,
    sphere_data: HashMap<(String, String), Arc<SphereDataFn<D>>>,
}

impl<T, D> Default for FunctionTable<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> FunctionTable<T, D> {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { per_field: HashMap::new(), sphere_data: HashMap::new() }
    }

    /// Register a per-field function under `module.function`.
    pub fn register_per_field<F>(&mut self, module: &str, function: &str, f: F)
    where
        F: Fn(FieldIndex, &T, &Neighborhood<'_, T>, &D) -> Result<T, EvalError>
            + Send
            + Sync
            + 'static,
    {
        self.per_field.insert((module.to_string(), function.to_string()), Arc::new(f));
    }

    /// Register a sphere-data function under `module.function`.
    pub fn register_sphere_data<F>(&mut self, module: &str, function: &str, f: F)
    where
        F: Fn() -> D + Send + Sync + 'static,
    {
        self.sphere_data.insert((module.to_string(), function.to_string()), Arc::new(f));
    }

    /// Resolve a per-field function reference.
    ///
    /// # Errors
    /// `UnknownFunctionRef` if the name is not registered.
    pub fn resolve_per_field(
        &self,
        module: &str,
        function: &str,
    ) -> Result<Arc<PerFieldFn<T, D>>, ResolveError> {
        self.per_field.get(&(module.to_string(), function.to_string())).map(Arc::clone).ok_or_else(
            || ResolveError::UnknownFunctionRef {
                module: module.to_string(),
                function: function.to_string(),
            },
        )
    }

    /// Resolve a sphere-data function reference.
    ///
    /// # Errors
    /// `UnknownFunctionRef` if the name is not registered.
    pub fn resolve_sphere_data(
        &self,
        module: &str,
        function: &str,
    ) -> Result<Arc<SphereDataFn<D>>, ResolveError> {
        self.sphere_data
            .get(&(module.to_string(), function.to_string()))
            .map(Arc::clone)
            .ok_or_else(|| ResolveError::UnknownFunctionRef {
                module: module.to_string(),
                function: function.to_string(),
            })
    }
}
