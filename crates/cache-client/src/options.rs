use std::{fmt, sync::Arc};

use cache_config::CachePolicy;
use runtime::hooks::{HookError, LoadHooks};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

type VariablesFn = Arc<dyn Fn() -> Result<Value, HookError> + Send + Sync>;

/// The variables of an execution, in their application representation.
#[derive(Clone)]
pub enum Variables {
    Static(Value),
    /// Computed when the execution starts.
    Computed(VariablesFn),
}

impl Default for Variables {
    fn default() -> Self {
        Variables::Static(Value::Object(Default::default()))
    }
}

impl fmt::Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variables::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Variables::Computed(_) => f.debug_tuple("Computed").finish_non_exhaustive(),
        }
    }
}

impl Variables {
    pub(crate) fn resolve(&self) -> Result<Value, HookError> {
        let value = match self {
            Variables::Static(value) => value.clone(),
            Variables::Computed(compute) => compute()?,
        };

        match value {
            Value::Null => Ok(Value::Object(Default::default())),
            Value::Object(_) => Ok(value),
            other => Err(HookError::new(format!("variables must be an object, got {other}"))),
        }
    }
}

impl From<Value> for Variables {
    fn from(value: Value) -> Self {
        Variables::Static(value)
    }
}

/// Per execution overrides of the client defaults.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub variables: Variables,
    pub policy: Option<CachePolicy>,
    pub partial: Option<bool>,
    pub hooks: Option<Arc<dyn LoadHooks>>,
    pub cancellation: Option<CancellationToken>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn variables(mut self, variables: impl Into<Variables>) -> Self {
        self.variables = variables.into();
        self
    }

    #[must_use]
    pub fn computed_variables(
        mut self,
        compute: impl Fn() -> Result<Value, HookError> + Send + Sync + 'static,
    ) -> Self {
        self.variables = Variables::Computed(Arc::new(compute));
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = Some(partial);
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: impl LoadHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn variables_must_be_an_object() {
        assert_eq!(Variables::default().resolve().unwrap(), json!({}));
        assert_eq!(Variables::Static(Value::Null).resolve().unwrap(), json!({}));

        let error = Variables::Static(json!([1])).resolve().unwrap_err();
        assert_eq!(error.to_string(), "variables must be an object, got [1]");

        let computed = Variables::Computed(Arc::new(|| Err(HookError::new("no session"))));
        assert_eq!(computed.resolve().unwrap_err(), HookError::new("no session"));
    }
}
