//! Custom scalar coercion.
//!
//! Each custom scalar may provide two functions: `unmarshal` turns the wire representation into the
//! one the application works with, `marshal` goes the other way. The registry is built once at
//! start-up and only read afterwards.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

pub type ScalarFn = Arc<dyn Fn(Value) -> Result<Value, ScalarError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ScalarError(String);

impl ScalarError {
    pub fn new(message: impl fmt::Display) -> Self {
        ScalarError(message.to_string())
    }
}

#[derive(Clone)]
pub struct ScalarDescriptor {
    type_name: String,
    unmarshal: Option<ScalarFn>,
    marshal: Option<ScalarFn>,
}

impl fmt::Debug for ScalarDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarDescriptor")
            .field("type_name", &self.type_name)
            .field("unmarshal", &self.unmarshal.is_some())
            .field("marshal", &self.marshal.is_some())
            .finish()
    }
}

impl ScalarDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        ScalarDescriptor {
            type_name: type_name.into(),
            unmarshal: None,
            marshal: None,
        }
    }

    pub fn with_unmarshal(
        mut self,
        unmarshal: impl Fn(Value) -> Result<Value, ScalarError> + Send + Sync + 'static,
    ) -> Self {
        self.unmarshal = Some(Arc::new(unmarshal));
        self
    }

    pub fn with_marshal(mut self, marshal: impl Fn(Value) -> Result<Value, ScalarError> + Send + Sync + 'static) -> Self {
        self.marshal = Some(Arc::new(marshal));
        self
    }

    /// A date time sent as milliseconds since the epoch and handled as an RFC 3339 string.
    pub fn timestamp_millis(type_name: impl Into<String>) -> Self {
        Self::new(type_name)
            .with_unmarshal(|value| {
                let millis = value
                    .as_i64()
                    .ok_or_else(|| ScalarError::new(format!("expected milliseconds since the epoch, got {value}")))?;
                let date_time = chrono::DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| ScalarError::new(format!("{millis} is out of range")))?;
                Ok(Value::String(
                    date_time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                ))
            })
            .with_marshal(|value| {
                let text = value
                    .as_str()
                    .ok_or_else(|| ScalarError::new(format!("expected an RFC 3339 date time, got {value}")))?;
                let date_time = chrono::DateTime::parse_from_rfc3339(text).map_err(ScalarError::new)?;
                Ok(Value::from(date_time.timestamp_millis()))
            })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn unmarshal(&self) -> Option<&ScalarFn> {
        self.unmarshal.as_ref()
    }

    pub fn marshal(&self) -> Option<&ScalarFn> {
        self.marshal.as_ref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScalarRegistry {
    scalars: HashMap<String, ScalarDescriptor>,
}

impl ScalarRegistry {
    pub fn builder() -> ScalarRegistryBuilder {
        ScalarRegistryBuilder::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&ScalarDescriptor> {
        self.scalars.get(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }
}

#[derive(Default)]
pub struct ScalarRegistryBuilder {
    scalars: HashMap<String, ScalarDescriptor>,
}

impl ScalarRegistryBuilder {
    pub fn scalar(mut self, descriptor: ScalarDescriptor) -> Self {
        self.scalars.insert(descriptor.type_name.clone(), descriptor);
        self
    }

    pub fn build(self) -> Arc<ScalarRegistry> {
        Arc::new(ScalarRegistry { scalars: self.scalars })
    }
}
