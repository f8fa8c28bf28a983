//! Walks a payload along its selection and applies the custom scalar functions.
//!
//! The same walk serves both directions: responses are unmarshalled before reaching the
//! application, variables are marshalled before reaching the network. Absent and `null` values
//! are never handed to a scalar function.

use serde_json::{Map, Value};

use crate::{
    error::{CacheError, CacheResult},
    scalars::ScalarRegistry,
    selection::{Field, FieldShape, SelectionSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// wire to application
    Unmarshal,
    /// application to wire
    Marshal,
}

/// Coerces the value of a single field.
pub fn coerce(direction: Direction, scalars: &ScalarRegistry, field: &Field, value: Value) -> CacheResult<Value> {
    Walker { direction, scalars }.field(field, value)
}

/// Coerces an object described by `selection`. Anything else than an object is returned as is.
pub fn coerce_selection(
    direction: Direction,
    scalars: &ScalarRegistry,
    selection: &SelectionSet,
    value: Value,
) -> CacheResult<Value> {
    let walker = Walker { direction, scalars };
    match value {
        Value::Object(object) => walker.object(selection, object).map(Value::Object),
        value => Ok(value),
    }
}

struct Walker<'a> {
    direction: Direction,
    scalars: &'a ScalarRegistry,
}

impl Walker<'_> {
    fn field(&self, field: &Field, value: Value) -> CacheResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            // Lists of any depth get the same treatment for each of their items.
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.field(field, item))
                .collect::<CacheResult<Vec<_>>>()
                .map(Value::Array),
            value => match &field.shape {
                FieldShape::Enum => Ok(value),
                FieldShape::Scalar => self.scalar(&field.type_name, value),
                FieldShape::Object(object) => match value {
                    Value::Object(map) => self.object(&object.fields, map).map(Value::Object),
                    value => Ok(value),
                },
            },
        }
    }

    fn object(&self, selection: &SelectionSet, object: Map<String, Value>) -> CacheResult<Map<String, Value>> {
        object
            .into_iter()
            .map(|(key, value)| {
                let value = match selection.get(&key) {
                    Some(field) => self.field(field, value)?,
                    None => value,
                };
                Ok((key, value))
            })
            .collect()
    }

    fn scalar(&self, type_name: &str, value: Value) -> CacheResult<Value> {
        let Some(descriptor) = self.scalars.get(type_name) else {
            return Ok(value);
        };

        let function = match self.direction {
            Direction::Unmarshal => descriptor.unmarshal(),
            Direction::Marshal => descriptor.marshal(),
        };

        let Some(function) = function else {
            return Err(CacheError::ScalarFunctionMissing {
                scalar: type_name.to_string(),
                direction: self.direction,
            });
        };

        function(value).map_err(|error| CacheError::Scalar {
            scalar: type_name.to_string(),
            direction: self.direction,
            message: error.to_string(),
        })
    }
}
