use crate::{coerce::Direction, identity::RecordId};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("The `{scalar}` scalar has no {direction} function")]
    ScalarFunctionMissing { scalar: String, direction: Direction },
    #[error("Could not {direction} a `{scalar}` value: {message}")]
    Scalar {
        scalar: String,
        direction: Direction,
        message: String,
    },
    #[error("Cannot store {incoming} in field `{field}` of record `{record}`, it holds {existing}")]
    RecordShapeConflict {
        record: RecordId,
        field: String,
        existing: ValueShape,
        incoming: ValueShape,
    },
    #[error("Expected an object or a list of objects for field `{field}` of record `{record}`, got {found}")]
    UnexpectedValue {
        record: RecordId,
        field: String,
        found: String,
    },
    #[error("No list named `{0}` was ever written to the cache")]
    UnknownList(String),
    #[error("Objects inserted in the `{list}` list need an identity")]
    UnkeyedListItem { list: String },
}

/// What a record field holds, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ValueShape {
    #[strum(serialize = "a scalar")]
    Scalar,
    #[strum(serialize = "a reference")]
    Reference,
    #[strum(serialize = "a list of references")]
    ReferenceList,
}
