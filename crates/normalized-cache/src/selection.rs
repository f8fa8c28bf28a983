//! The shape of a document as produced by the compiler.
//!
//! A [`SelectionSet`] maps response keys (aliases) to [`Field`]s. Each field knows the key it is
//! stored under (`keyRaw`, which includes its serialized arguments), its declared type and whether
//! it is a leaf or an object with its own sub-selection.

mod key;

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;

pub type SelectionSet = IndexMap<String, Field>;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(try_from = "RawField")]
pub struct Field {
    pub key_raw: String,
    pub type_name: String,
    pub shape: FieldShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Scalar,
    /// Enums are leaves that are never coerced.
    Enum,
    Object(ObjectSelection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSelection {
    pub fields: SelectionSet,
    pub list: Option<ListInfo>,
    /// Interfaces and unions: the concrete type comes from `__typename`.
    pub is_abstract: bool,
}

/// Marks a field as a named list that can be mutated in place after the fact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub connection: bool,
}

impl Field {
    pub fn scalar(key_raw: impl Into<String>, type_name: impl Into<String>) -> Self {
        Field {
            key_raw: key_raw.into(),
            type_name: type_name.into(),
            shape: FieldShape::Scalar,
        }
    }

    pub fn enumeration(key_raw: impl Into<String>, type_name: impl Into<String>) -> Self {
        Field {
            key_raw: key_raw.into(),
            type_name: type_name.into(),
            shape: FieldShape::Enum,
        }
    }

    pub fn object<K: Into<String>>(
        key_raw: impl Into<String>,
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, Field)>,
    ) -> Self {
        Field {
            key_raw: key_raw.into(),
            type_name: type_name.into(),
            shape: FieldShape::Object(ObjectSelection {
                fields: fields.into_iter().map(|(alias, field)| (alias.into(), field)).collect(),
                list: None,
                is_abstract: false,
            }),
        }
    }

    /// Only meaningful on object fields, leaves are returned untouched.
    pub fn with_list(mut self, list: ListInfo) -> Self {
        if let FieldShape::Object(object) = &mut self.shape {
            object.list = Some(list);
        }
        self
    }

    pub fn into_abstract(mut self) -> Self {
        if let FieldShape::Object(object) = &mut self.shape {
            object.is_abstract = true;
        }
        self
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self.shape, FieldShape::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjectSelection> {
        match &self.shape {
            FieldShape::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl ListInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        ListInfo {
            name: name.into(),
            type_name: type_name.into(),
            connection: false,
        }
    }

    pub fn connection(mut self) -> Self {
        self.connection = true;
        self
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawField {
    key_raw: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    fields: Option<SelectionSet>,
    #[serde(default)]
    list: Option<ListInfo>,
    #[serde(default, rename = "enum")]
    is_enum: bool,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
}

impl TryFrom<RawField> for Field {
    type Error = String;

    fn try_from(raw: RawField) -> Result<Self, Self::Error> {
        let shape = match (raw.fields, raw.is_enum) {
            (Some(_), true) => {
                return Err(format!("field `{}` is an enum and cannot have a sub-selection", raw.key_raw));
            }
            (None, is_enum) => {
                if raw.list.is_some() {
                    return Err(format!("list metadata on `{}` requires a sub-selection", raw.key_raw));
                }
                if is_enum {
                    FieldShape::Enum
                } else {
                    FieldShape::Scalar
                }
            }
            (Some(fields), false) => FieldShape::Object(ObjectSelection {
                fields,
                list: raw.list,
                is_abstract: raw.is_abstract,
            }),
        };

        Ok(Field {
            key_raw: raw.key_raw,
            type_name: raw.type_name,
            shape,
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

/// One named operation: its selection, the GraphQL text sent over the wire and the declared
/// shape of its variables.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectionDocument {
    pub name: String,
    #[serde(default)]
    pub kind: OperationKind,
    #[serde(default)]
    pub source: String,
    pub selection: SelectionSet,
    #[serde(default)]
    pub input: SelectionSet,
}

impl SelectionDocument {
    pub fn new(name: impl Into<String>, selection: SelectionSet) -> Self {
        SelectionDocument {
            name: name.into(),
            kind: OperationKind::Query,
            source: String::new(),
            selection,
            input: SelectionSet::new(),
        }
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_input(mut self, input: SelectionSet) -> Self {
        self.input = input;
        self
    }
}

/// Every document known to the process, addressable by operation name.
#[derive(Debug, Default, Clone)]
pub struct Documents {
    by_name: HashMap<String, Arc<SelectionDocument>>,
}

impl Documents {
    /// Parses a JSON array of documents.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let documents: Vec<SelectionDocument> = serde_json::from_str(json)?;
        Ok(documents.into_iter().collect())
    }

    pub fn insert(&mut self, document: SelectionDocument) -> Option<Arc<SelectionDocument>> {
        self.by_name.insert(document.name.clone(), Arc::new(document))
    }

    pub fn get(&self, name: &str) -> Option<Arc<SelectionDocument>> {
        self.by_name.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<SelectionDocument> for Documents {
    fn from_iter<T: IntoIterator<Item = SelectionDocument>>(iter: T) -> Self {
        let mut documents = Documents::default();
        for document in iter {
            documents.insert(document);
        }
        documents
    }
}
