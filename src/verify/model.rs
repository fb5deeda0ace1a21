//! Data model for decoded model replies and the resulting verdict.
//!
//! The model's JSON is duck-typed: `Publicity` arrives as a boolean, as the
//! strings `"True"`/`"False"`, or as something else entirely, and recipient
//! fields may be missing. [`ParsedAnalysis`] therefore keeps the raw object
//! and exposes accessors; all coercion into typed values happens at this
//! boundary and reports a [`CoercionError`] instead of failing.

use crate::error::CoercionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key holding the advertising flag.
pub const PUBLICITY_KEY: &str = "Publicity";
/// JSON key holding the recipient list.
pub const RECIPIENTS_KEY: &str = "destinataires";

/// The JSON object decoded from a model reply, shape not yet trusted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAnalysis {
    object: Map<String, Value>,
}

impl ParsedAnalysis {
    pub fn new(object: Map<String, Value>) -> Self {
        Self { object }
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.object
    }

    /// Raw `Publicity` value, if present.
    pub fn publicity(&self) -> Option<&Value> {
        self.object.get(PUBLICITY_KEY)
    }

    /// Coerce `Publicity` with the strict allow-list rule.
    ///
    /// Accepted: JSON booleans, and the exact strings `"True"` and `"False"`.
    /// Anything else (including `""`, `"true"`, `1` or a missing key) is an error.
    pub fn coerce_publicity(&self) -> Result<bool, CoercionError> {
        match self.publicity() {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s == "True" => Ok(true),
            Some(Value::String(s)) if s == "False" => Ok(false),
            other => Err(CoercionError::Publicity {
                found: describe(other),
            }),
        }
    }

    /// The `destinataires` entries exactly as the model sent them, when the
    /// key holds an array.
    pub fn raw_recipients(&self) -> Option<&Vec<Value>> {
        self.object.get(RECIPIENTS_KEY).and_then(Value::as_array)
    }

    /// Read `destinataires` into typed records.
    ///
    /// A missing or `null` list is empty without complaint; any other
    /// non-array value is reported and also treated as empty. Each malformed
    /// entry or field is reported and replaced by empty strings.
    pub fn recipients(&self, warnings: &mut Vec<CoercionError>) -> Vec<RecipientRecord> {
        let items = match self.object.get(RECIPIENTS_KEY) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                warnings.push(CoercionError::Destinataires {
                    found: describe(Some(other)),
                });
                return Vec::new();
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| RecipientRecord::from_value(index, item, warnings))
            .collect()
    }
}

/// One addressee extracted from the document.
///
/// Field names follow the wire format the model is prompted to produce.
/// Keys the model adds beyond the three known ones are kept in `extra` so the
/// record is echoed back as received.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Organisation name, possibly empty.
    #[serde(default)]
    pub organisme_destinataire: String,
    /// Personal name, possibly empty.
    #[serde(default)]
    pub nom_personnel_destinataire: String,
    /// Postal address, possibly empty.
    #[serde(default)]
    pub adresse_destinataire: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecipientRecord {
    pub const ORGANISATION: &'static str = "organisme_destinataire";
    pub const PERSON: &'static str = "nom_personnel_destinataire";
    pub const ADDRESS: &'static str = "adresse_destinataire";

    pub fn new(
        organisation: impl Into<String>,
        person: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            organisme_destinataire: organisation.into(),
            nom_personnel_destinataire: person.into(),
            adresse_destinataire: address.into(),
            extra: Map::new(),
        }
    }

    /// Build a record from an untrusted JSON value.
    fn from_value(index: usize, value: &Value, warnings: &mut Vec<CoercionError>) -> Self {
        let Value::Object(map) = value else {
            warnings.push(CoercionError::RecipientShape {
                index,
                found: describe(Some(value)),
            });
            return Self::default();
        };

        let mut field = |name: &'static str| -> String {
            match map.get(name) {
                Some(Value::String(s)) => s.clone(),
                // A null address is how the model says "none"; not worth a warning.
                Some(Value::Null) if name == Self::ADDRESS => String::new(),
                other => {
                    warnings.push(CoercionError::RecipientField {
                        index,
                        field: name,
                        found: describe(other),
                    });
                    String::new()
                }
            }
        };

        let organisme_destinataire = field(Self::ORGANISATION);
        let nom_personnel_destinataire = field(Self::PERSON);
        let adresse_destinataire = field(Self::ADDRESS);

        let known = [Self::ORGANISATION, Self::PERSON, Self::ADDRESS];
        let extra = map
            .iter()
            .filter(|(k, _)| !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            organisme_destinataire,
            nom_personnel_destinataire,
            adresse_destinataire,
            extra,
        }
    }

    /// Display label: organisation, one space, personal name.
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.organisme_destinataire, self.nom_personnel_destinataire
        )
    }

    /// Identity string used to decide whether two records name the same
    /// addressee: personal name immediately followed by organisation.
    pub fn identity(&self) -> String {
        format!(
            "{}{}",
            self.nom_personnel_destinataire, self.organisme_destinataire
        )
    }
}

/// Final verification verdict for one document.
///
/// Serialised with the exact keys consumers of the HTTP API rely on.
/// `recipients` and `first_recipient` are only `Some` when
/// `valid_recipients` is `true`. `recipients` echoes the entries as received;
/// the defaults filled in for matching never leak into it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchVerdict {
    #[serde(rename = "Publicity")]
    pub publicity: bool,
    #[serde(rename = "Valid_recipients")]
    pub valid_recipients: bool,
    #[serde(rename = "unique_recipient")]
    pub unique_recipient: Option<bool>,
    #[serde(rename = "Recipients")]
    pub recipients: Option<Vec<Value>>,
    #[serde(rename = "First_recipient")]
    pub first_recipient: Option<String>,
}

/// Short description of a JSON value for diagnostics.
fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => format!("boolean {b}"),
        Some(Value::Number(n)) => format!("number {n}"),
        Some(Value::String(s)) => format!("string {s:?}"),
        Some(Value::Array(a)) => format!("an array of {} item(s)", a.len()),
        Some(Value::Object(_)) => "an object".to_string(),
    }
}
