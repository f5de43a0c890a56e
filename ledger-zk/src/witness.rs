//! Witness assembly.
//!
//! A witness groups the encoded components of one transaction by the role
//! they play. Which groups a command's circuit expects, and how many
//! components each holds, comes from [`CommandMetadata`]; the builder refuses
//! to produce a witness that disagrees with it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::codec::{CodecError, CodecRegistry, Scheme};

/// Transaction component groups, in witness field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentGroup {
    Inputs,
    Outputs,
    References,
    Commands,
    Attachments,
    Notary,
    TimeWindow,
    Signers,
    Parameters,
    PrivacySalt,
    SerializedInputUtxos,
    InputNonces,
    SerializedReferenceUtxos,
    ReferenceNonces,
}

impl ComponentGroup {
    pub const ALL: [ComponentGroup; 14] = [
        ComponentGroup::Inputs,
        ComponentGroup::Outputs,
        ComponentGroup::References,
        ComponentGroup::Commands,
        ComponentGroup::Attachments,
        ComponentGroup::Notary,
        ComponentGroup::TimeWindow,
        ComponentGroup::Signers,
        ComponentGroup::Parameters,
        ComponentGroup::PrivacySalt,
        ComponentGroup::SerializedInputUtxos,
        ComponentGroup::InputNonces,
        ComponentGroup::SerializedReferenceUtxos,
        ComponentGroup::ReferenceNonces,
    ];

    /// Field name in the witness JSON.
    pub fn field_name(self) -> &'static str {
        match self {
            ComponentGroup::Inputs => "inputs",
            ComponentGroup::Outputs => "outputs",
            ComponentGroup::References => "references",
            ComponentGroup::Commands => "commands",
            ComponentGroup::Attachments => "attachments",
            ComponentGroup::Notary => "notary",
            ComponentGroup::TimeWindow => "time_window",
            ComponentGroup::Signers => "signers",
            ComponentGroup::Parameters => "parameters",
            ComponentGroup::PrivacySalt => "privacy_salt",
            ComponentGroup::SerializedInputUtxos => "serialized_input_utxos",
            ComponentGroup::InputNonces => "input_nonces",
            ComponentGroup::SerializedReferenceUtxos => "serialized_reference_utxos",
            ComponentGroup::ReferenceNonces => "reference_nonces",
        }
    }

    /// Groups holding at most one component; rendered as a flat array.
    pub fn is_singular(self) -> bool {
        matches!(
            self,
            ComponentGroup::Notary
                | ComponentGroup::TimeWindow
                | ComponentGroup::Parameters
                | ComponentGroup::PrivacySalt
        )
    }
}

impl fmt::Display for ComponentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("encoding {group} component: {source}")]
    Codec {
        group: ComponentGroup,
        #[source]
        source: CodecError,
    },

    #[error("command {command} does not declare the {group} group")]
    UndeclaredGroup {
        command: String,
        group: ComponentGroup,
    },

    #[error("command {command} expects {expected} {group} components, got {actual}")]
    CountMismatch {
        command: String,
        group: ComponentGroup,
        expected: usize,
        actual: usize,
    },

    #[error("{group} holds components of different lengths ({first} and {other} units)")]
    RaggedGroup {
        group: ComponentGroup,
        first: usize,
        other: usize,
    },

    #[error("{group} holds at most one component, metadata declares {declared}")]
    SingularGroup { group: ComponentGroup, declared: usize },
}

/// Expected witness shape of one provable command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub command: String,
    #[serde(default)]
    pub groups: BTreeMap<ComponentGroup, usize>,
}

impl CommandMetadata {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Declares that `group` carries exactly `count` components.
    pub fn expect(mut self, group: ComponentGroup, count: usize) -> Self {
        self.groups.insert(group, count);
        self
    }

    pub fn expected(&self, group: ComponentGroup) -> Option<usize> {
        self.groups.get(&group).copied()
    }

    /// Groups that must appear in the witness, even when empty.
    pub fn mandatory_groups(&self) -> impl Iterator<Item = ComponentGroup> + '_ {
        self.groups.keys().copied()
    }
}

/// Encoded components of one proving request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    scheme: Scheme,
    groups: BTreeMap<ComponentGroup, Vec<Vec<u8>>>,
}

impl Witness {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn group(&self, group: ComponentGroup) -> Option<&[Vec<u8>]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = (ComponentGroup, &[Vec<u8>])> {
        self.groups.iter().map(|(group, items)| (*group, items.as_slice()))
    }

    /// Total encoded units across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON object with one field per declared group.
    ///
    /// Singular groups render as one unit array (empty when the group is
    /// declared with no component); the others as an array of unit arrays.
    pub fn to_json(&self) -> Value {
        let mut fields = Map::new();
        for (group, items) in &self.groups {
            let rendered = if group.is_singular() {
                Value::from(items.first().cloned().unwrap_or_default())
            } else {
                Value::from(items.clone())
            };
            fields.insert(group.field_name().to_string(), rendered);
        }
        let mut root = Map::new();
        root.insert("witness".to_string(), Value::Object(fields));
        Value::Object(root)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

/// Collects encoded components and checks them against command metadata.
pub struct WitnessBuilder<'r> {
    registry: &'r CodecRegistry,
    scheme: Scheme,
    groups: BTreeMap<ComponentGroup, Vec<Vec<u8>>>,
}

impl<'r> WitnessBuilder<'r> {
    pub fn new(registry: &'r CodecRegistry, scheme: Scheme) -> Self {
        Self {
            registry,
            scheme,
            groups: BTreeMap::new(),
        }
    }

    /// Encodes `value` with the codec registered for `T` and appends it to `group`.
    pub fn add<T: 'static>(&mut self, group: ComponentGroup, value: &T) -> Result<&mut Self, WitnessError> {
        let units = self
            .registry
            .encode(value, self.scheme)
            .map_err(|source| WitnessError::Codec { group, source })?;
        self.groups.entry(group).or_default().push(units);
        Ok(self)
    }

    pub fn add_all<'v, T, I>(&mut self, group: ComponentGroup, values: I) -> Result<&mut Self, WitnessError>
    where
        T: 'static,
        I: IntoIterator<Item = &'v T>,
    {
        self.groups.entry(group).or_default();
        for value in values {
            self.add(group, value)?;
        }
        Ok(self)
    }

    /// Appends units that were encoded elsewhere with the same scheme.
    pub fn add_encoded(&mut self, group: ComponentGroup, units: Vec<u8>) -> &mut Self {
        self.groups.entry(group).or_default().push(units);
        self
    }

    pub fn build(self, metadata: &CommandMetadata) -> Result<Witness, WitnessError> {
        let mut groups = self.groups;

        if let Some(group) = groups.keys().find(|group| metadata.expected(**group).is_none()) {
            return Err(WitnessError::UndeclaredGroup {
                command: metadata.command.clone(),
                group: *group,
            });
        }

        for (group, expected) in &metadata.groups {
            if group.is_singular() && *expected > 1 {
                return Err(WitnessError::SingularGroup {
                    group: *group,
                    declared: *expected,
                });
            }
            let items = groups.entry(*group).or_default();
            if items.len() != *expected {
                return Err(WitnessError::CountMismatch {
                    command: metadata.command.clone(),
                    group: *group,
                    expected: *expected,
                    actual: items.len(),
                });
            }
            if let Some(first) = items.first().map(Vec::len) {
                if let Some(other) = items.iter().map(Vec::len).find(|len| *len != first) {
                    return Err(WitnessError::RaggedGroup {
                        group: *group,
                        first,
                        other,
                    });
                }
            }
        }

        Ok(Witness {
            scheme: self.scheme,
            groups,
        })
    }
}
