//! Change-stream record wire model.
//!
//! The event log emits mutation records whose attributes are tagged,
//! self-describing values. Only the binary `payload` attribute is consumed
//! by the projector, but the full variant set is modeled so any record on
//! the wire decodes without field probing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Self-describing tagged value carried by change-stream records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String.
    S(String),

    /// Number, transported as a decimal string.
    N(String),

    /// Binary, transported as base64 text.
    B(String),

    /// Boolean.
    #[serde(rename = "BOOL")]
    Bool(bool),

    /// Null marker.
    #[serde(rename = "NULL")]
    Null(bool),

    /// String set.
    SS(Vec<String>),

    /// Number set.
    NS(Vec<String>),

    /// Binary set.
    BS(Vec<String>),

    /// Ordered list of tagged values.
    L(Vec<AttributeValue>),

    /// Nested mapping.
    M(HashMap<String, AttributeValue>),
}

/// A batch of change records as delivered by the stream consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBatch {
    pub records: Vec<StreamRecord>,
}

impl StreamBatch {
    pub fn new(records: Vec<StreamRecord>) -> Self {
        Self { records }
    }
}

/// One mutation record. Partial records do occur on the wire, so every
/// layer of the body is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RecordBody>,
}

impl StreamRecord {
    /// A record carrying a complete new image.
    pub fn with_image(new_image: HashMap<String, AttributeValue>) -> Self {
        Self {
            body: Some(RecordBody {
                new_image: Some(new_image),
            }),
        }
    }
}

/// The structured body of a change record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBody {
    /// The item's attribute values after the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<HashMap<String, AttributeValue>>,
}
