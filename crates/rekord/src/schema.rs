//! The rekord v0.0.1 schema.
//!
//! Proposed entries arrive as JSON. The `spec` object is first read into
//! plain wire structs, then converted field by field into [`RekordSpec`]:
//! base64 `content` fields are decoded and `url` fields parsed here, at the
//! boundary, so the rest of the crate only handles typed values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;

/// Entry kind this crate implements.
pub const KIND: &str = "rekord";

/// Schema revision this crate implements.
pub const API_VERSION: &str = "0.0.1";

/// Untrusted entry envelope as submitted to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedEntry {
    pub kind:        String,
    pub api_version: String,
    pub spec:        Value,
}

impl ProposedEntry {
    pub fn new(spec: Value) -> Self {
        Self {
            kind: KIND.to_string(),
            api_version: API_VERSION.to_string(),
            spec,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(bytes).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

/// Content given inline, by URL, or (invalidly) both or neither.
///
/// Empty content and empty URLs count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub content: Option<Bytes>,
    pub url:     Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSection {
    pub format:     Option<String>,
    pub origin:     Origin,
    pub public_key: Option<Origin>,
}

/// Caller-declared artifact digest, kept as submitted until validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredHash {
    pub algorithm: Option<String>,
    pub value:     Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSection {
    pub origin: Origin,
    pub hash:   Option<DeclaredHash>,
}

/// Decoded, not yet validated, rekord spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RekordSpec {
    pub signature:  Option<SignatureSection>,
    pub data:       Option<DataSection>,
    pub extra_data: Option<Value>,
}

impl RekordSpec {
    /// Decode the `spec` object of a proposed entry.
    pub fn decode(spec: &Value) -> Result<Self, ValidationError> {
        let wire = WireSpec::deserialize(spec).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let signature = wire
            .signature
            .map(|sig| -> Result<_, ValidationError> {
                Ok(SignatureSection {
                    format:     sig.format.filter(|f| !f.is_empty()),
                    origin:     decode_origin("signature", sig.content, sig.url)?,
                    public_key: sig
                        .public_key
                        .map(|key| decode_origin("signature.publicKey", key.content, key.url))
                        .transpose()?,
                })
            })
            .transpose()?;

        let data = wire
            .data
            .map(|data| -> Result<_, ValidationError> {
                Ok(DataSection {
                    origin: decode_origin("data", data.content, data.url)?,
                    hash:   data.hash.map(|hash| DeclaredHash {
                        algorithm: hash.algorithm.filter(|a| !a.is_empty()),
                        value:     hash.value.filter(|v| !v.is_empty()),
                    }),
                })
            })
            .transpose()?;

        Ok(Self {
            signature,
            data,
            extra_data: wire.extra_data,
        })
    }
}

fn decode_origin(
    field: &str,
    content: Option<String>,
    url: Option<String>,
) -> Result<Origin, ValidationError> {
    let content = content
        .filter(|c| !c.is_empty())
        .map(|c| {
            STANDARD
                .decode(c.as_bytes())
                .map(Bytes::from)
                .map_err(|e| ValidationError::Malformed(format!("{field}.content: invalid base64: {e}")))
        })
        .transpose()?
        .filter(|c| !c.is_empty());

    let url = url
        .filter(|u| !u.is_empty())
        .map(|u| Url::parse(&u).map_err(|e| ValidationError::Malformed(format!("{field}.url: {e}"))))
        .transpose()?;

    Ok(Origin { content, url })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSpec {
    signature:  Option<WireSignature>,
    data:       Option<WireData>,
    extra_data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSignature {
    format:     Option<String>,
    content:    Option<String>,
    url:        Option<String>,
    public_key: Option<WirePublicKey>,
}

#[derive(Deserialize)]
struct WirePublicKey {
    content: Option<String>,
    url:     Option<String>,
}

#[derive(Deserialize)]
struct WireData {
    content: Option<String>,
    url:     Option<String>,
    hash:    Option<WireHash>,
}

#[derive(Deserialize)]
struct WireHash {
    algorithm: Option<String>,
    value:     Option<String>,
}
