//! Canonical encoding of a verified entry.
//!
//! Field order is fixed by the struct declarations below. Only the
//! canonical key and signature bytes and the artifact digest are emitted;
//! inline content and URLs never are. `extraData` is copied as given.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;

use crate::error::{EntryError, Result};
use crate::fetch::Verified;
use crate::schema::{API_VERSION, KIND};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalEntry<'a> {
    kind:        &'a str,
    api_version: &'a str,
    spec:        CanonicalSpec<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalSpec<'a> {
    signature:  CanonicalSignature<'a>,
    data:       CanonicalData<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_data: Option<&'a Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalSignature<'a> {
    format:     &'a str,
    content:    String,
    public_key: CanonicalPublicKey,
}

#[derive(Serialize)]
struct CanonicalPublicKey {
    content: String,
}

#[derive(Serialize)]
struct CanonicalData<'a> {
    hash: CanonicalHash<'a>,
}

#[derive(Serialize)]
struct CanonicalHash<'a> {
    algorithm: &'a str,
    value:     &'a str,
}

pub(crate) fn encode(verified: &Verified, extra_data: Option<&Value>) -> Result<Vec<u8>> {
    let signature = verified
        .signature
        .canonical_value()
        .map_err(EntryError::VerificationCapability)?;
    let public_key = verified
        .public_key
        .canonical_value()
        .map_err(EntryError::VerificationCapability)?;

    let entry = CanonicalEntry {
        kind:        KIND,
        api_version: API_VERSION,
        spec:        CanonicalSpec {
            signature: CanonicalSignature {
                format:     &verified.format,
                content:    STANDARD.encode(signature),
                public_key: CanonicalPublicKey {
                    content: STANDARD.encode(public_key),
                },
            },
            data: CanonicalData {
                hash: CanonicalHash {
                    algorithm: verified.digest.algorithm().as_str(),
                    value:     verified.digest.value(),
                },
            },
            extra_data,
        },
    };

    Ok(serde_json::to_vec(&entry)?)
}
