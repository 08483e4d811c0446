//! Structural and cross-field validation.

use rekord_source::Source;
use rekord_verify::{Digest, DigestError};
use serde_json::Value;

use crate::error::{Material, ValidationError};
use crate::schema::{DeclaredHash, Origin, RekordSpec};

/// A spec that passed validation, reduced to what a fetch needs.
#[derive(Debug, Clone)]
pub struct ValidatedSpec<'a> {
    pub format:     &'a str,
    pub signature:  Source,
    pub public_key: Source,
    pub artifact:   Source,
    pub declared:   Option<Digest>,
    pub extra_data: Option<&'a Value>,
}

impl RekordSpec {
    /// Check required sections, source exclusivity and the declared digest.
    ///
    /// Pure: no collaborator is consulted.
    pub fn validate(&self) -> Result<ValidatedSpec<'_>, ValidationError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(ValidationError::MissingField("signature"))?;
        let signature_source = single_source(&signature.origin, Material::Signature)?;

        let public_key = signature
            .public_key
            .as_ref()
            .ok_or(ValidationError::MissingField("public key"))?;
        let public_key_source = single_source(public_key, Material::PublicKey)?;

        let format = signature
            .format
            .as_deref()
            .ok_or(ValidationError::MissingField("signature format"))?;

        let data = self.data.as_ref().ok_or(ValidationError::MissingField("data"))?;
        let artifact_source = single_source(&data.origin, Material::Artifact)?;

        let declared = data.hash.as_ref().map(parse_declared).transpose()?;

        Ok(ValidatedSpec {
            format,
            signature: signature_source,
            public_key: public_key_source,
            artifact: artifact_source,
            declared,
            extra_data: self.extra_data.as_ref(),
        })
    }

    /// Whether any material has to be fetched from a URL.
    pub fn references_urls(&self) -> bool {
        let signature = self.signature.as_ref();
        self.data.as_ref().is_some_and(|d| d.origin.url.is_some())
            || signature.is_some_and(|s| s.origin.url.is_some())
            || signature
                .and_then(|s| s.public_key.as_ref())
                .is_some_and(|k| k.url.is_some())
    }
}

fn single_source(origin: &Origin, material: Material) -> Result<Source, ValidationError> {
    match (&origin.content, &origin.url) {
        (Some(content), None) => Ok(Source::Inline(content.clone())),
        (None, Some(url)) => Ok(Source::Remote(url.clone())),
        _ => Err(ValidationError::AmbiguousOrEmptySource(material)),
    }
}

/// A declared hash with a missing part is an invalid digest, not a missing
/// section.
fn parse_declared(hash: &DeclaredHash) -> Result<Digest, ValidationError> {
    let algorithm = hash.algorithm.as_deref().ok_or(DigestError::Missing("algorithm"))?;
    let value = hash.value.as_deref().ok_or(DigestError::Missing("value"))?;
    Ok(Digest::parse(algorithm, value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataSection, SignatureSection};
    use bytes::Bytes;
    use rekord_verify::DigestAlgorithm;
    use url::Url;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn inline(content: &'static [u8]) -> Origin {
        Origin {
            content: Some(Bytes::from_static(content)),
            url:     None,
        }
    }

    fn remote(url: &str) -> Origin {
        Origin {
            content: None,
            url:     Some(Url::parse(url).unwrap()),
        }
    }

    fn valid_spec() -> RekordSpec {
        RekordSpec {
            signature:  Some(SignatureSection {
                format:     Some("ed25519ph".to_string()),
                origin:     inline(b"sig"),
                public_key: Some(remote("https://example.com/key.pem")),
            }),
            data:       Some(DataSection {
                origin: inline(b"hello world"),
                hash:   Some(DeclaredHash {
                    algorithm: Some("sha256".to_string()),
                    value:     Some(HELLO_SHA256.to_string()),
                }),
            }),
            extra_data: None,
        }
    }

    #[test]
    fn test_valid_spec() {
        let spec = valid_spec();
        let validated = spec.validate().unwrap();
        assert_eq!(validated.format, "ed25519ph");
        assert!(validated.public_key.is_remote());
        assert!(!validated.artifact.is_remote());
        assert_eq!(
            validated.declared,
            Some(Digest::compute(DigestAlgorithm::Sha256, b"hello world"))
        );
    }

    #[test]
    fn test_missing_sections() {
        let mut spec = valid_spec();
        spec.signature = None;
        assert_eq!(spec.validate().unwrap_err(), ValidationError::MissingField("signature"));

        let mut spec = valid_spec();
        spec.signature.as_mut().unwrap().public_key = None;
        assert_eq!(spec.validate().unwrap_err(), ValidationError::MissingField("public key"));

        let mut spec = valid_spec();
        spec.data = None;
        assert_eq!(spec.validate().unwrap_err(), ValidationError::MissingField("data"));

        let mut spec = valid_spec();
        spec.signature.as_mut().unwrap().format = None;
        assert_eq!(
            spec.validate().unwrap_err(),
            ValidationError::MissingField("signature format")
        );
    }

    #[test]
    fn test_empty_source() {
        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().origin = Origin::default();
        assert_eq!(
            spec.validate().unwrap_err(),
            ValidationError::AmbiguousOrEmptySource(Material::Artifact)
        );
    }

    #[test]
    fn test_ambiguous_source() {
        let mut spec = valid_spec();
        spec.signature.as_mut().unwrap().public_key = Some(Origin {
            content: Some(Bytes::from_static(b"key")),
            url:     Some(Url::parse("https://example.com/key.pem").unwrap()),
        });
        assert_eq!(
            spec.validate().unwrap_err(),
            ValidationError::AmbiguousOrEmptySource(Material::PublicKey)
        );
    }

    #[test]
    fn test_invalid_digest() {
        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().hash.as_mut().unwrap().value = Some("abc".to_string());
        assert!(matches!(
            spec.validate().unwrap_err(),
            ValidationError::InvalidDigest(DigestError::InvalidLength { .. })
        ));

        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().hash.as_mut().unwrap().algorithm = Some("crc32".to_string());
        assert!(matches!(
            spec.validate().unwrap_err(),
            ValidationError::InvalidDigest(DigestError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_incomplete_declared_digest() {
        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().hash = Some(DeclaredHash {
            algorithm: None,
            value:     None,
        });
        assert_eq!(
            spec.validate().unwrap_err(),
            ValidationError::InvalidDigest(DigestError::Missing("algorithm"))
        );

        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().hash.as_mut().unwrap().value = None;
        assert_eq!(
            spec.validate().unwrap_err(),
            ValidationError::InvalidDigest(DigestError::Missing("value"))
        );
    }

    #[test]
    fn test_no_declared_digest() {
        let mut spec = valid_spec();
        spec.data.as_mut().unwrap().hash = None;
        assert_eq!(spec.validate().unwrap().declared, None);
    }

    #[test]
    fn test_references_urls() {
        let spec = valid_spec();
        assert!(spec.references_urls());

        let mut inline_only = valid_spec();
        inline_only.signature.as_mut().unwrap().public_key = Some(inline(b"key"));
        assert!(!inline_only.references_urls());
    }
}
