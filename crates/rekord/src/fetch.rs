//! Concurrent fetch and verification of external entry material.
//!
//! The artifact is opened once and fanned out to two consumers: one computes
//! its digest, the other feeds it to the signature verifier once the
//! signature and public key are available. All five pieces run in one
//! `try_join!` group. The I/O tasks borrow the resolver and run inside the
//! group; the two hashing consumers own their branch and run as spawned
//! tasks, so they use separate worker threads. The first error ends the
//! group and drops every other task, aborting the spawned ones, which closes
//! both ends of the fan-out, so nothing is left waiting on a half-open
//! stream.

use std::future::Future;

use futures_util::StreamExt;
use rekord_source::tee::{self, Branch, FanOut};
use rekord_source::{Source, SourceResolver};
use rekord_verify::{
    ArtifactFactory, Digest, DigestAlgorithm, FormatRegistry, Hasher, MessageVerifier, PublicKey, Signature,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use crate::error::{EntryError, Material, Result};
use crate::options::FetchOptions;
use crate::validate::ValidatedSpec;

/// Material that survived a full fetch.
#[derive(Debug)]
pub(crate) struct Verified {
    pub format:     String,
    pub public_key: Box<dyn PublicKey>,
    pub signature:  Box<dyn Signature>,
    /// Declared digest if there was one, otherwise the computed digest.
    pub digest:     Digest,
}

#[tracing::instrument(name = "fetch", skip_all, fields(format = spec.format, artifact = %spec.artifact))]
pub(crate) async fn fetch_external_entities<R: SourceResolver>(
    spec: &ValidatedSpec<'_>,
    resolver: &R,
    formats: &FormatRegistry,
    options: &FetchOptions,
    cancel: &CancellationToken,
) -> Result<Verified> {
    let factory = formats
        .get(spec.format)
        .map_err(EntryError::VerificationCapability)?;

    let group = run_group(spec, resolver, factory.as_ref(), options);
    let bounded = async {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, group)
                .await
                .unwrap_or(Err(EntryError::TimedOut(limit))),
            None => group.await,
        }
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EntryError::Cancelled),
        result = bounded => result,
    };

    match &result {
        Ok(verified) => debug!(digest = %verified.digest, "external entities verified"),
        Err(err) => debug!(%err, "fetch failed"),
    }
    result
}

async fn run_group<R: SourceResolver>(
    spec: &ValidatedSpec<'_>,
    resolver: &R,
    factory: &dyn ArtifactFactory,
    options: &FetchOptions,
) -> Result<Verified> {
    let (fan_out, digest_branch, verify_branch) = tee::fan_out(options.pipe_capacity);
    let algorithm = spec
        .declared
        .as_ref()
        .map_or(DigestAlgorithm::default(), Digest::algorithm);

    let pump = pump_artifact(resolver, &spec.artifact, fan_out);
    let digest = join(spawn(compute_digest(digest_branch, algorithm, spec.declared.clone())));
    let signature = async {
        let bytes =
            read_material(resolver, &spec.signature, Material::Signature, options.max_material_bytes).await?;
        factory
            .new_signature(&bytes)
            .map_err(EntryError::VerificationCapability)
    };
    let public_key = async {
        let bytes =
            read_material(resolver, &spec.public_key, Material::PublicKey, options.max_material_bytes).await?;
        factory
            .new_public_key(&bytes)
            .map_err(EntryError::VerificationCapability)
    };
    let verify = verify_artifact(signature, public_key, verify_branch);

    let ((), digest, (signature, public_key)) = tokio::try_join!(pump, digest, verify)?;

    Ok(Verified {
        format: spec.format.to_string(),
        public_key,
        signature,
        digest: spec.declared.clone().unwrap_or(digest),
    })
}

/// Drain the artifact source into both branches of the fan-out.
async fn pump_artifact<R: SourceResolver>(resolver: &R, source: &Source, fan_out: FanOut) -> Result<()> {
    let mut stream = match resolver.resolve(source).await {
        Ok(stream) => stream,
        Err(err) => {
            fan_out.close_with_error(err.to_string());
            return Err(EntryError::SourceUnavailable {
                material: Material::Artifact,
                source:   err,
            });
        }
    };

    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => {
                total += chunk.len() as u64;
                fan_out.send(chunk).await?;
            }
            Err(err) => {
                fan_out.close_with_error(err.to_string());
                return Err(EntryError::SourceUnavailable {
                    material: Material::Artifact,
                    source:   err,
                });
            }
        }
    }

    fan_out.finish();
    debug!(bytes = total, "artifact stream complete");
    Ok(())
}

async fn compute_digest(mut branch: Branch, algorithm: DigestAlgorithm, declared: Option<Digest>) -> Result<Digest> {
    let mut hasher = algorithm.hasher();
    while let Some(chunk) = branch.next().await {
        hasher.update(&chunk?);
    }
    let computed = Digest::from_bytes(algorithm, &hasher.finalize());

    if let Some(declared) = &declared {
        if !declared.matches(&computed) {
            warn!(%declared, %computed, "declared digest does not match artifact");
            return Err(EntryError::DigestMismatch {
                declared: declared.value().to_string(),
                computed: computed.value().to_string(),
            });
        }
    }
    Ok(computed)
}

/// Read signature or key material into memory, up to `limit` bytes.
async fn read_material<R: SourceResolver>(
    resolver: &R,
    source: &Source,
    material: Material,
    limit: usize,
) -> Result<Vec<u8>> {
    let unavailable = |source| EntryError::SourceUnavailable { material, source };

    let mut stream = resolver.resolve(source).await.map_err(unavailable)?;
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(unavailable)?;
        if buf.len() + chunk.len() > limit {
            return Err(EntryError::MaterialTooLarge { material, limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Wait for both signature and key, then stream the artifact through the
/// signature's verifier.
async fn verify_artifact(
    signature: impl Future<Output = Result<Box<dyn Signature>>>,
    public_key: impl Future<Output = Result<Box<dyn PublicKey>>>,
    branch: Branch,
) -> Result<(Box<dyn Signature>, Box<dyn PublicKey>)> {
    let (signature, public_key) = tokio::try_join!(signature, public_key)?;
    debug!("signature and public key parsed");

    let verifier = signature
        .verifier(public_key.as_ref())
        .map_err(EntryError::VerificationCapability)?;
    join(spawn(feed_verifier(verifier, branch))).await?;

    Ok((signature, public_key))
}

async fn feed_verifier(mut verifier: Box<dyn MessageVerifier>, mut branch: Branch) -> Result<()> {
    while let Some(chunk) = branch.next().await {
        verifier.update(&chunk?);
    }
    verifier.finalize().map_err(EntryError::VerificationFailed)
}

/// Run a fan-out consumer on its own task. Dropping the handle aborts it.
fn spawn<T: Send + 'static>(task: impl Future<Output = Result<T>> + Send + 'static) -> AbortOnDropHandle<Result<T>> {
    AbortOnDropHandle::new(tokio::spawn(task))
}

async fn join<T>(handle: AbortOnDropHandle<Result<T>>) -> Result<T> {
    match handle.await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(EntryError::Cancelled),
    }
}
