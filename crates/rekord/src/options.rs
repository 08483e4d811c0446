use std::time::Duration;

/// Configuration for fetching and verifying entry material.
///
/// # Examples
///
/// ```
/// use rekord::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .pipe_capacity(32)
///     .max_material_bytes(16 * 1024)
///     .timeout(Duration::from_secs(30));
/// assert_eq!(options.pipe_capacity, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Chunks buffered per consumer of the artifact fan-out.
    ///
    /// The artifact producer waits whenever either the digest or the
    /// verification side has this many chunks outstanding. Values below 1
    /// are treated as 1.
    ///
    /// Default: 16
    pub pipe_capacity: usize,

    /// Upper bound on signature and public key material.
    ///
    /// Unlike the artifact, these are read fully into memory before being
    /// parsed, so they are capped.
    ///
    /// Default: 64 KiB
    pub max_material_bytes: usize,

    /// Deadline for one whole fetch, all sources included.
    ///
    /// Default: None
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            pipe_capacity:      16,
            max_material_bytes: 64 * 1024,
            timeout:            None,
        }
    }
}

impl FetchOptions {
    pub fn pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity;
        self
    }

    pub fn max_material_bytes(mut self, limit: usize) -> Self {
        self.max_material_bytes = limit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
