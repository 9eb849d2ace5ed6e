//! Decoder configuration.

/// What to do when a recognized attribute fails to decode.
///
/// Unknown tags and malformed attribute headers always abort the walk; this only governs
/// failures inside a known attribute, such as a short statistics struct or a broken
/// nested policing descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep walking and report every failing tag together in
    /// [`Error::Fields`](crate::Error::Fields).
    #[default]
    CollectAll,
    /// Stop at the first failing attribute and return its error as is.
    FirstFailure,
}

/// Options for [`resolve_with`](crate::resolve_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeConfig {
    /// How field errors found during a walk are reported.
    pub error_policy: ErrorPolicy,
}

impl DecodeConfig {
    /// Creates the default configuration, which collects all field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy for failing sub-decodes.
    pub const fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}
