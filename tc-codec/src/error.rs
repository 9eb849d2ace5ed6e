use std::fmt;

use bytes::Bytes;
use tc_nla::{Nla, NlaError};
use thiserror::Error;

use crate::config::ErrorPolicy;

/// Result alias used throughout the codec.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while decoding or encoding tc attributes.
#[derive(Debug, Error)]
pub enum Error {
    /// The attribute stream itself is malformed.
    #[error("malformed attribute data: {0}")]
    Nla(#[from] NlaError),
    /// An attribute tag outside the schema of `context`.
    #[error("unknown {context} attribute {tag}: {payload:?}")]
    UnknownAttribute { context: &'static str, tag: u16, payload: Bytes },
    /// No registry entry for this kind.
    #[error("unknown kind {0:?}")]
    UnknownKind(String),
    /// The kind exists but carries no extended statistics.
    #[error("kind {0:?} has no extended statistics")]
    UnsupportedXStats(String),
    /// The kind exists but has no separate qdisc-level options schema.
    #[error("kind {0:?} has no qdisc-specific class options")]
    NoClassOptions(String),
    /// A parameterless kind was handed an options payload.
    #[error("{kind} is parameterless, got {len} bytes of options")]
    UnexpectedPayload { kind: &'static str, len: usize },
    /// An extended match of a kind this codec does not decode.
    #[error("unknown ematch kind {0}")]
    UnknownEmatchKind(u16),
    /// A record was attached to an attribute of a different kind.
    #[error("{record} record cannot be encoded as kind {kind:?}")]
    KindMismatch { kind: String, record: &'static str },
    /// Encoding was asked for a record without any populated field.
    #[error("{0}: no argument supplied")]
    NoArgument(&'static str),
    /// One or more attributes failed to decode.
    #[error(transparent)]
    Fields(FieldErrors),
}

impl Error {
    pub(crate) fn unknown_attribute(context: &'static str, nla: &Nla<'_>) -> Self {
        Self::UnknownAttribute { context, tag: nla.kind(), payload: nla.to_bytes() }
    }

    /// Returns true if the error was caused by how the codec was called rather than by
    /// the data handed to it.
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::NoArgument(_) | Self::NoClassOptions(_) | Self::KindMismatch { .. })
    }
}

/// Every attribute that failed to decode during one walk, in wire order.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<(u16, Error)>,
}

impl FieldErrors {
    /// Records that the attribute `tag` failed with `error`.
    pub fn push(&mut self, tag: u16, error: Error) {
        self.errors.push((tag, error));
    }

    /// Number of failed attributes.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over `(tag, error)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Error)> {
        self.errors.iter().map(|(tag, err)| (*tag, err))
    }

    /// The failing tags, in the order they were seen.
    pub fn tags(&self) -> Vec<u16> {
        self.errors.iter().map(|(tag, _)| *tag).collect()
    }

    /// `Ok` if nothing was recorded, otherwise the whole collection as an [`Error`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Fields(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attribute(s) failed to decode", self.errors.len())?;
        for (tag, err) in &self.errors {
            write!(f, "; attribute {tag}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl IntoIterator for FieldErrors {
    type Item = (u16, Error);
    type IntoIter = std::vec::IntoIter<(u16, Error)>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Applies the [`ErrorPolicy`] to the sub-decodes of a single walk.
#[derive(Debug)]
pub(crate) struct Collector {
    policy: ErrorPolicy,
    errors: FieldErrors,
}

impl Collector {
    pub(crate) fn new(policy: ErrorPolicy) -> Self {
        Self { policy, errors: FieldErrors::default() }
    }

    /// Passes a successful sub-decode through. A failure is either returned right away or
    /// recorded against `tag`, in which case the field is left unset and the walk goes on.
    pub(crate) fn check<T, E: Into<Error>>(
        &mut self,
        tag: u16,
        result: Result<T, E>,
    ) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.policy {
                ErrorPolicy::FirstFailure => Err(err.into()),
                ErrorPolicy::CollectAll => {
                    self.errors.push(tag, err.into());
                    Ok(None)
                }
            },
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        self.errors.into_result()
    }
}
