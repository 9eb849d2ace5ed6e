//! The parameterless `ingress` and `clsact` qdiscs.
//!
//! Both only provide attachment points for filters and never carry options.

use crate::error::{Error, Result};

/// Accepts an empty options payload for the parameterless `kind`.
pub(crate) fn parameterless(kind: &'static str, data: &[u8]) -> Result<()> {
    if !data.is_empty() {
        return Err(Error::UnexpectedPayload { kind, len: data.len() });
    }
    Ok(())
}
