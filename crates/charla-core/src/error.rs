use thiserror::Error;

/// An endpoint probe failed.
///
/// Every probe failure (transport error, timeout, non-200 status)
/// collapses to this one value; the cause is logged where the probe
/// runs and never carried to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to connect to server")]
pub struct ConnectError;
