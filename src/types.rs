//! Core identifier types shared across the vault.

/// RecordID: identifier assigned to an artifact by the remote service
pub type RecordID = String;

/// SessionID: identifier of a session an artifact is associated with
pub type SessionID = String;

/// Generation counter used to fence stale background writes
pub type Generation = u64;
