use serde::{Deserialize, Serialize};

/// Caller role embedded in the bearer token.
///
/// Workers submit screening records for their own kendra; admins review
/// records across submitters but never create them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Admin,
}
