use super::Subject;

/// The single live session of a subject: only the hash of the current
/// refresh token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject: Subject,
    pub token_hash: String,
}
