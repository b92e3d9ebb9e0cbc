//! One-shot messages carried to the next rendered page.
//!
//! Messages are queued per category in the session under [`FLASH_KEY`].
//! Taking a category clears it, so each message renders exactly once.

use super::{Session, SessionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

type Queue = BTreeMap<FlashKind, Vec<String>>;

pub fn push(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), SessionError> {
    let mut queue: Queue = session.get(FLASH_KEY)?.unwrap_or_default();
    queue.entry(kind).or_default().push(message.into());
    session.insert(FLASH_KEY, queue)
}

/// Read and clear every queued message of one category
///
/// An empty category leaves the session untouched.
pub fn take(session: &Session, kind: FlashKind) -> Result<Vec<String>, SessionError> {
    let Some(mut queue) = session.get::<Queue>(FLASH_KEY)? else {
        return Ok(Vec::new());
    };

    let messages = queue.remove(&kind).unwrap_or_default();
    if messages.is_empty() {
        return Ok(messages);
    }

    if queue.is_empty() {
        session.remove_value(FLASH_KEY);
    } else {
        session.insert(FLASH_KEY, queue)?;
    }
    Ok(messages)
}
