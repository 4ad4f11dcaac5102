//! Opaque continuation tokens.
//!
//! A cursor is the store's last-evaluated key rendered as JSON and encoded
//! as URL-safe base64, so callers can pass it around without caring about
//! its structure.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::item::Item;

use super::QueryError;

pub fn encode_cursor(last_evaluated_key: &Item) -> String {
    URL_SAFE_NO_PAD.encode(crate::item::canonical(last_evaluated_key))
}

pub fn decode_cursor(cursor: &str) -> Result<Item, QueryError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| QueryError::InvalidCursor(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| QueryError::InvalidCursor(e.to_string()))
}
