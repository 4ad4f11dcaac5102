//! Key codec: typed field sets to physical key attribute values.
//!
//! Pure functions following the single-table design. Composite values look
//! like `Purchase#userId-1208493`: a descriptor followed by `field-value`
//! pairs joined by the configured separator.

mod codec;
mod error;
mod storage;

pub use codec::{
    encode, EncodedKey, KeyFormat, KeyPart, NumberPadding, DEFAULT_FRACTION_WIDTH,
    DEFAULT_INTEGER_WIDTH, DEFAULT_SEPARATOR,
};
pub use error::KeyError;
pub use storage::{format_for_storage, primary_key};
