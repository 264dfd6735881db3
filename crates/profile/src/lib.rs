//! Durable profile storage.
//!
//! The profile lives in a single pretty-printed JSON file. Loading is
//! lenient: a missing, empty or structurally broken file yields a default
//! profile instead of an error, and absent fields are back-filled so
//! downstream code can assume presence. Saving goes through a sibling
//! temp file renamed over the target; failures are logged, never raised.

mod store;

pub use store::{PROFILE_FILE, ProfileStore};
