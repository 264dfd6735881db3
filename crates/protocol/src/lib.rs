//! Shared types for the Playdock acquisition pipeline.
//!
//! Everything the pipeline persists or sends to the UI collaborator lives
//! here: the profile data model, install records, normalized transfer
//! statistics, the observer event stream, and command replies.

mod events;
mod types;

pub use events::ObserverEvent;
pub use types::{CommandReply, GameRecord, InstallRecord, Profile, TransferStats, UserInfo};
