//! Core domain types for DDEX Courier

mod asset;
mod batch;
mod delivery;
mod duration;
mod record;

pub use asset::AssetKind;
pub use batch::BatchContext;
pub use delivery::{DeliveryOutcome, DestinationKey};
pub use duration::{format_duration, TrackDuration, ZERO_DURATION};
pub use record::{defaults, MetadataRecord};
