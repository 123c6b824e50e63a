pub mod engine;
pub mod identity;
pub mod report;

pub use crate::domain::model::{Itinerary, ManifestEntry, Port, SyncMode, SyncRun};
pub use crate::domain::ports::{DedupStore, DestinationApi, SourceApi};
pub use crate::utils::error::Result;
pub use engine::{SyncEngine, SyncOptions};
pub use identity::{IdentityResolver, ItineraryIdentity};
pub use report::{ItineraryReport, PortReport, SyncCounters, SyncFailure, SyncReport};
