// Adapters layer: concrete implementations for the ticketing API, the navigation API
// and the local dedup store.

pub mod dedup_store;
pub mod destination;
pub mod source;

pub use dedup_store::SqliteDedupStore;
pub use destination::NavigationClient;
pub use source::TicketingClient;
