// Application layer: wires configuration, adapters and the sync engine together.

pub mod sync_job;

pub use sync_job::SyncJob;
