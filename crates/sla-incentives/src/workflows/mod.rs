pub mod bonus;
pub mod ingest;
pub mod sla;
