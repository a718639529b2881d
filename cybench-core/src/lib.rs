mod client;
mod neo4j;
mod workload;

pub mod runner;

pub use client::{ClientError, CypherClient, ErrorCategory};
pub use neo4j::{EncryptionMode, Neo4jClient};
pub use workload::{ClientWorkload, Workload};
