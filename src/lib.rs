pub mod batch;
pub mod bench;
pub mod errors;
pub mod memory;
pub mod report;
pub mod stats;
pub mod timing;
pub mod types;
