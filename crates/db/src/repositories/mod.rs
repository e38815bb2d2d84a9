pub mod cwv_aggregate_repo;
pub mod cwv_sample_repo;

pub use cwv_aggregate_repo::CwvAggregateRepo;
pub use cwv_sample_repo::CwvSampleRepo;
