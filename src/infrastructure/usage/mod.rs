//! Usage infrastructure implementations

mod service;
mod storage_repository;

pub use service::UsageService;
pub use storage_repository::StorageUsageRepository;
