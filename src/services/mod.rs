pub mod migrator;
pub mod staging;
pub mod storage;
