//! Synchronization primitives

pub mod semaphore;

pub use semaphore::Semaphore;
