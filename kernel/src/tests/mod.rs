//! Kernel Scenario Tests
//!
//! Cross-module tests that drive the syscall surface and the process
//! manager together over the in-memory collaborators.
