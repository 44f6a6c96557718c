// src/exam/mod.rs

//! Exam session state machine and everything that drives it.

pub mod integrity;
pub mod registry;
pub mod repository;
pub mod results;
pub mod scoring;
pub mod session;
pub mod status;
pub mod timer;
