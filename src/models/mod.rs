// src/models/mod.rs

pub mod attempt;
pub mod identity;
pub mod import;
pub mod question;
pub mod subject;
