//! journal - Personal journal with PDF attachments on a hosted backend

pub mod backend;
pub mod config;
pub mod entries;
pub mod utils;
