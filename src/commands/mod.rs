//! Command implementations

pub mod export_members;
