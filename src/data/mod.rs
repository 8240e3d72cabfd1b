//! Static data tables

pub mod macros;
