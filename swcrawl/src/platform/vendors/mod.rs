//! Vendor platform definitions.

pub mod cisco_ios;
