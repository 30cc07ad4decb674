// src/core/mod.rs

pub mod net;
pub mod sanitize;
pub mod tree;
pub mod xml;

pub use net::Fetch;
pub use xml::{parse, Node};
