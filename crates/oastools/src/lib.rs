#[macro_use]
extern crate lazy_static;

pub mod analysis;
pub mod document;
pub mod error;
pub mod overlay;
pub mod path;
pub mod tree;

pub const VERSION: &str = "0.3.0";
