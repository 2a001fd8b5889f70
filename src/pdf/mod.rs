//! Page-addressable document operations over lopdf.

pub mod extract;
pub mod overlay;

pub use extract::extract_pages;
pub use overlay::Stamper;
