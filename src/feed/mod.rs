//! Feed documents: parsing wire feeds and rendering the merged Atom feed.

pub mod encoder;
pub mod parser;
pub mod types;

pub use encoder::render_atom;
pub use parser::parse_feed;
pub use types::{RawAuthor, RawFeed, RawItem, RawMedia};
