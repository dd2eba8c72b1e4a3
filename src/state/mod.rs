//! State module for the values that flow through a crawl
//!
//! # Components
//!
//! - `WorkItem`: a page scheduled for fetching, with its depth and origin
//! - `LinkVerdict`: the classification of one discovered link
//! - `Broken`: a terminal fetch failure, before it is attached to a link

mod verdict;
mod work_item;

// Re-export main types
pub use verdict::{Broken, Classification, LinkVerdict};
pub use work_item::WorkItem;
