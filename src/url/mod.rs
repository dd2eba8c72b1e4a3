//! URL handling module for Link-Ripple
//!
//! This module provides URL normalization, relative link resolution, and the
//! same-site test that keeps a crawl on one website.

mod normalize;
mod scope;

pub use normalize::{normalize, normalize_url, resolve_link};
pub use scope::{DomainPattern, SiteScope};
