use url::Url;

/// One unit of crawl work: a page to fetch at a given depth
///
/// Work items are never mutated. A worker that discovers a crawlable link
/// creates a new child item instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    url: Url,
    depth: u32,
    origin: Url,
}

impl WorkItem {
    /// The seed item: depth 0, and its own origin
    pub fn seed(url: Url) -> Self {
        Self {
            origin: url.clone(),
            url,
            depth: 0,
        }
    }

    /// An item one level below `self`, discovered on `self`'s page
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth + 1,
            origin: self.url.clone(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The page that referenced this one
    pub fn origin(&self) -> &Url {
        &self.origin
    }
}
