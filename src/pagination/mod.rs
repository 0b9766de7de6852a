//! Pagination handling for the OneDrive API.
//!
//! Collections are paged by link: each page may carry an absolute
//! `@odata.nextLink` that is requested verbatim to get the following page.

use crate::errors::OneDriveResult;
use crate::types::{DeltaPage, Item, ItemCollectionPage};
use std::future::Future;
use std::marker::PhantomData;

/// A page of a link-paged collection.
pub trait Paginated {
    /// Item type.
    type Item;

    /// Link to the next page. Empty links count as absent.
    fn next_link(&self) -> Option<&str>;

    /// Number of items on this page.
    fn len(&self) -> usize;

    /// Returns true if this page has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the page, returning its items.
    fn into_items(self) -> Vec<Self::Item>;
}

impl Paginated for ItemCollectionPage {
    type Item = Item;

    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|l| !l.is_empty())
    }

    fn len(&self) -> usize {
        self.value.len()
    }

    fn into_items(self) -> Vec<Item> {
        self.value
    }
}

impl Paginated for DeltaPage {
    type Item = Item;

    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref().filter(|l| !l.is_empty())
    }

    fn len(&self) -> usize {
        self.value.len()
    }

    fn into_items(self) -> Vec<Item> {
        self.value
    }
}

/// Iterator over all pages.
///
/// The fetch function receives `None` for the first page and the previous
/// page's next link afterwards.
pub struct PageIterator<P, F, Fut>
where
    P: Paginated,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = OneDriveResult<P>>,
{
    fetch_fn: F,
    next_link: Option<String>,
    done: bool,
    stop_on_empty: bool,
    _marker: PhantomData<P>,
}

impl<P, F, Fut> PageIterator<P, F, Fut>
where
    P: Paginated,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = OneDriveResult<P>>,
{
    /// Creates a new page iterator.
    pub fn new(fetch_fn: F) -> Self {
        Self {
            fetch_fn,
            next_link: None,
            done: false,
            stop_on_empty: false,
            _marker: PhantomData,
        }
    }

    /// Also stops after a page with no items, even if it carries a next link.
    pub fn stop_on_empty_page(mut self) -> Self {
        self.stop_on_empty = true;
        self
    }

    /// Fetches the next page of results.
    pub async fn next_page(&mut self) -> OneDriveResult<Option<P>> {
        if self.done {
            return Ok(None);
        }

        let page = (self.fetch_fn)(self.next_link.take()).await?;

        match page.next_link() {
            Some(link) if !(self.stop_on_empty && page.is_empty()) => {
                self.next_link = Some(link.to_string());
            }
            _ => self.done = true,
        }

        Ok(Some(page))
    }

    /// Collects all remaining items from all pages.
    pub async fn collect_all(&mut self) -> OneDriveResult<Vec<P::Item>> {
        let mut all_items = Vec::new();

        while let Some(page) = self.next_page().await? {
            all_items.extend(page.into_items());
        }

        Ok(all_items)
    }

    /// Returns true if there are more pages to fetch.
    pub fn has_next(&self) -> bool {
        !self.done
    }
}
