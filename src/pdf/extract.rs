//! Page subset extraction.

use lopdf::Document;

use crate::error::Result;
use crate::page_range::PageSet;

/// Builds a standalone document containing exactly the source's pages at the
/// given zero-based indices, in ascending index order. The source document is
/// not mutated.
///
/// Works by cloning the source and deleting the complement, which keeps
/// shared resources (fonts, images) intact for the surviving pages; unused
/// objects are pruned afterwards.
pub fn extract_pages(source: &Document, pages: &PageSet) -> Result<Document> {
    let mut doc = source.clone();
    let total = doc.get_pages().len() as u32;

    if let Some(bad) = pages.iter().find(|&p| p >= total) {
        return Err(lopdf::Error::PageNumberNotFound(bad + 1).into());
    }

    let delete: Vec<u32> = (1..=total)
        .filter(|page_number| !pages.contains(page_number - 1))
        .collect();
    if !delete.is_empty() {
        doc.delete_pages(&delete);
    }
    doc.prune_objects();
    doc.renumber_objects();
    Ok(doc)
}
