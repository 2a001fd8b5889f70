//! Page-range expression parsing.
//!
//! The grammar is comma-separated tokens, each either a single 1-based page
//! number `n` or a range `n-m` with `n <= m`. Whitespace around tokens and
//! the dash is ignored; an empty token is a grammar error. Overlapping
//! tokens deduplicate (union semantics), so `"1-3,2"` and `"1,2,3"` parse
//! identically.

use std::collections::BTreeSet;

use crate::error::RangeError;

/// A validated, non-empty set of zero-based page indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
    pages: BTreeSet<u32>,
}

impl PageSet {
    /// Sorted zero-based indices, ascending.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.iter().copied()
    }

    pub fn contains(&self, zero_based: u32) -> bool {
        self.pages.contains(&zero_based)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Sorted ascending, as owned indices.
    pub fn to_vec(&self) -> Vec<u32> {
        self.pages.iter().copied().collect()
    }

    /// Whether the set names every page of a `total_pages`-page document.
    pub fn covers_all(&self, total_pages: u32) -> bool {
        total_pages > 0 && (0..total_pages).all(|page| self.pages.contains(&page))
    }
}

/// Parses an expression against a document of `max_pages` pages, yielding
/// zero-based indices. Every named page must satisfy `1 <= page <= max_pages`.
///
/// Endpoints are bounds-checked per token before any range is expanded, so
/// an absurd range like `"1-20000000"` fails in constant time instead of
/// first materializing millions of entries.
pub fn parse(expression: &str, max_pages: u32) -> Result<PageSet, RangeError> {
    let mut pages = BTreeSet::new();
    for (start, end) in tokens(expression)? {
        if end > max_pages {
            let page = if start > max_pages { start } else { end };
            return Err(RangeError::OutOfBounds { page, max_pages });
        }
        pages.extend(start - 1..=end - 1);
    }
    Ok(PageSet { pages })
}

/// Whether `page` (1-based) is named by the expression. Same grammar as
/// [`parse`] but without an upper bound: the validator re-checks ranges
/// recorded in the ledger, where no page count is available. No page set is
/// built, so oversized recorded ranges cost nothing.
pub fn expression_covers(expression: &str, page: u32) -> Result<bool, RangeError> {
    Ok(tokens(expression)?
        .into_iter()
        .any(|(start, end)| start <= page && page <= end))
}

/// Validated inclusive 1-based endpoint pairs, one per token, in input order.
fn tokens(expression: &str) -> Result<Vec<(u32, u32)>, RangeError> {
    if expression.trim().is_empty() {
        return Err(RangeError::Empty);
    }
    let mut out = Vec::new();
    for token in expression.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(RangeError::BadToken(token.to_string()));
        }
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_page(start, token)?;
                let end = parse_page(end, token)?;
                if start > end {
                    return Err(RangeError::Inverted { start, end });
                }
                out.push((start, end));
            }
            None => {
                let page = parse_page(token, token)?;
                out.push((page, page));
            }
        }
    }
    Ok(out)
}

fn parse_page(text: &str, token: &str) -> Result<u32, RangeError> {
    let page: u32 = text
        .trim()
        .parse()
        .map_err(|_| RangeError::BadToken(token.to_string()))?;
    if page == 0 {
        return Err(RangeError::OutOfBounds {
            page: 0,
            max_pages: u32::MAX,
        });
    }
    Ok(page)
}
