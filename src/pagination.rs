//! Pagination metadata inference
//!
//! Paginated list endpoints wrap their results in an envelope:
//!
//! ```json
//! {"count": 100, "next": "/posts/?page=5", "previous": "/posts/?page=3", "results": [...]}
//! ```
//!
//! The envelope never states the page size or the current page. Both are
//! inferred from `count`, the length of `results` and the page numbers
//! embedded in the `next`/`previous` links.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

static PAGE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"page=(\d+)").unwrap()
});

/// Page-level view of a paginated result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub total: u64,
    pub current: u64,
    /// Number of the previous page, serialized as `false` when there is none
    #[serde(with = "page_link")]
    pub previous: Option<u64>,
    /// Number of the next page, serialized as `false` when there is none
    #[serde(with = "page_link")]
    pub next: Option<u64>,
}

/// Item-level view of a paginated result. `first` and `last` are 1-based
/// positions within the whole result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub total: u64,
    pub first: u64,
    pub last: u64,
    /// `None` when the result set fits in a single page: the server-side
    /// page size cannot be observed then.
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    pub page: PageInfo,
    pub items: ItemInfo,
}

/// Whether `payload` is a `count`/`results` list envelope, paginated or not.
pub fn is_envelope(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|obj| obj.contains_key("count") && obj.contains_key("results"))
}

/// Derive pagination metadata from a `count`/`next`/`previous`/`results` envelope.
///
/// Returns `None` for payloads that are not paginated (no positive `count`
/// or no `results` array).
///
/// When both links are present the `next` link decides the current page and
/// the page size: a page followed by another one is full, so its length is
/// exact, while the `previous` derivation assumes every earlier page had
/// the same size.
pub fn infer_pagination_metadata(envelope: &Value) -> Option<PaginationMetadata> {
    let count = envelope.get("count").and_then(Value::as_u64).filter(|c| *c > 0)?;
    let results = envelope.get("results").and_then(Value::as_array)?;
    let len = results.len() as u64;

    let mut items = ItemInfo {
        total: count,
        first: 1,
        last: len,
        per_page: None,
    };
    let mut page = PageInfo {
        total: 1,
        current: 1,
        previous: None,
        next: None,
    };

    if let Some(previous) = page_number(envelope.get("previous")) {
        let per_page = per_page_before(count, len, previous);
        let position = previous
            .checked_add(1)
            .and_then(|current| item_window(current, per_page, len).map(|window| (current, window)));
        match position {
            Some((current, (first, last))) => {
                page.previous = Some(previous);
                page.current = current;
                items.per_page = per_page;
                items.first = first;
                items.last = last;
            }
            None => warn!(previous, "previous page number out of range, ignoring the link"),
        }
    }

    if let Some(next) = page_number(envelope.get("next")) {
        let current = next - 1;
        let per_page = Some(len).filter(|n| *n > 0);
        match item_window(current, per_page, len) {
            Some((first, last)) => {
                if page.previous.is_some() && page.current != current {
                    warn!(
                        previous = ?page.previous,
                        next,
                        "pagination links disagree on the current page, using the next link"
                    );
                }
                page.next = Some(next);
                page.current = current;
                items.per_page = per_page;
                items.first = first;
                items.last = last;
            }
            None => warn!(next, "next page number out of range, ignoring the link"),
        }
    }

    if let Some(per_page) = items.per_page {
        page.total = count.div_ceil(per_page);
    }

    Some(PaginationMetadata { page, items })
}

/// 1-based positions of the first and last item on page `current`.
/// `None` when they do not fit in a `u64`.
fn item_window(current: u64, per_page: Option<u64>, len: u64) -> Option<(u64, u64)> {
    let Some(per_page) = per_page else {
        return Some((1, len));
    };
    let first = current.saturating_sub(1).checked_mul(per_page)?.checked_add(1)?;
    let last = first.checked_add(len)? - 1;
    Some((first, last))
}

/// Page number carried by a `page=<n>` token in a link. Missing links,
/// links without a token and `page=0` all count as "no such page".
fn page_number(link: Option<&Value>) -> Option<u64> {
    let link = link?.as_str()?;
    let captures = PAGE_TOKEN_REGEX.captures(link)?;
    captures[1].parse::<u64>().ok().filter(|n| *n > 0)
}

/// Page size implied by `previous_page` full pages holding everything but the current batch
fn per_page_before(count: u64, len: u64, previous_page: u64) -> Option<u64> {
    let before = count.saturating_sub(len);
    if before % previous_page != 0 {
        warn!(
            count,
            len,
            previous_page,
            "items before the current page do not split evenly into pages"
        );
    }
    Some(before / previous_page).filter(|n| *n > 0)
}

/// `Option<u64>` <-> `false | n`
mod page_link {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_u64(*n),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        struct PageLinkVisitor;

        impl<'de> Visitor<'de> for PageLinkVisitor {
            type Value = Option<u64>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a page number, false or null")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                if v {
                    Err(E::invalid_value(de::Unexpected::Bool(true), &self))
                } else {
                    Ok(None)
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Some(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Some)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }
        }

        deserializer.deserialize_any(PageLinkVisitor)
    }
}
