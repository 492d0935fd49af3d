//! Filter, ordering and paging configuration for redirect listings.
//!
//! Raw operator input (`search`, `state`, `ordering`, `direction`, page numbers) is
//! parsed here into typed values once, so stores only ever see validated queries.
//!
//! # Search syntax
//!
//! - empty or whitespace-only: no text filter
//! - `id:<digits>`: exact id match; any other suffix matches nothing
//! - anything else: case-insensitive substring match over `old_url`, `new_url`,
//!   `comment` and `referer`, where each space acts as a wildcard

use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::domain::entities::{PublishState, RedirectEntry};
use crate::error::AppError;
use serde_json::json;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Largest page a single listing call may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Restriction on the `published` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateFilter {
    /// Any of disabled, enabled or archived.
    #[default]
    All,
    Only(PublishState),
}

impl StateFilter {
    /// Parses the `state` filter value.
    ///
    /// Absent or empty selects every state; `"0"`, `"1"` and `"2"` select one.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for any other value.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let value = raw.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Ok(StateFilter::All);
        }

        value
            .parse::<i16>()
            .ok()
            .and_then(|n| PublishState::try_from(n).ok())
            .map(StateFilter::Only)
            .ok_or_else(|| {
                AppError::bad_request(
                    "State filter must be empty, 0, 1 or 2",
                    json!({ "state": value }),
                )
            })
    }

    /// States admitted by this filter.
    pub fn states(self) -> Vec<PublishState> {
        match self {
            StateFilter::All => PublishState::ALL.to_vec(),
            StateFilter::Only(state) => vec![state],
        }
    }

    pub fn matches(self, state: PublishState) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::Only(only) => only == state,
        }
    }

    fn store_fragment(self) -> String {
        match self {
            StateFilter::All => String::new(),
            StateFilter::Only(state) => state.to_string(),
        }
    }
}

/// Text or id restriction derived from the `search` input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchFilter {
    #[default]
    Any,
    /// `id:<n>` lookup.
    Id(i64),
    /// `id:` followed by something that is not a number; matches nothing.
    InvalidId(String),
    /// Trimmed free-text term.
    Text(String),
}

impl SearchFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let term = raw.map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return SearchFilter::Any;
        }

        if let Some(prefix) = term.get(..3)
            && prefix.eq_ignore_ascii_case("id:")
        {
            let suffix = term[3..].trim();
            return match suffix.parse::<i64>() {
                Ok(id) if suffix.bytes().all(|b| b.is_ascii_digit()) => SearchFilter::Id(id),
                _ => SearchFilter::InvalidId(suffix.to_string()),
            };
        }

        SearchFilter::Text(term.to_string())
    }

    /// Non-empty segments of a text search, split on spaces.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            SearchFilter::Text(term) => term.split(' ').filter(|s| !s.is_empty()).collect(),
            _ => Vec::new(),
        }
    }

    /// SQL `LIKE` pattern for a text search: `%seg1%seg2%`, with `\`, `%` and `_`
    /// escaped inside each segment.
    pub fn like_pattern(&self) -> Option<String> {
        let SearchFilter::Text(_) = self else {
            return None;
        };

        let mut pattern = String::from("%");
        for segment in self.segments() {
            for c in segment.chars() {
                if matches!(c, '\\' | '%' | '_') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
        }
        Some(pattern)
    }

    /// Evaluates the filter against an entry in memory, mirroring the SQL form.
    pub fn matches(&self, entry: &RedirectEntry) -> bool {
        match self {
            SearchFilter::Any => true,
            SearchFilter::Id(id) => entry.id == *id,
            SearchFilter::InvalidId(_) => false,
            SearchFilter::Text(_) => {
                let segments: Vec<String> =
                    self.segments().iter().map(|s| s.to_lowercase()).collect();
                [
                    Some(entry.old_url.as_str()),
                    Some(entry.new_url.as_str()),
                    entry.comment.as_deref(),
                    entry.referer.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| contains_in_order(&field.to_lowercase(), &segments))
            }
        }
    }

    fn store_fragment(&self) -> String {
        match self {
            SearchFilter::Any => String::new(),
            SearchFilter::Id(id) => format!("id:{id}"),
            SearchFilter::InvalidId(raw) => format!("id:{raw}"),
            SearchFilter::Text(term) => term.clone(),
        }
    }
}

/// True if every segment occurs in `haystack`, each after the previous one.
fn contains_in_order(haystack: &str, segments: &[String]) -> bool {
    let mut rest = haystack;
    for segment in segments {
        match rest.find(segment.as_str()) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    true
}

/// Parsed `search` + `state` filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListFilter {
    pub search: SearchFilter,
    pub state: StateFilter,
}

impl ListFilter {
    /// Parses raw filter input.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `state` is not a known value.
    pub fn parse(search: Option<&str>, state: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            search: SearchFilter::parse(search),
            state: StateFilter::parse(state)?,
        })
    }

    /// Deterministic identifier of this filter configuration.
    ///
    /// Built as `{prefix}:{search}:{state}`; ordering and paging are not part of it.
    pub fn store_id(&self, prefix: &str) -> String {
        format!(
            "{}:{}:{}",
            prefix,
            self.search.store_fragment(),
            self.state.store_fragment()
        )
    }

    pub fn matches(&self, entry: &RedirectEntry) -> bool {
        self.state.matches(entry.published) && self.search.matches(entry)
    }
}

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    #[default]
    OldUrl,
    NewUrl,
    Referer,
    Hits,
    CreatedDate,
    Published,
}

impl SortField {
    /// Parses a field name, accepting an optional `a.` table alias prefix.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim();
        let name = name.strip_prefix("a.").unwrap_or(name);
        match name {
            "id" => Some(SortField::Id),
            "old_url" => Some(SortField::OldUrl),
            "new_url" => Some(SortField::NewUrl),
            "referer" => Some(SortField::Referer),
            "hits" => Some(SortField::Hits),
            "created_date" => Some(SortField::CreatedDate),
            "published" => Some(SortField::Published),
            _ => None,
        }
    }

    /// Column name; always one of a fixed set, safe to splice into SQL.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::OldUrl => "old_url",
            SortField::NewUrl => "new_url",
            SortField::Referer => "referer",
            SortField::Hits => "hits",
            SortField::CreatedDate => "created_date",
            SortField::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Ordering of a listing. Defaults to `old_url ASC`; `id ASC` breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOrdering {
    pub field: SortField,
    pub direction: SortDirection,
}

impl ListOrdering {
    /// Parses ordering input; absent or empty values fall back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a field outside the allow-list or a
    /// direction other than `asc`/`desc`.
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Result<Self, AppError> {
        let field = match field.map(str::trim).filter(|f| !f.is_empty()) {
            None => SortField::default(),
            Some(raw) => SortField::parse(raw).ok_or_else(|| {
                AppError::bad_request("Unsupported ordering field", json!({ "ordering": raw }))
            })?,
        };

        let direction = match direction.map(str::trim).filter(|d| !d.is_empty()) {
            None => SortDirection::default(),
            Some(raw) => SortDirection::parse(raw).ok_or_else(|| {
                AppError::bad_request(
                    "Ordering direction must be asc or desc",
                    json!({ "direction": raw }),
                )
            })?,
        };

        Ok(Self { field, direction })
    }

    /// Compares two entries the way the store orders them.
    ///
    /// A missing referer sorts after any present one in ascending order.
    pub fn compare(&self, a: &RedirectEntry, b: &RedirectEntry) -> Ordering {
        let primary = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::OldUrl => a.old_url.cmp(&b.old_url),
            SortField::NewUrl => a.new_url.cmp(&b.new_url),
            SortField::Referer => match (&a.referer, &b.referer) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Hits => a.hits.cmp(&b.hits),
            SortField::CreatedDate => a.created_date.cmp(&b.created_date),
            SortField::Published => a.published.cmp(&b.published),
        };

        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };

        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// One page of a listing (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page` is 0 or `page_size` is outside
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Result<Self, AppError> {
        if page == 0 {
            return Err(AppError::bad_request(
                "Page must be greater than 0",
                json!({ "page": page }),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::bad_request(
                format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
                json!({ "page_size": page_size }),
            ));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    /// The following page, for walking a listing to its end.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

/// A complete listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub filter: ListFilter,
    pub ordering: ListOrdering,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn new(filter: ListFilter, ordering: ListOrdering, page: PageRequest) -> Self {
        Self {
            filter,
            ordering,
            page,
        }
    }

    /// Cache key of this page and its total under listing `generation`.
    ///
    /// The store id extended with ordering and paging, hashed. Keys of an older
    /// generation are never read again once the generation moves on.
    pub fn cache_key(&self, namespace: &str, generation: u64) -> String {
        let id = format!(
            "{}:{}:{}:{}:{}",
            self.filter.store_id(namespace),
            self.ordering.field.column(),
            self.ordering.direction.as_sql(),
            self.page.offset(),
            self.page.limit()
        );
        format!("{namespace}{generation}:{}", digest(&id))
    }
}

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
