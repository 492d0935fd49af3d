//! DTOs for redirect registry endpoints.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use validator::Validate;

use crate::application::services::{CreateRedirect, IngestReport, RedirectPage};
use crate::domain::entities::{PublishState, RedirectEntry, RedirectPatch};
use crate::domain::listing::{
    DEFAULT_PAGE_SIZE, ListFilter, ListOrdering, ListQuery, PageRequest,
};
use crate::error::AppError;

/// Query string of `GET /api/redirects`.
///
/// Filter and ordering values stay raw strings here; [`Self::into_query`] turns
/// them into a validated [`ListQuery`].
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ListRedirectsParams {
    pub search: Option<String>,
    pub state: Option<String>,
    pub ordering: Option<String>,
    pub direction: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl ListRedirectsParams {
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an unknown state, ordering field or
    /// direction, or an out-of-range page.
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let filter = ListFilter::parse(self.search.as_deref(), self.state.as_deref())?;
        let ordering = ListOrdering::parse(self.ordering.as_deref(), self.direction.as_deref())?;
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?;

        Ok(ListQuery::new(filter, ordering, page))
    }
}

/// Paginated list of redirect entries.
#[derive(Debug, Serialize)]
pub struct RedirectListResponse {
    pub pagination: PaginationMeta,
    pub items: Vec<RedirectEntry>,
}

/// Pagination metadata for responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: u64,
}

impl From<RedirectPage> for RedirectListResponse {
    fn from(page: RedirectPage) -> Self {
        Self {
            pagination: PaginationMeta {
                page: page.page,
                page_size: page.page_size,
                total_items: page.total,
                total_pages: page.total_pages(),
            },
            items: page.items,
        }
    }
}

/// Request body for `POST /api/redirects`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRedirectRequest {
    /// Source URL; relative paths are resolved against the site root.
    #[validate(length(min = 1, message = "Source URL must not be empty"))]
    pub old_url: String,
    pub new_url: Option<String>,
    pub referer: Option<String>,
    pub comment: Option<String>,
}

impl From<CreateRedirectRequest> for CreateRedirect {
    fn from(req: CreateRedirectRequest) -> Self {
        Self {
            old_url: req.old_url,
            new_url: req.new_url,
            referer: req.referer,
            comment: req.comment,
        }
    }
}

/// Request body for `POST /api/redirects/batch`.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchRequest {
    #[validate(length(min = 1, max = 10000, message = "Batch must contain 1 to 10000 pairs"))]
    pub pairs: Vec<RedirectPair>,
}

/// One `(source, destination)` pair of a batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedirectPair {
    pub old_url: String,
    #[serde(default)]
    pub new_url: Option<String>,
}

impl BatchRequest {
    pub fn into_pairs(self) -> Vec<(String, Option<String>)> {
        self.pairs
            .into_iter()
            .map(|p| (p.old_url, p.new_url))
            .collect()
    }
}

/// Response of a batch ingestion.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub summary: BatchSummary,
    pub rejected: Vec<String>,
}

/// Summary statistics for batch processing.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub accepted: u64,
    pub rejected: usize,
}

impl BatchResponse {
    pub fn new(total: usize, report: IngestReport) -> Self {
        Self {
            summary: BatchSummary {
                total,
                accepted: report.accepted,
                rejected: report.rejected.len(),
            },
            rejected: report.rejected,
        }
    }
}

/// Request body for `PATCH /api/redirects/{id}`.
///
/// All fields are optional; only provided fields are changed. `comment: null`
/// clears the comment, an absent `comment` leaves it alone.
#[serde_as]
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRedirectRequest {
    pub new_url: Option<String>,

    pub published: Option<PublishState>,

    #[serde(default, with = "::serde_with::rust::double_option")]
    pub comment: Option<Option<String>>,
}

impl From<UpdateRedirectRequest> for RedirectPatch {
    fn from(req: UpdateRedirectRequest) -> Self {
        Self {
            new_url: req.new_url,
            published: req.published,
            comment: req.comment,
        }
    }
}

/// Response of `POST /api/redirects/purge`.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}
