//! Pagination and filtering negotiation through `X-Nuage-*` headers.

use std::fmt;

use crate::request::Request;
use crate::response::Response;

/// Page size negotiated when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

pub const HEADER_FILTER: &str = "X-Nuage-Filter";
pub const HEADER_FILTER_TYPE: &str = "X-Nuage-FilterType";
pub const HEADER_ORDER_BY: &str = "X-Nuage-OrderBy";
pub const HEADER_PAGE: &str = "X-Nuage-Page";
pub const HEADER_PAGE_SIZE: &str = "X-Nuage-PageSize";
pub const HEADER_GROUP_BY: &str = "X-Nuage-GroupBy";
pub const HEADER_ATTRIBUTES: &str = "X-Nuage-Attributes";
pub const HEADER_COUNT: &str = "X-Nuage-Count";

/// Information passed along a children fetch and filled back from the
/// response.
///
/// The caller sets `filter`, `order_by`, `group_by`, `page` and `page_size`.
/// After a successful call the server's view of filter, filter type, order,
/// page, page size and `total_count` overwrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchingInfo {
    pub filter: String,
    pub filter_type: String,
    pub group_by: Vec<String>,
    pub order_by: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub total_count: u64,
}

impl FetchingInfo {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    #[must_use]
    pub fn with_group_by<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = attributes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn for_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// Fill the response headers back into this record.
    pub fn read_headers(&mut self, response: &Response) {
        let text = |name| response.header(name).unwrap_or_default().to_string();
        let number = |name| response.header(name).and_then(|v| v.trim().parse().ok());

        self.filter = text(HEADER_FILTER);
        self.filter_type = text(HEADER_FILTER_TYPE);
        self.order_by = text(HEADER_ORDER_BY);
        self.page = number(HEADER_PAGE);
        self.page_size = number(HEADER_PAGE_SIZE);
        self.total_count = response
            .header(HEADER_COUNT)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default();
    }
}

impl fmt::Display for FetchingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<FetchingInfo page: {:?}, pagesize: {:?}, totalcount: {}>",
            self.page, self.page_size, self.total_count
        )
    }
}

/// Set the pagination headers of `request`.
///
/// `X-Nuage-PageSize` is always sent; the other headers only when the
/// matching field is set.
pub fn prepare_headers(request: &mut Request, info: Option<&FetchingInfo>) {
    request.set_header(HEADER_PAGE_SIZE, DEFAULT_PAGE_SIZE.to_string());

    let Some(info) = info else {
        return;
    };

    if !info.filter.is_empty() {
        request.set_header(HEADER_FILTER, info.filter.as_str());
    }

    if !info.order_by.is_empty() {
        request.set_header(HEADER_ORDER_BY, info.order_by.as_str());
    }

    if let Some(page) = info.page {
        request.set_header(HEADER_PAGE, page.to_string());
    }

    if let Some(page_size) = info.page_size.filter(|size| *size > 0) {
        request.set_header(HEADER_PAGE_SIZE, page_size.to_string());
    }

    if !info.group_by.is_empty() {
        request.set_header(HEADER_GROUP_BY, "true");
        request.set_header(HEADER_ATTRIBUTES, info.group_by.join(", "));
    }
}
