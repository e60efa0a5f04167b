//! List-request URI construction.
//!
//! # Design
//! Parameters are kept in an ordered `Vec`, never a map, so the rendered
//! query string depends only on the logical inputs. Two calls with the same
//! search text, ids, linked entities and filter always yield byte-identical
//! URIs, which is what makes responses cacheable by URI.
//!
//! Order: `query`, `filter[id][n]`, `with`, resource filter fields (in the
//! order the filter's `write` emits them), then `page` and `limit`.

use std::fmt;

use url::Url;

use crate::error::ApiError;

pub const PAGE_PARAM: &str = "page";
pub const LIMIT_PARAM: &str = "limit";

/// Ordered query-parameter multimap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.0.push((key.into(), value.to_string()));
    }

    /// `filter[<field>]=<value>`
    pub fn filter(&mut self, field: &str, value: impl fmt::Display) {
        self.push(format!("filter[{field}]"), value);
    }

    /// `filter[<field>][0]=..&filter[<field>][1]=..` in slice order.
    pub fn filter_list<V: fmt::Display>(&mut self, field: &str, values: &[V]) {
        for (index, value) in values.iter().enumerate() {
            self.push(format!("filter[{field}][{index}]"), value);
        }
    }

    /// `filter[<field>][from]` / `filter[<field>][to]`, each only when set.
    pub fn filter_range<V: fmt::Display>(&mut self, field: &str, range: &ValueRange<V>) {
        if let Some(from) = &range.from {
            self.push(format!("filter[{field}][from]"), from);
        }
        if let Some(to) = &range.to {
            self.push(format!("filter[{field}][to]"), to);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Inclusive range filter; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange<V> {
    pub from: Option<V>,
    pub to: Option<V>,
}

impl<V> ValueRange<V> {
    pub fn between(from: V, to: V) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn since(from: V) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn until(to: V) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }
}

/// Kinds of data the API can embed next to a primary resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkedEntity {
    Contacts,
    Deals,
    Companies,
    Customers,
    CatalogElements,
    LossReason,
    SourceId,
    IsPriceModifiedByRobot,
    OnlyDeleted,
    Segments,
    AmojoId,
    UsersGroups,
    TaskTypes,
    Version,
    DatetimeSettings,
}

impl LinkedEntity {
    /// Wire name used in the `with` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkedEntity::Contacts => "contacts",
            LinkedEntity::Deals => "leads",
            LinkedEntity::Companies => "companies",
            LinkedEntity::Customers => "customers",
            LinkedEntity::CatalogElements => "catalog_elements",
            LinkedEntity::LossReason => "loss_reason",
            LinkedEntity::SourceId => "source_id",
            LinkedEntity::IsPriceModifiedByRobot => "is_price_modified_by_robot",
            LinkedEntity::OnlyDeleted => "only_deleted",
            LinkedEntity::Segments => "segments",
            LinkedEntity::AmojoId => "amojo_id",
            LinkedEntity::UsersGroups => "users_groups",
            LinkedEntity::TaskTypes => "task_types",
            LinkedEntity::Version => "version",
            LinkedEntity::DatetimeSettings => "datetime_settings",
        }
    }
}

impl fmt::Display for LinkedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render linked entities in caller order.
pub fn join_linked(with: &[LinkedEntity]) -> String {
    with.iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Resource-specific filter fields.
///
/// Implementations write their fields in a fixed order, independent of how
/// the filter value was constructed.
pub trait ListFilter {
    fn write(&self, params: &mut QueryParams);
}

/// No resource filter.
impl ListFilter for () {
    fn write(&self, _params: &mut QueryParams) {}
}

/// Options shared by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub with: Vec<LinkedEntity>,
    pub ids: Vec<u64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    #[must_use]
    pub fn with(mut self, kind: LinkedEntity) -> Self {
        self.with.push(kind);
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ids.extend(ids);
        self
    }
}

/// An absolute resource URI plus its ordered query parameters.
///
/// Identity is the rendered string (see `Display`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    base: Url,
    params: QueryParams,
}

impl ResourceUri {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            params: QueryParams::new(),
        }
    }

    /// Resolve `path` (e.g. `leads` or `leads/pipelines`) under `api_root`.
    pub fn for_path(api_root: &Url, path: &str) -> Result<Self, ApiError> {
        let base = api_root
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::PreconditionViolation(format!("resource path '{path}': {e}")))?;
        Ok(Self::new(base))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }

    pub fn to_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.params.iter() {
                pairs.append_pair(key, value);
            }
        }
        url
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_url().as_str())
    }
}

/// Build the first-page URI of a list request.
pub fn build_list_uri(
    api_root: &Url,
    base_path: &str,
    query: &ListQuery,
    filter: &dyn ListFilter,
    page_size: u32,
) -> Result<ResourceUri, ApiError> {
    let mut uri = ResourceUri::for_path(api_root, base_path)?;
    let params = uri.params_mut();

    if let Some(text) = query.search.as_deref() {
        if !text.trim().is_empty() {
            params.push("query", text);
        }
    }
    params.filter_list("id", &query.ids);
    if !query.with.is_empty() {
        params.push("with", join_linked(&query.with));
    }
    filter.write(params);
    params.push(PAGE_PARAM, 1);
    params.push(LIMIT_PARAM, page_size);

    Ok(uri)
}
