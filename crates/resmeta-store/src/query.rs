//! Query model shared by every store backend.
//!
//! A [`MetadataQuery`] starts from mandatory scoping fields (dataset,
//! resource ids, resource type) and is narrowed by an optional
//! [`MetadataFilter`] parsed from request parameters. All predicates are
//! AND-ed; the text predicate is OR-ed across its own terms.

use crate::text::TextQuery;
use resmeta_common::{Error, MetadataKey, MetadataRecord, Resource, ResourceType, Result};
use std::cmp::Ordering;

const RELEVANCE: &str = "relevance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// What a sort clause orders by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// Text-search score. Only ever descending.
    Relevance,
    /// A record field by its camelCase name (`resource.id` style for nested)
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// Parse a comma-separated sort list such as `-updatedAt,name`.
///
/// A `+`/`-` prefix selects the direction; no prefix means ascending, except
/// for `relevance` where no prefix means descending and `+relevance` is
/// rejected.
pub fn parse_sort(spec: &str) -> Result<Vec<SortField>> {
    let mut fields = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (direction, name) = match part.as_bytes()[0] {
            b'+' => (Some(SortDirection::Ascending), &part[1..]),
            b'-' => (Some(SortDirection::Descending), &part[1..]),
            _ => (None, part),
        };
        if name.is_empty() {
            continue;
        }

        let field = if name == RELEVANCE {
            if direction == Some(SortDirection::Ascending) {
                return Err(Error::InvalidSortParameter(
                    "Sort by relevance ascending not supported".to_string(),
                ));
            }
            SortField {
                key: SortKey::Relevance,
                direction: SortDirection::Descending,
            }
        } else {
            SortField {
                key: SortKey::Field(name.to_string()),
                direction: direction.unwrap_or(SortDirection::Ascending),
            }
        };
        fields.push(field);
    }
    Ok(fields)
}

/// Split a comma-separated list, dropping blanks. `None` if nothing remains.
#[must_use]
pub fn parse_list(value: &str) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

/// Parse a membership filter. A blank value is no filter; a value made only
/// of separators is an empty list, which matches nothing.
#[must_use]
pub fn parse_scope(value: &str) -> Option<Vec<String>> {
    if value.trim().is_empty() {
        return None;
    }
    Some(parse_list(value).unwrap_or_default())
}

/// Parse a limit; absent, non-numeric and zero all mean unlimited.
#[must_use]
pub fn parse_limit(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Optional narrowing parsed from request query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub applications: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub search: Option<TextQuery>,
    pub sort: Vec<SortField>,
    pub limit: Option<usize>,
}

impl MetadataFilter {
    /// Build a filter from raw query-string values
    pub fn from_params(
        application: Option<&str>,
        language: Option<&str>,
        search: Option<&str>,
        sort: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            applications: application.and_then(parse_scope),
            languages: language.and_then(parse_scope),
            search: search.and_then(TextQuery::parse),
            sort: sort.map(parse_sort).transpose()?.unwrap_or_default(),
            limit: limit.and_then(parse_limit),
        })
    }
}

/// A full store query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataQuery {
    pub dataset: Option<String>,
    pub resource_ids: Option<Vec<String>>,
    pub resource_type: Option<ResourceType>,
    pub applications: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub text: Option<TextQuery>,
    pub sort: Vec<SortField>,
    pub limit: Option<usize>,
}

impl MetadataQuery {
    /// Every record
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Records of one resource within one dataset, across applications and languages
    #[must_use]
    pub fn for_resource(dataset: &str, resource: &Resource) -> Self {
        Self {
            dataset: Some(dataset.to_string()),
            resource_ids: Some(vec![resource.id.clone()]),
            resource_type: Some(resource.resource_type),
            ..Self::default()
        }
    }

    /// The single record a uniqueness key can match
    #[must_use]
    pub fn for_key(key: &MetadataKey) -> Self {
        Self {
            applications: Some(vec![key.application.clone()]),
            languages: Some(vec![key.language.clone()]),
            ..Self::for_resource(&key.dataset, &key.resource)
        }
    }

    /// Records of any of `ids` with the given resource type, in any dataset
    #[must_use]
    pub fn for_resource_ids(ids: Vec<String>, resource_type: ResourceType) -> Self {
        Self {
            resource_ids: Some(ids),
            resource_type: Some(resource_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn of_type(mut self, resource_type: Option<ResourceType>) -> Self {
        self.resource_type = resource_type;
        self
    }

    /// Merge request filters into this scope
    #[must_use]
    pub fn with_filter(mut self, filter: &MetadataFilter) -> Self {
        if filter.applications.is_some() {
            self.applications.clone_from(&filter.applications);
        }
        if filter.languages.is_some() {
            self.languages.clone_from(&filter.languages);
        }
        if filter.search.is_some() {
            self.text.clone_from(&filter.search);
        }
        self.sort.clone_from(&filter.sort);
        self.limit = filter.limit;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Field predicates only (scope, membership filters)
    fn matches_fields(&self, record: &MetadataRecord) -> bool {
        fn member(list: Option<&Vec<String>>, value: &str) -> bool {
            list.is_none_or(|items| items.iter().any(|i| i == value))
        }

        self.dataset.as_deref().is_none_or(|d| d == record.dataset)
            && member(self.resource_ids.as_ref(), &record.resource.id)
            && self
                .resource_type
                .is_none_or(|t| t == record.resource.resource_type)
            && member(self.applications.as_ref(), &record.application)
            && member(self.languages.as_ref(), &record.language)
    }

    /// Whether `record` satisfies every predicate of this query
    #[must_use]
    pub fn matches(&self, record: &MetadataRecord) -> bool {
        self.score(record).is_some()
    }

    /// `None` if the record does not match; otherwise its relevance score
    /// (zero when the query has no text predicate)
    fn score(&self, record: &MetadataRecord) -> Option<u32> {
        if !self.matches_fields(record) {
            return None;
        }
        match &self.text {
            None => Some(0),
            Some(text) => Some(text.score(record)).filter(|s| *s > 0),
        }
    }
}

/// Run `query` over `records` (given in natural order): filter, sort, limit.
///
/// The sort is stable, so ties keep natural order.
pub fn execute<'a, I>(records: I, query: &MetadataQuery) -> Vec<MetadataRecord>
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let mut hits: Vec<(u32, &MetadataRecord)> = records
        .into_iter()
        .filter_map(|r| query.score(r).map(|s| (s, r)))
        .collect();

    if !query.sort.is_empty() {
        hits.sort_by(|(sa, a), (sb, b)| {
            query
                .sort
                .iter()
                .map(|field| compare(field, (*sa, a), (*sb, b)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    hits.into_iter().take(limit).map(|(_, r)| r.clone()).collect()
}

fn compare(
    field: &SortField,
    (score_a, a): (u32, &MetadataRecord),
    (score_b, b): (u32, &MetadataRecord),
) -> Ordering {
    let ordering = match &field.key {
        SortKey::Relevance => score_a.cmp(&score_b),
        SortKey::Field(name) => match name.as_str() {
            "createdAt" => a.created_at.cmp(&b.created_at),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            other => text_field(a, other).cmp(&text_field(b, other)),
        },
    };
    match field.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// String value of a sortable field. Unknown fields compare equal; missing
/// values sort first.
fn text_field<'a>(record: &'a MetadataRecord, name: &str) -> Option<&'a str> {
    match name {
        "dataset" => Some(&record.dataset),
        "application" => Some(&record.application),
        "language" => Some(&record.language),
        "resource.id" => Some(&record.resource.id),
        "resource.type" => Some(record.resource.resource_type.as_str()),
        "userId" => Some(record.user_id.as_str()),
        "status" => Some(record.status.as_str()),
        "name" => record.name.as_deref(),
        "description" => record.description.as_deref(),
        "source" => record.source.as_deref(),
        "citation" => record.citation.as_deref(),
        "license" => record.license.as_deref(),
        _ => None,
    }
}
