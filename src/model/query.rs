//! Filtering, sorting and pagination shared by the vocabulary, term and
//! association listings.
//!
//! Both stores interpret a [`ListQuery`] the same way: the Postgres store
//! turns it into SQL, the memory store evaluates it with [`Listable`].
//! Text sorts are the exception. The memory store compares bytes, Postgres
//! uses the database collation, so the orders only agree under `C` collation.

use crate::model::{Id, ModelTerm, Term, Vocabulary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Listing parameters as parsed from a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Free text, substring matched against text/name or description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Vocabulary name filter (terms and associations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<String>,
    /// Prefix filter on term text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Alias of `text`, used when `text` is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Term id filter (associations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// A filtered page of records plus the total matching the same filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub count: i64,
}

/// Columns a listing may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Text,
    Description,
    VocabularyName,
    ModelName,
    ModelId,
    Field,
    TermId,
    Order,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    /// Accepts both the JSON (camelCase) and the column (snake_case) spelling
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "text" => SortKey::Text,
            "description" => SortKey::Description,
            "vocabularyName" | "vocabulary_name" => SortKey::VocabularyName,
            "modelName" | "model_name" => SortKey::ModelName,
            "modelId" | "model_id" => SortKey::ModelId,
            "field" => SortKey::Field,
            "termId" | "term_id" => SortKey::TermId,
            "order" => SortKey::Order,
            "createdAt" | "created_at" => SortKey::CreatedAt,
            "updatedAt" | "updated_at" => SortKey::UpdatedAt,
            _ => return None,
        };
        Some(key)
    }

    pub fn column(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Text => "text",
            SortKey::Description => "description",
            SortKey::VocabularyName => "vocabulary_name",
            SortKey::ModelName => "model_name",
            SortKey::ModelId => "model_id",
            SortKey::Field => "field",
            SortKey::TermId => "term_id",
            SortKey::Order => "term_order",
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub key: SortKey,
    pub desc: bool,
}

impl Default for OrderBy {
    /// `createdAt DESC`, with the `id DESC` tiebreaker every ordering gets
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            desc: true,
        }
    }
}

impl OrderBy {
    /// SQL `ORDER BY` body. Columns come from the whitelist only.
    pub fn to_sql(&self) -> String {
        let direction = if self.desc { "DESC" } else { "ASC" };
        if self.key == SortKey::Id {
            format!("id {}", direction)
        } else {
            format!("{} {}, id DESC", self.key.column(), direction)
        }
    }
}

fn parse_direction(direction: &str) -> Option<bool> {
    match direction.to_ascii_lowercase().as_str() {
        "asc" => Some(false),
        "desc" => Some(true),
        _ => None,
    }
}

/// Escape `LIKE` metacharacters so the pattern matches the literal input
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl ListQuery {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }

    pub fn vocabulary_name(&self) -> Option<&str> {
        self.vocabulary.as_deref().filter(|v| !v.is_empty())
    }

    pub fn text_prefix(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.term.as_deref().filter(|t| !t.is_empty()))
    }

    /// Resolve the requested ordering against `allowed`, falling back to the default
    /// when the column or direction is missing or not whitelisted.
    ///
    /// `order` takes `"<column>"` or `"<column> <asc|desc>"`; without it `sort` and
    /// `sortDirection` are used.
    pub fn order_by(&self, allowed: &[SortKey]) -> OrderBy {
        let (column, direction) = match self.order.as_deref().map(str::trim) {
            Some(order) if !order.is_empty() => {
                let mut parts = order.split_whitespace();
                let column = parts.next();
                let direction = parts.next();
                if parts.next().is_some() {
                    return OrderBy::default();
                }
                (column, direction)
            }
            _ => (
                self.sort.as_deref().filter(|s| !s.is_empty()),
                self.sort_direction.as_deref().filter(|s| !s.is_empty()),
            ),
        };

        let Some(key) = column.and_then(SortKey::parse) else {
            return OrderBy::default();
        };
        if !allowed.contains(&key) {
            return OrderBy::default();
        }

        let desc = match direction {
            None => false,
            Some(direction) => match parse_direction(direction) {
                Some(desc) => desc,
                None => return OrderBy::default(),
            },
        };

        OrderBy { key, desc }
    }

    /// Clamp limit and offset; `None` limit means unbounded
    pub fn window(&self) -> (Option<i64>, i64) {
        let limit = self.limit.map(|l| l.max(0));
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    /// Apply configured defaults: a missing limit becomes `default_limit`,
    /// anything above `max_limit` is capped.
    pub fn paginated(mut self, default_limit: i64, max_limit: i64) -> Self {
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(default_limit);
        self.limit = Some(limit.min(max_limit));
        self.offset = Some(self.offset.unwrap_or(0).max(0));
        self
    }
}

/// Comparable value of one sortable column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue<'a> {
    Null,
    Int(i64),
    Text(&'a str),
    Time(DateTime<Utc>),
}

/// Records that can be listed with a [`ListQuery`] outside of SQL
pub trait Listable {
    const SORT_KEYS: &'static [SortKey];

    fn id(&self) -> Id;
    fn sort_value(&self, key: SortKey) -> SortValue<'_>;
    fn matches(&self, query: &ListQuery) -> bool;
}

/// Filter, order and page `records` the way the SQL listing does
pub fn apply_list_query<T: Listable + Clone>(records: &[T], query: &ListQuery) -> Page<T> {
    let mut matched: Vec<&T> = records.iter().filter(|r| r.matches(query)).collect();
    let count = matched.len() as i64;

    let order = query.order_by(T::SORT_KEYS);
    matched.sort_by(|a, b| {
        let primary = a.sort_value(order.key).cmp(&b.sort_value(order.key));
        let primary = if order.desc { primary.reverse() } else { primary };
        match primary {
            Ordering::Equal if order.key != SortKey::Id => b.id().cmp(&a.id()),
            other => other,
        }
    });

    let (limit, offset) = query.window();
    let records = matched
        .into_iter()
        .skip(offset as usize)
        .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Page { records, count }
}

fn contains_search(query: &ListQuery, fields: &[&str]) -> bool {
    match query.search() {
        Some(q) => fields.iter().any(|field| field.contains(q)),
        None => true,
    }
}

impl Listable for Vocabulary {
    const SORT_KEYS: &'static [SortKey] = &[
        SortKey::Id,
        SortKey::Name,
        SortKey::Description,
        SortKey::CreatedAt,
        SortKey::UpdatedAt,
    ];

    fn id(&self) -> Id {
        self.id
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Id => SortValue::Int(self.id),
            SortKey::Name => SortValue::Text(&self.name),
            SortKey::Description => SortValue::Text(&self.description),
            SortKey::CreatedAt => SortValue::Time(self.created_at),
            SortKey::UpdatedAt => SortValue::Time(self.updated_at),
            _ => SortValue::Null,
        }
    }

    fn matches(&self, query: &ListQuery) -> bool {
        contains_search(query, &[&self.name, &self.description])
    }
}

impl Listable for Term {
    const SORT_KEYS: &'static [SortKey] = &[
        SortKey::Id,
        SortKey::Text,
        SortKey::Description,
        SortKey::VocabularyName,
        SortKey::CreatedAt,
        SortKey::UpdatedAt,
    ];

    fn id(&self) -> Id {
        self.id
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Id => SortValue::Int(self.id),
            SortKey::Text => SortValue::Text(&self.text),
            SortKey::Description => SortValue::Text(&self.description),
            SortKey::VocabularyName => SortValue::Text(&self.vocabulary_name),
            SortKey::CreatedAt => SortValue::Time(self.created_at),
            SortKey::UpdatedAt => SortValue::Time(self.updated_at),
            _ => SortValue::Null,
        }
    }

    fn matches(&self, query: &ListQuery) -> bool {
        if !contains_search(query, &[&self.text, &self.description]) {
            return false;
        }
        if let Some(vocabulary) = query.vocabulary_name() {
            if self.vocabulary_name != vocabulary {
                return false;
            }
        }
        if let Some(prefix) = query.text_prefix() {
            if !self.text.starts_with(prefix) {
                return false;
            }
        }
        true
    }
}

impl Listable for ModelTerm {
    const SORT_KEYS: &'static [SortKey] = &[
        SortKey::Id,
        SortKey::ModelName,
        SortKey::ModelId,
        SortKey::Field,
        SortKey::VocabularyName,
        SortKey::TermId,
        SortKey::Order,
        SortKey::CreatedAt,
        SortKey::UpdatedAt,
    ];

    fn id(&self) -> Id {
        self.id
    }

    fn sort_value(&self, key: SortKey) -> SortValue<'_> {
        match key {
            SortKey::Id => SortValue::Int(self.id),
            SortKey::ModelName => SortValue::Text(&self.model_name),
            SortKey::ModelId => SortValue::Int(self.model_id),
            SortKey::Field => SortValue::Text(&self.field),
            SortKey::VocabularyName => SortValue::Text(&self.vocabulary_name),
            SortKey::TermId => self.term_id.map(SortValue::Int).unwrap_or(SortValue::Null),
            SortKey::Order => SortValue::Int(i64::from(self.order)),
            SortKey::CreatedAt => SortValue::Time(self.created_at),
            SortKey::UpdatedAt => SortValue::Time(self.updated_at),
            _ => SortValue::Null,
        }
    }

    fn matches(&self, query: &ListQuery) -> bool {
        if let Some(vocabulary) = query.vocabulary_name() {
            if self.vocabulary_name != vocabulary {
                return false;
            }
        }
        if let Some(term_id) = query.term_id {
            if self.term_id != Some(term_id) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn term(id: Id, text: &str, description: &str, vocabulary: &str, age_minutes: i64) -> Term {
        let mut term = Term::new(
            text.to_string(),
            description.to_string(),
            vocabulary.to_string(),
        );
        term.id = id;
        term.created_at = Utc::now() - Duration::minutes(age_minutes);
        term
    }

    fn sample_terms() -> Vec<Term> {
        vec![
            term(1, "abcdef", "", "Tags", 30),
            term(2, "gaming", "all about abc", "Tags", 20),
            term(3, "health", "", "Tags", 10),
            term(4, "ABC", "", "Tags", 5),
            term(5, "abc news", "", "Category", 1),
        ]
    }

    #[test]
    fn test_order_by_falls_back_to_default() {
        let allowed = Term::SORT_KEYS;

        let query = ListQuery::default();
        assert_eq!(query.order_by(allowed), OrderBy::default());

        let query = ListQuery {
            order: Some("password DESC".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by(allowed), OrderBy::default());

        let query = ListQuery {
            order: Some("text sideways".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by(allowed), OrderBy::default());

        // `name` is a vocabulary column, not a term column
        let query = ListQuery {
            sort: Some("name".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by(allowed), OrderBy::default());
    }

    #[test]
    fn test_order_by_accepts_both_parameter_styles() {
        let query = ListQuery {
            order: Some("text desc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.order_by(Term::SORT_KEYS),
            OrderBy {
                key: SortKey::Text,
                desc: true
            }
        );

        let query = ListQuery {
            sort: Some("updated_at".to_string()),
            sort_direction: Some("ASC".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.order_by(Term::SORT_KEYS),
            OrderBy {
                key: SortKey::UpdatedAt,
                desc: false
            }
        );

        let query = ListQuery {
            order: Some("order".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by(ModelTerm::SORT_KEYS).to_sql(), "term_order ASC, id DESC");
        assert_eq!(OrderBy::default().to_sql(), "created_at DESC, id DESC");
    }

    #[test]
    fn test_search_is_case_sensitive_substring() {
        let terms = sample_terms();
        let query = ListQuery {
            q: Some("abc".to_string()),
            ..Default::default()
        };
        let page = apply_list_query(&terms, &query);
        let ids: Vec<Id> = page.records.iter().map(|t| t.id).collect();

        // newest first: 5, 2, 1; "ABC" does not match
        assert_eq!(ids, vec![5, 2, 1]);
        assert_eq!(page.count, 3);
    }

    #[test]
    fn test_count_ignores_window() {
        let terms = sample_terms();
        let query = ListQuery {
            vocabulary: Some("Tags".to_string()),
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        };
        let page = apply_list_query(&terms, &query);

        let unpaginated = apply_list_query(
            &terms,
            &ListQuery {
                vocabulary: Some("Tags".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(page.count, unpaginated.records.len() as i64);
        assert_eq!(page.count, 4);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id, 3);
        assert_eq!(page.records[1].id, 2);
    }

    #[test]
    fn test_text_prefix_and_term_alias() {
        let terms = sample_terms();
        let query = ListQuery {
            term: Some("ab".to_string()),
            order: Some("id asc".to_string()),
            ..Default::default()
        };
        let page = apply_list_query(&terms, &query);
        let texts: Vec<&str> = page.records.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["abcdef", "abc news"]);

        let query = ListQuery {
            text: Some("he".to_string()),
            term: Some("ab".to_string()),
            ..Default::default()
        };
        assert_eq!(query.text_prefix(), Some("he"));
    }

    #[test]
    fn test_paginated_applies_defaults_and_caps() {
        let query = ListQuery::default().paginated(20, 100);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(0));

        let query = ListQuery {
            limit: Some(500),
            offset: Some(-3),
            ..Default::default()
        }
        .paginated(20, 100);
        assert_eq!(query.limit, Some(100));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
