use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use itertools::Itertools;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::access::{AccessPolicy, Action, RoleAccessPolicy};
use crate::api::teaser::{NoTeasers, TeaserRenderer};
use crate::config::AppConfig;
use crate::error::TaxonomyError;
use crate::model::{
    Id, ListQuery, NewTerm, NewVocabulary, Term, TermUpdate, UserContext, Vocabulary,
    VocabularyUpdate,
};
use crate::store::traits::Store;

/// Shared handler state: the store plus the host supplied collaborators
pub struct AppState<S> {
    pub store: Arc<S>,
    pub access: Arc<dyn AccessPolicy>,
    pub teasers: Arc<dyn TeaserRenderer>,
    pub config: Arc<AppConfig>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            access: Arc::clone(&self.access),
            teasers: Arc::clone(&self.teasers),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> AppState<S> {
    /// State with the role policy from `config.access` and no teasers
    pub fn new(store: S, config: AppConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    pub fn from_arc(store: Arc<S>, config: AppConfig) -> Self {
        Self {
            store,
            access: Arc::new(RoleAccessPolicy::from(&config.access)),
            teasers: Arc::new(NoTeasers),
            config: Arc::new(config),
        }
    }

    pub fn with_access(mut self, access: impl AccessPolicy + 'static) -> Self {
        self.access = Arc::new(access);
        self
    }

    pub fn with_teasers(mut self, teasers: impl TeaserRenderer + 'static) -> Self {
        self.teasers = Arc::new(teasers);
        self
    }

    fn paginate(&self, query: ListQuery) -> ListQuery {
        let pagination = &self.config.pagination;
        query.paginated(pagination.default_limit, pagination.max_limit)
    }

    fn origin(&self) -> &str {
        &self.config.app.origin
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct VocabularyListResponse {
    pub vocabulary: Vec<Vocabulary>,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct TermListResponse {
    pub term: Vec<Term>,
    pub meta: Meta,
}

#[derive(Debug, Serialize)]
pub struct TermTextsResponse {
    pub term: Vec<String>,
    pub meta: Meta,
}

/// `{"vocabulary": {...}}`, used for request and response bodies alike
#[derive(Debug, Serialize, Deserialize)]
pub struct VocabularyBody<T> {
    pub vocabulary: T,
}

/// `{"term": {...}}`, used for request and response bodies alike
#[derive(Debug, Serialize, Deserialize)]
pub struct TermBody<T> {
    pub term: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(err: TaxonomyError) -> ApiError {
    let status = match &err {
        TaxonomyError::NotFound(_) => StatusCode::NOT_FOUND,
        TaxonomyError::Forbidden(_) => StatusCode::FORBIDDEN,
        TaxonomyError::Validation(_) => StatusCode::BAD_REQUEST,
        TaxonomyError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("{}", err);
    } else {
        debug!("{}", err);
    }

    (status, Json(ErrorResponse::new(&err.to_string())))
}

fn store_error(op: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |e| api_error(TaxonomyError::persistence(op, e))
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    api_error(TaxonomyError::Validation(rejection.body_text()))
}

async fn require<S>(state: &AppState<S>, user: &UserContext, action: Action) -> ApiResult<()> {
    if state.access.can(user, action).await {
        Ok(())
    } else {
        debug!("{} denied {}", user.user_id, action);
        Err(api_error(TaxonomyError::Forbidden(action.to_string())))
    }
}

async fn load_vocabulary<S: Store>(state: &AppState<S>, id: Id, op: &'static str) -> ApiResult<Vocabulary> {
    state
        .store
        .find_vocabulary(id)
        .await
        .map_err(store_error(op))?
        .ok_or_else(|| api_error(TaxonomyError::NotFound(format!("vocabulary {}", id))))
}

/// Term `id`, only when it belongs to `vocabulary`
async fn load_term<S: Store>(
    state: &AppState<S>,
    vocabulary: &str,
    id: Id,
    op: &'static str,
) -> ApiResult<Term> {
    state
        .store
        .find_term(id)
        .await
        .map_err(store_error(op))?
        .filter(|term| term.vocabulary_name == vocabulary)
        .ok_or_else(|| {
            api_error(TaxonomyError::NotFound(format!(
                "term {} in vocabulary '{}'",
                id, vocabulary
            )))
        })
}

async fn ensure_unique_name<S: Store>(
    state: &AppState<S>,
    name: &str,
    except: Option<Id>,
    op: &'static str,
) -> ApiResult<()> {
    let existing = state
        .store
        .find_vocabulary_by_name(name)
        .await
        .map_err(store_error(op))?;

    match existing {
        Some(found) if Some(found.id) != except => Err(api_error(TaxonomyError::Validation(
            format!("vocabulary '{}' already exists", name),
        ))),
        _ => Ok(()),
    }
}

// Vocabulary handlers

pub async fn list_vocabularies<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<VocabularyListResponse>> {
    let query = state.paginate(query);
    let page = state
        .store
        .query_vocabularies(&query)
        .await
        .map_err(store_error("VocabularyController.Query"))?;

    debug!("vocabulary query: {} of {}", page.records.len(), page.count);

    let origin = state.origin();
    let vocabulary = page
        .records
        .into_iter()
        .map(|mut v| {
            v.load_path(origin);
            v
        })
        .collect();

    Ok(Json(VocabularyListResponse {
        vocabulary,
        meta: Meta { count: page.count },
    }))
}

pub async fn count_vocabularies<S: Store>(
    State(state): State<AppState<S>>,
    Query(mut query): Query<ListQuery>,
) -> ApiResult<Json<CountResponse>> {
    query.limit = Some(0);
    query.offset = None;
    let page = state
        .store
        .query_vocabularies(&query)
        .await
        .map_err(store_error("VocabularyController.Count"))?;

    Ok(Json(CountResponse {
        meta: Meta { count: page.count },
    }))
}

pub async fn create_vocabulary<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    body: Result<Json<VocabularyBody<NewVocabulary>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VocabularyBody<Vocabulary>>)> {
    const OP: &str = "VocabularyController.Create";

    require(&state, &user, Action::CreateVocabulary).await?;
    let Json(body) = body.map_err(bad_body)?;

    let mut input = body.vocabulary;
    if input.creator_id.is_none() {
        input.creator_id = user.user_id.parse().ok();
    }
    let vocabulary = input.into_vocabulary().map_err(api_error)?;
    ensure_unique_name(&state, &vocabulary.name, None, OP).await?;

    let mut vocabulary = state
        .store
        .save_vocabulary(vocabulary)
        .await
        .map_err(store_error(OP))?;
    vocabulary.load_path(state.origin());

    debug!("created vocabulary {} '{}'", vocabulary.id, vocabulary.name);

    Ok((StatusCode::CREATED, Json(VocabularyBody { vocabulary })))
}

pub async fn get_vocabulary<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> ApiResult<Json<VocabularyBody<Vocabulary>>> {
    let mut vocabulary = load_vocabulary(&state, id, "VocabularyController.FindOne").await?;
    vocabulary.load_path(state.origin());
    Ok(Json(VocabularyBody { vocabulary }))
}

pub async fn update_vocabulary<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    user: UserContext,
    body: Result<Json<VocabularyBody<VocabularyUpdate>>, JsonRejection>,
) -> ApiResult<Json<VocabularyBody<Vocabulary>>> {
    const OP: &str = "VocabularyController.Update";

    require(&state, &user, Action::UpdateVocabulary).await?;
    let mut vocabulary = load_vocabulary(&state, id, OP).await?;
    let Json(body) = body.map_err(bad_body)?;

    body.vocabulary.apply(&mut vocabulary).map_err(api_error)?;
    ensure_unique_name(&state, &vocabulary.name, Some(id), OP).await?;

    let mut vocabulary = state
        .store
        .save_vocabulary(vocabulary)
        .await
        .map_err(store_error(OP))?;
    vocabulary.load_path(state.origin());

    Ok(Json(VocabularyBody { vocabulary }))
}

pub async fn delete_vocabulary<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    user: UserContext,
) -> ApiResult<StatusCode> {
    const OP: &str = "VocabularyController.Delete";

    require(&state, &user, Action::DeleteVocabulary).await?;
    let vocabulary = load_vocabulary(&state, id, OP).await?;

    state
        .store
        .delete_vocabulary(vocabulary.id)
        .await
        .map_err(store_error(OP))?;

    debug!("deleted vocabulary {} '{}'", vocabulary.id, vocabulary.name);
    Ok(StatusCode::NO_CONTENT)
}

// Term handlers

fn with_links(terms: Vec<Term>, origin: &str) -> Vec<Term> {
    terms
        .into_iter()
        .map(|mut t| {
            t.load_path(origin);
            t
        })
        .collect()
}

pub async fn list_terms<S: Store>(
    State(state): State<AppState<S>>,
    Path(vocabulary): Path<String>,
    Query(mut query): Query<ListQuery>,
) -> ApiResult<Json<TermListResponse>> {
    query.vocabulary = Some(vocabulary);
    let query = state.paginate(query);
    let page = state
        .store
        .query_terms(&query)
        .await
        .map_err(store_error("TermController.Query"))?;

    debug!("term query: {} of {}", page.records.len(), page.count);

    Ok(Json(TermListResponse {
        term: with_links(page.records, state.origin()),
        meta: Meta { count: page.count },
    }))
}

pub async fn count_terms<S: Store>(
    State(state): State<AppState<S>>,
    Path(vocabulary): Path<String>,
    Query(mut query): Query<ListQuery>,
) -> ApiResult<Json<CountResponse>> {
    query.vocabulary = Some(vocabulary);
    query.limit = Some(0);
    query.offset = None;
    let page = state
        .store
        .query_terms(&query)
        .await
        .map_err(store_error("TermController.Count"))?;

    Ok(Json(CountResponse {
        meta: Meta { count: page.count },
    }))
}

pub async fn create_term<S: Store>(
    State(state): State<AppState<S>>,
    Path(vocabulary): Path<String>,
    user: UserContext,
    body: Result<Json<TermBody<NewTerm>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TermBody<Term>>)> {
    require(&state, &user, Action::CreateTerm).await?;
    let Json(body) = body.map_err(bad_body)?;

    let term = body.term.into_term(Some(&vocabulary)).map_err(api_error)?;
    let mut term = state
        .store
        .save_term(term)
        .await
        .map_err(store_error("TermController.Create"))?;
    term.load_path(state.origin());

    debug!("created term {} '{}' in '{}'", term.id, term.text, term.vocabulary_name);

    Ok((StatusCode::CREATED, Json(TermBody { term })))
}

pub async fn get_term<S: Store>(
    State(state): State<AppState<S>>,
    Path((vocabulary, id)): Path<(String, Id)>,
) -> ApiResult<Json<TermBody<Term>>> {
    let mut term = load_term(&state, &vocabulary, id, "TermController.FindOne").await?;
    term.load_path(state.origin());
    Ok(Json(TermBody { term }))
}

pub async fn update_term<S: Store>(
    State(state): State<AppState<S>>,
    Path((vocabulary, id)): Path<(String, Id)>,
    user: UserContext,
    body: Result<Json<TermBody<TermUpdate>>, JsonRejection>,
) -> ApiResult<Json<TermBody<Term>>> {
    const OP: &str = "TermController.Update";

    require(&state, &user, Action::UpdateTerm).await?;
    let mut term = load_term(&state, &vocabulary, id, OP).await?;
    let Json(body) = body.map_err(bad_body)?;

    body.term.apply(&mut term).map_err(api_error)?;
    let mut term = state.store.save_term(term).await.map_err(store_error(OP))?;
    term.load_path(state.origin());

    Ok(Json(TermBody { term }))
}

pub async fn delete_term<S: Store>(
    State(state): State<AppState<S>>,
    Path((vocabulary, id)): Path<(String, Id)>,
    user: UserContext,
) -> ApiResult<StatusCode> {
    const OP: &str = "TermController.Delete";

    require(&state, &user, Action::DeleteTerm).await?;
    let term = load_term(&state, &vocabulary, id, OP).await?;

    state
        .store
        .delete_term(term.id)
        .await
        .map_err(store_error(OP))?;

    debug!("deleted term {} '{}'", term.id, term.text);
    Ok(StatusCode::NO_CONTENT)
}

/// Texts of the matching terms, without duplicates within the page
pub async fn term_texts<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<TermTextsResponse>> {
    let query = state.paginate(query);
    let page = state
        .store
        .query_terms(&query)
        .await
        .map_err(store_error("TermController.TermTexts"))?;

    Ok(Json(TermTextsResponse {
        term: page.records.into_iter().map(|t| t.text).unique().collect(),
        meta: Meta { count: page.count },
    }))
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_term_page(term: &Term, teasers: &[String], count: i64) -> String {
    let title = escape_html(&term.text);
    let description = escape_html(&term.description);

    let related = if teasers.is_empty() {
        "<p class=\"no-records\">No records</p>".to_string()
    } else {
        teasers
            .iter()
            .map(|teaser| format!("<li>{}</li>", teaser))
            .join("\n")
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<meta name="description" content="{description}">
<link rel="canonical" href="{link}">
</head>
<body class="body-content-findOne">
<h1>{title}</h1>
<p>{description}</p>
<ul class="related-records" data-count="{count}">
{related}
</ul>
</body>
</html>
"#,
        title = title,
        description = description,
        link = escape_html(&term.link_permanent),
        count = count,
        related = related,
    )
}

/// Human facing term page: JSON for API clients, otherwise HTML with the
/// teasers of the records tagged with the term
pub async fn term_page<S: Store>(
    State(state): State<AppState<S>>,
    Path((vocabulary, id)): Path<(String, Id)>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    const OP: &str = "TermController.FindOnePage";

    let mut term = load_term(&state, &vocabulary, id, OP).await?;
    term.load_path(state.origin());

    if wants_json(&headers) {
        return Ok(Json(TermBody { term }).into_response());
    }

    let related_query = state.paginate(ListQuery {
        vocabulary: Some(vocabulary),
        term_id: Some(term.id),
        limit: query.limit,
        offset: query.offset,
        ..Default::default()
    });

    // the page still renders when the related records can not be loaded
    let (associations, count) = match state.store.query_model_terms(&related_query).await {
        Ok(page) => (page.records, page.count),
        Err(e) => {
            warn!("{}: failed to load related records for term {}: {:#}", OP, term.id, e);
            (Vec::new(), 0)
        }
    };

    let mut teasers = Vec::with_capacity(associations.len());
    for association in &associations {
        match state.teasers.render(association).await {
            Ok(html) if !html.is_empty() => teasers.push(html),
            Ok(_) => {}
            Err(e) => error!(
                "{}: error rendering teaser for {} #{}: {:#}",
                OP, association.model_name, association.model_id, e
            ),
        }
    }

    Ok(Html(render_term_page(&term, &teasers, count)).into_response())
}
