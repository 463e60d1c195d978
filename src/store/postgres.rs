use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::Mutex;

use crate::model::{
    escape_like, Id, ListQuery, Listable, ModelTerm, NewModelTerm, NewTermRow, Page, Term,
    Vocabulary,
};
use crate::store::traits::{ModelTermStore, Store, StoreTransaction, TermStore, VocabularyStore};

const VOCABULARY_COLUMNS: &str = "id, name, description, created_at, updated_at, creator_id";
const TERM_COLUMNS: &str = "id, text, description, vocabulary_name, created_at, updated_at";
const MODEL_TERM_COLUMNS: &str =
    "id, model_name, model_id, field, vocabulary_name, term_id, term_order, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn connection(&self) -> Result<sqlx::pool::PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .context("Failed to acquire PostgreSQL connection")
    }
}

/// Statements shared by the pool-backed store and the transaction
mod queries {
    use super::*;

    pub async fn find_vocabulary(conn: &mut PgConnection, id: Id) -> Result<Option<Vocabulary>> {
        sqlx::query_as::<_, Vocabulary>(&format!(
            "SELECT {} FROM vocabularies WHERE id = $1",
            VOCABULARY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch vocabulary")
    }

    pub async fn find_vocabulary_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<Vocabulary>> {
        sqlx::query_as::<_, Vocabulary>(&format!(
            "SELECT {} FROM vocabularies WHERE name = $1",
            VOCABULARY_COLUMNS
        ))
        .bind(name)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch vocabulary by name")
    }

    pub async fn save_vocabulary(
        conn: &mut PgConnection,
        vocabulary: Vocabulary,
    ) -> Result<Vocabulary> {
        if vocabulary.id == 0 {
            sqlx::query_as::<_, Vocabulary>(&format!(
                r#"
                INSERT INTO vocabularies (name, description, creator_id, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                RETURNING {}
                "#,
                VOCABULARY_COLUMNS
            ))
            .bind(&vocabulary.name)
            .bind(&vocabulary.description)
            .bind(vocabulary.creator_id)
            .fetch_one(conn)
            .await
            .context("Failed to create vocabulary")
        } else {
            sqlx::query_as::<_, Vocabulary>(&format!(
                r#"
                UPDATE vocabularies
                SET name = $2, description = $3, creator_id = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                VOCABULARY_COLUMNS
            ))
            .bind(vocabulary.id)
            .bind(&vocabulary.name)
            .bind(&vocabulary.description)
            .bind(vocabulary.creator_id)
            .fetch_one(conn)
            .await
            .with_context(|| format!("Failed to update vocabulary {}", vocabulary.id))
        }
    }

    pub async fn delete_vocabulary(conn: &mut PgConnection, id: Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vocabularies WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to delete vocabulary")?;

        Ok(result.rows_affected() > 0)
    }

    fn push_vocabulary_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
        if let Some(q) = query.search() {
            let pattern = format!("%{}%", escape_like(q));
            builder.push(" AND (name LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR description LIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\')");
        }
    }

    pub async fn query_vocabularies(
        conn: &mut PgConnection,
        query: &ListQuery,
    ) -> Result<Page<Vocabulary>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM vocabularies WHERE 1=1",
            VOCABULARY_COLUMNS
        ));
        push_vocabulary_filters(&mut builder, query);
        push_order_and_window(&mut builder, query, Vocabulary::SORT_KEYS);

        let records = builder
            .build_query_as::<Vocabulary>()
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list vocabularies")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM vocabularies WHERE 1=1");
        push_vocabulary_filters(&mut count, query);
        let count: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await
            .context("Failed to count vocabularies")?;

        Ok(Page { records, count })
    }

    pub async fn find_term(conn: &mut PgConnection, id: Id) -> Result<Option<Term>> {
        sqlx::query_as::<_, Term>(&format!("SELECT {} FROM terms WHERE id = $1", TERM_COLUMNS))
            .bind(id)
            .fetch_optional(conn)
            .await
            .context("Failed to fetch term")
    }

    pub async fn find_term_by_text(
        conn: &mut PgConnection,
        text: &str,
        vocabulary_name: &str,
    ) -> Result<Option<Term>> {
        sqlx::query_as::<_, Term>(&format!(
            "SELECT {} FROM terms WHERE text = $1 AND vocabulary_name = $2 ORDER BY id LIMIT 1",
            TERM_COLUMNS
        ))
        .bind(text)
        .bind(vocabulary_name)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch term by text")
    }

    pub async fn find_terms_by_text(
        conn: &mut PgConnection,
        texts: &[String],
        vocabulary_name: &str,
    ) -> Result<Vec<Term>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Term>(&format!(
            "SELECT {} FROM terms WHERE text = ANY($1) AND vocabulary_name = $2 ORDER BY id",
            TERM_COLUMNS
        ))
        .bind(texts)
        .bind(vocabulary_name)
        .fetch_all(conn)
        .await
        .context("Failed to fetch terms by text")
    }

    pub async fn save_term(conn: &mut PgConnection, term: Term) -> Result<Term> {
        if term.id == 0 {
            sqlx::query_as::<_, Term>(&format!(
                r#"
                INSERT INTO terms (text, description, vocabulary_name, created_at, updated_at)
                VALUES ($1, $2, $3, NOW(), NOW())
                RETURNING {}
                "#,
                TERM_COLUMNS
            ))
            .bind(&term.text)
            .bind(&term.description)
            .bind(&term.vocabulary_name)
            .fetch_one(conn)
            .await
            .context("Failed to create term")
        } else {
            sqlx::query_as::<_, Term>(&format!(
                r#"
                UPDATE terms
                SET text = $2, description = $3, vocabulary_name = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                TERM_COLUMNS
            ))
            .bind(term.id)
            .bind(&term.text)
            .bind(&term.description)
            .bind(&term.vocabulary_name)
            .fetch_one(conn)
            .await
            .with_context(|| format!("Failed to update term {}", term.id))
        }
    }

    pub async fn create_terms(conn: &mut PgConnection, rows: Vec<NewTermRow>) -> Result<Vec<Term>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO terms (text, description, vocabulary_name, created_at, updated_at) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.text)
                .push_bind("")
                .push_bind(row.vocabulary_name)
                .push("NOW()")
                .push("NOW()");
        });
        builder.push(format!(" RETURNING {}", TERM_COLUMNS));

        builder
            .build_query_as::<Term>()
            .fetch_all(conn)
            .await
            .context("Failed to create terms")
    }

    pub async fn delete_term(conn: &mut PgConnection, id: Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM terms WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to delete term")?;

        Ok(result.rows_affected() > 0)
    }

    fn push_term_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
        if let Some(q) = query.search() {
            let pattern = format!("%{}%", escape_like(q));
            builder.push(" AND (text LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR description LIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\')");
        }
        if let Some(vocabulary) = query.vocabulary_name() {
            builder.push(" AND vocabulary_name = ");
            builder.push_bind(vocabulary.to_string());
        }
        if let Some(prefix) = query.text_prefix() {
            builder.push(" AND text LIKE ");
            builder.push_bind(format!("{}%", escape_like(prefix)));
            builder.push(" ESCAPE '\\'");
        }
    }

    pub async fn query_terms(conn: &mut PgConnection, query: &ListQuery) -> Result<Page<Term>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM terms WHERE 1=1", TERM_COLUMNS));
        push_term_filters(&mut builder, query);
        push_order_and_window(&mut builder, query, Term::SORT_KEYS);

        let records = builder
            .build_query_as::<Term>()
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list terms")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM terms WHERE 1=1");
        push_term_filters(&mut count, query);
        let count: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await
            .context("Failed to count terms")?;

        Ok(Page { records, count })
    }

    pub async fn find_model_term(
        conn: &mut PgConnection,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>> {
        sqlx::query_as::<_, ModelTerm>(&format!(
            r#"
            SELECT {} FROM model_terms
            WHERE model_name = $1 AND field = $2 AND model_id = $3 AND term_id = $4
            ORDER BY id
            LIMIT 1
            "#,
            MODEL_TERM_COLUMNS
        ))
        .bind(model_name)
        .bind(field)
        .bind(model_id)
        .bind(term_id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch model term")
    }

    pub async fn create_model_terms(
        conn: &mut PgConnection,
        rows: Vec<NewModelTerm>,
    ) -> Result<Vec<ModelTerm>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO model_terms (model_name, model_id, field, vocabulary_name, term_id, term_order, created_at, updated_at) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.model_name)
                .push_bind(row.model_id)
                .push_bind(row.field)
                .push_bind(row.vocabulary_name)
                .push_bind(row.term_id)
                .push_bind(row.order)
                .push("NOW()")
                .push("NOW()");
        });
        builder.push(format!(" RETURNING {}", MODEL_TERM_COLUMNS));

        builder
            .build_query_as::<ModelTerm>()
            .fetch_all(conn)
            .await
            .context("Failed to create model terms")
    }

    pub async fn find_field_terms(
        conn: &mut PgConnection,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>> {
        sqlx::query_as::<_, Term>(
            r#"
            SELECT t.id, t.text, t.description, t.vocabulary_name, t.created_at, t.updated_at
            FROM terms AS t
            INNER JOIN model_terms AS a ON a.term_id = t.id
            WHERE a.vocabulary_name = $1
              AND a.field = $2
              AND a.model_name = $3
              AND a.model_id = $4
            ORDER BY a.term_order ASC, a.id ASC
            "#,
        )
        .bind(vocabulary_name)
        .bind(field)
        .bind(model_name)
        .bind(model_id)
        .fetch_all(conn)
        .await
        .context("Failed to fetch field terms")
    }

    pub async fn find_model_term_ids(
        conn: &mut PgConnection,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>> {
        if term_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar::<_, Id>(
            r#"
            SELECT id FROM model_terms
            WHERE model_name = $1 AND field = $2 AND model_id = $3 AND term_id = ANY($4)
            "#,
        )
        .bind(model_name)
        .bind(field)
        .bind(model_id)
        .bind(term_ids)
        .fetch_all(conn)
        .await
        .context("Failed to fetch model term ids")
    }

    pub async fn delete_model_terms(conn: &mut PgConnection, ids: &[Id]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM model_terms WHERE id = ANY($1)")
            .bind(ids)
            .execute(conn)
            .await
            .context("Failed to delete model terms")?;

        Ok(result.rows_affected())
    }

    pub async fn delete_model_terms_for(
        conn: &mut PgConnection,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64> {
        let result = match field {
            Some(field) => {
                sqlx::query(
                    "DELETE FROM model_terms WHERE model_name = $1 AND model_id = $2 AND field = $3",
                )
                .bind(model_name)
                .bind(model_id)
                .bind(field)
                .execute(conn)
                .await
            }
            None => {
                sqlx::query("DELETE FROM model_terms WHERE model_name = $1 AND model_id = $2")
                    .bind(model_name)
                    .bind(model_id)
                    .execute(conn)
                    .await
            }
        }
        .context("Failed to clear model terms")?;

        Ok(result.rows_affected())
    }

    fn push_model_term_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
        if let Some(vocabulary) = query.vocabulary_name() {
            builder.push(" AND vocabulary_name = ");
            builder.push_bind(vocabulary.to_string());
        }
        if let Some(term_id) = query.term_id {
            builder.push(" AND term_id = ");
            builder.push_bind(term_id);
        }
    }

    pub async fn query_model_terms(
        conn: &mut PgConnection,
        query: &ListQuery,
    ) -> Result<Page<ModelTerm>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM model_terms WHERE 1=1",
            MODEL_TERM_COLUMNS
        ));
        push_model_term_filters(&mut builder, query);
        push_order_and_window(&mut builder, query, ModelTerm::SORT_KEYS);

        let records = builder
            .build_query_as::<ModelTerm>()
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list model terms")?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM model_terms WHERE 1=1");
        push_model_term_filters(&mut count, query);
        let count: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await
            .context("Failed to count model terms")?;

        Ok(Page { records, count })
    }

    fn push_order_and_window(
        builder: &mut QueryBuilder<'_, Postgres>,
        query: &ListQuery,
        allowed: &[crate::model::SortKey],
    ) {
        builder.push(" ORDER BY ");
        builder.push(query.order_by(allowed).to_sql());

        let (limit, offset) = query.window();
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }
    }
}

#[async_trait::async_trait]
impl VocabularyStore for PostgresStore {
    async fn find_vocabulary(&self, id: Id) -> Result<Option<Vocabulary>> {
        queries::find_vocabulary(&mut *self.connection().await?, id).await
    }

    async fn find_vocabulary_by_name(&self, name: &str) -> Result<Option<Vocabulary>> {
        queries::find_vocabulary_by_name(&mut *self.connection().await?, name).await
    }

    async fn save_vocabulary(&self, vocabulary: Vocabulary) -> Result<Vocabulary> {
        queries::save_vocabulary(&mut *self.connection().await?, vocabulary).await
    }

    async fn delete_vocabulary(&self, id: Id) -> Result<bool> {
        queries::delete_vocabulary(&mut *self.connection().await?, id).await
    }

    async fn query_vocabularies(&self, query: &ListQuery) -> Result<Page<Vocabulary>> {
        queries::query_vocabularies(&mut *self.connection().await?, query).await
    }
}

#[async_trait::async_trait]
impl TermStore for PostgresStore {
    async fn find_term(&self, id: Id) -> Result<Option<Term>> {
        queries::find_term(&mut *self.connection().await?, id).await
    }

    async fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Result<Option<Term>> {
        queries::find_term_by_text(&mut *self.connection().await?, text, vocabulary_name).await
    }

    async fn find_terms_by_text(
        &self,
        texts: &[String],
        vocabulary_name: &str,
    ) -> Result<Vec<Term>> {
        queries::find_terms_by_text(&mut *self.connection().await?, texts, vocabulary_name).await
    }

    async fn save_term(&self, term: Term) -> Result<Term> {
        queries::save_term(&mut *self.connection().await?, term).await
    }

    async fn create_terms(&self, terms: Vec<NewTermRow>) -> Result<Vec<Term>> {
        queries::create_terms(&mut *self.connection().await?, terms).await
    }

    async fn delete_term(&self, id: Id) -> Result<bool> {
        queries::delete_term(&mut *self.connection().await?, id).await
    }

    async fn query_terms(&self, query: &ListQuery) -> Result<Page<Term>> {
        queries::query_terms(&mut *self.connection().await?, query).await
    }
}

#[async_trait::async_trait]
impl ModelTermStore for PostgresStore {
    async fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>> {
        queries::find_model_term(
            &mut *self.connection().await?,
            model_name,
            field,
            model_id,
            term_id,
        )
        .await
    }

    async fn create_model_terms(&self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>> {
        queries::create_model_terms(&mut *self.connection().await?, rows).await
    }

    async fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>> {
        queries::find_field_terms(
            &mut *self.connection().await?,
            vocabulary_name,
            model_name,
            field,
            model_id,
        )
        .await
    }

    async fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>> {
        queries::find_model_term_ids(
            &mut *self.connection().await?,
            model_name,
            field,
            model_id,
            term_ids,
        )
        .await
    }

    async fn delete_model_terms(&self, ids: &[Id]) -> Result<u64> {
        queries::delete_model_terms(&mut *self.connection().await?, ids).await
    }

    async fn delete_model_terms_for(
        &self,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64> {
        queries::delete_model_terms_for(&mut *self.connection().await?, model_name, model_id, field)
            .await
    }

    async fn query_model_terms(&self, query: &ListQuery) -> Result<Page<ModelTerm>> {
        queries::query_model_terms(&mut *self.connection().await?, query).await
    }
}

/// A `BEGIN`..`COMMIT` block on one pooled connection. Dropping it rolls back.
pub struct PostgresTransaction {
    tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(PostgresTransaction { tx: Mutex::new(tx) })
    }
}

#[async_trait::async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx
            .into_inner()
            .commit()
            .await
            .context("Failed to commit transaction")
    }
}

#[async_trait::async_trait]
impl VocabularyStore for PostgresTransaction {
    async fn find_vocabulary(&self, id: Id) -> Result<Option<Vocabulary>> {
        queries::find_vocabulary(&mut **self.tx.lock().await, id).await
    }

    async fn find_vocabulary_by_name(&self, name: &str) -> Result<Option<Vocabulary>> {
        queries::find_vocabulary_by_name(&mut **self.tx.lock().await, name).await
    }

    async fn save_vocabulary(&self, vocabulary: Vocabulary) -> Result<Vocabulary> {
        queries::save_vocabulary(&mut **self.tx.lock().await, vocabulary).await
    }

    async fn delete_vocabulary(&self, id: Id) -> Result<bool> {
        queries::delete_vocabulary(&mut **self.tx.lock().await, id).await
    }

    async fn query_vocabularies(&self, query: &ListQuery) -> Result<Page<Vocabulary>> {
        queries::query_vocabularies(&mut **self.tx.lock().await, query).await
    }
}

#[async_trait::async_trait]
impl TermStore for PostgresTransaction {
    async fn find_term(&self, id: Id) -> Result<Option<Term>> {
        queries::find_term(&mut **self.tx.lock().await, id).await
    }

    async fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Result<Option<Term>> {
        queries::find_term_by_text(&mut **self.tx.lock().await, text, vocabulary_name).await
    }

    async fn find_terms_by_text(
        &self,
        texts: &[String],
        vocabulary_name: &str,
    ) -> Result<Vec<Term>> {
        queries::find_terms_by_text(&mut **self.tx.lock().await, texts, vocabulary_name).await
    }

    async fn save_term(&self, term: Term) -> Result<Term> {
        queries::save_term(&mut **self.tx.lock().await, term).await
    }

    async fn create_terms(&self, terms: Vec<NewTermRow>) -> Result<Vec<Term>> {
        queries::create_terms(&mut **self.tx.lock().await, terms).await
    }

    async fn delete_term(&self, id: Id) -> Result<bool> {
        queries::delete_term(&mut **self.tx.lock().await, id).await
    }

    async fn query_terms(&self, query: &ListQuery) -> Result<Page<Term>> {
        queries::query_terms(&mut **self.tx.lock().await, query).await
    }
}

#[async_trait::async_trait]
impl ModelTermStore for PostgresTransaction {
    async fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>> {
        queries::find_model_term(
            &mut **self.tx.lock().await,
            model_name,
            field,
            model_id,
            term_id,
        )
        .await
    }

    async fn create_model_terms(&self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>> {
        queries::create_model_terms(&mut **self.tx.lock().await, rows).await
    }

    async fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>> {
        queries::find_field_terms(
            &mut **self.tx.lock().await,
            vocabulary_name,
            model_name,
            field,
            model_id,
        )
        .await
    }

    async fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>> {
        queries::find_model_term_ids(
            &mut **self.tx.lock().await,
            model_name,
            field,
            model_id,
            term_ids,
        )
        .await
    }

    async fn delete_model_terms(&self, ids: &[Id]) -> Result<u64> {
        queries::delete_model_terms(&mut **self.tx.lock().await, ids).await
    }

    async fn delete_model_terms_for(
        &self,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64> {
        queries::delete_model_terms_for(&mut **self.tx.lock().await, model_name, model_id, field)
            .await
    }

    async fn query_model_terms(&self, query: &ListQuery) -> Result<Page<ModelTerm>> {
        queries::query_model_terms(&mut **self.tx.lock().await, query).await
    }
}
