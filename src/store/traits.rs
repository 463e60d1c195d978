use crate::model::{Id, ListQuery, ModelTerm, NewModelTerm, NewTermRow, Page, Term, Vocabulary};
use anyhow::Result;

#[async_trait::async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn find_vocabulary(&self, id: Id) -> Result<Option<Vocabulary>>;
    async fn find_vocabulary_by_name(&self, name: &str) -> Result<Option<Vocabulary>>;
    /// Insert when `id == 0`, update otherwise. Returns the stored record.
    async fn save_vocabulary(&self, vocabulary: Vocabulary) -> Result<Vocabulary>;
    /// Hard delete. Terms and associations of the vocabulary are left in place.
    async fn delete_vocabulary(&self, id: Id) -> Result<bool>;
    async fn query_vocabularies(&self, query: &ListQuery) -> Result<Page<Vocabulary>>;
}

#[async_trait::async_trait]
pub trait TermStore: Send + Sync {
    async fn find_term(&self, id: Id) -> Result<Option<Term>>;
    /// First term with this exact text in the vocabulary, if any
    async fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Result<Option<Term>>;
    /// All terms whose text is one of `texts` in the vocabulary, in no particular order
    async fn find_terms_by_text(&self, texts: &[String], vocabulary_name: &str)
        -> Result<Vec<Term>>;
    /// Insert when `id == 0`, update otherwise. Returns the stored record.
    async fn save_term(&self, term: Term) -> Result<Term>;
    async fn create_terms(&self, terms: Vec<NewTermRow>) -> Result<Vec<Term>>;
    async fn delete_term(&self, id: Id) -> Result<bool>;
    async fn query_terms(&self, query: &ListQuery) -> Result<Page<Term>>;
}

/// Persistence of model <-> term associations
#[async_trait::async_trait]
pub trait ModelTermStore: Send + Sync {
    async fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>>;
    async fn create_model_terms(&self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>>;
    /// Terms associated with a model field, joined through the association table,
    /// ordered by association `order` then association id
    async fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>>;
    async fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>>;
    async fn delete_model_terms(&self, ids: &[Id]) -> Result<u64>;
    /// Delete every association of a model instance, optionally limited to one field
    async fn delete_model_terms_for(
        &self,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64>;
    async fn query_model_terms(&self, query: &ListQuery) -> Result<Page<ModelTerm>>;
}

/// Everything the field engine and the HTTP layer read and write
pub trait TaxonomyStore: VocabularyStore + TermStore + ModelTermStore {}
impl<T: VocabularyStore + TermStore + ModelTermStore> TaxonomyStore for T {}

/// A unit of work. Dropping it without `commit` discards every write made through it.
#[async_trait::async_trait]
pub trait StoreTransaction: TaxonomyStore + Sized {
    async fn commit(self) -> Result<()>;
}

#[async_trait::async_trait]
pub trait Store: TaxonomyStore {
    type Transaction: StoreTransaction + 'static;

    async fn begin(&self) -> Result<Self::Transaction>;
}
