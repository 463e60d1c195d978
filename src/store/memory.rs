use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    apply_list_query, Id, ListQuery, ModelTerm, NewModelTerm, NewTermRow, Page, Term, Vocabulary,
};
use crate::store::traits::{ModelTermStore, Store, StoreTransaction, TermStore, VocabularyStore};

/// Tables held by the memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    vocabularies: BTreeMap<Id, Vocabulary>,
    terms: BTreeMap<Id, Term>,
    model_terms: BTreeMap<Id, ModelTerm>,
    last_vocabulary_id: Id,
    last_term_id: Id,
    last_model_term_id: Id,
    /// Number of delete statements executed against association rows
    #[cfg(test)]
    delete_statements: u64,
    /// When set, association inserts fail like a lost connection would
    #[cfg(test)]
    fail_association_writes: bool,
}

impl MemoryState {
    fn find_vocabulary(&self, id: Id) -> Option<Vocabulary> {
        self.vocabularies.get(&id).cloned()
    }

    fn find_vocabulary_by_name(&self, name: &str) -> Option<Vocabulary> {
        self.vocabularies.values().find(|v| v.name == name).cloned()
    }

    fn save_vocabulary(&mut self, mut vocabulary: Vocabulary) -> Result<Vocabulary> {
        let duplicate = self
            .vocabularies
            .values()
            .any(|v| v.name == vocabulary.name && v.id != vocabulary.id);
        if duplicate {
            bail!(
                "duplicate key value violates unique constraint \"vocabularies_name_key\": {}",
                vocabulary.name
            );
        }

        let now = Utc::now();
        if vocabulary.id == 0 {
            self.last_vocabulary_id += 1;
            vocabulary.id = self.last_vocabulary_id;
            vocabulary.created_at = now;
        } else {
            let Some(stored) = self.vocabularies.get(&vocabulary.id) else {
                bail!("vocabulary {} does not exist", vocabulary.id);
            };
            vocabulary.created_at = stored.created_at;
        }
        vocabulary.updated_at = now;
        vocabulary.link_permanent = String::new();

        self.vocabularies.insert(vocabulary.id, vocabulary.clone());
        Ok(vocabulary)
    }

    fn delete_vocabulary(&mut self, id: Id) -> bool {
        self.vocabularies.remove(&id).is_some()
    }

    fn query_vocabularies(&self, query: &ListQuery) -> Page<Vocabulary> {
        let records: Vec<Vocabulary> = self.vocabularies.values().cloned().collect();
        apply_list_query(&records, query)
    }

    fn find_term(&self, id: Id) -> Option<Term> {
        self.terms.get(&id).cloned()
    }

    fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Option<Term> {
        self.terms
            .values()
            .find(|t| t.text == text && t.vocabulary_name == vocabulary_name)
            .cloned()
    }

    fn find_terms_by_text(&self, texts: &[String], vocabulary_name: &str) -> Vec<Term> {
        self.terms
            .values()
            .filter(|t| t.vocabulary_name == vocabulary_name && texts.contains(&t.text))
            .cloned()
            .collect()
    }

    fn save_term(&mut self, mut term: Term) -> Result<Term> {
        let now = Utc::now();
        if term.id == 0 {
            self.last_term_id += 1;
            term.id = self.last_term_id;
            term.created_at = now;
        } else {
            let Some(stored) = self.terms.get(&term.id) else {
                bail!("term {} does not exist", term.id);
            };
            term.created_at = stored.created_at;
        }
        term.updated_at = now;
        term.link_permanent = String::new();

        self.terms.insert(term.id, term.clone());
        Ok(term)
    }

    fn create_terms(&mut self, rows: Vec<NewTermRow>) -> Vec<Term> {
        let now = Utc::now();
        rows.into_iter()
            .map(|row| {
                self.last_term_id += 1;
                let mut term = Term::new(row.text, String::new(), row.vocabulary_name);
                term.id = self.last_term_id;
                term.created_at = now;
                term.updated_at = now;
                self.terms.insert(term.id, term.clone());
                term
            })
            .collect()
    }

    fn delete_term(&mut self, id: Id) -> bool {
        self.terms.remove(&id).is_some()
    }

    fn query_terms(&self, query: &ListQuery) -> Page<Term> {
        let records: Vec<Term> = self.terms.values().cloned().collect();
        apply_list_query(&records, query)
    }

    fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Option<ModelTerm> {
        self.model_terms
            .values()
            .find(|a| {
                a.model_name == model_name
                    && a.field == field
                    && a.model_id == model_id
                    && a.term_id == Some(term_id)
            })
            .cloned()
    }

    fn create_model_terms(&mut self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>> {
        #[cfg(test)]
        if self.fail_association_writes {
            bail!("Failed to create model terms: association table unavailable");
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                self.last_model_term_id += 1;
                let association = row.into_model_term(self.last_model_term_id);
                self.model_terms
                    .insert(association.id, association.clone());
                association
            })
            .collect())
    }

    fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Vec<Term> {
        let mut associations: Vec<&ModelTerm> = self
            .model_terms
            .values()
            .filter(|a| {
                a.vocabulary_name == vocabulary_name
                    && a.field == field
                    && a.model_name == model_name
                    && a.model_id == model_id
            })
            .collect();
        associations.sort_by_key(|a| (a.order, a.id));

        associations
            .into_iter()
            .filter_map(|a| a.term_id.and_then(|id| self.terms.get(&id)).cloned())
            .collect()
    }

    fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Vec<Id> {
        self.model_terms
            .values()
            .filter(|a| {
                a.model_name == model_name
                    && a.field == field
                    && a.model_id == model_id
                    && a.term_id.map(|id| term_ids.contains(&id)).unwrap_or(false)
            })
            .map(|a| a.id)
            .collect()
    }

    fn delete_model_terms(&mut self, ids: &[Id]) -> u64 {
        #[cfg(test)]
        {
            self.delete_statements += 1;
        }
        ids.iter()
            .filter(|id| self.model_terms.remove(*id).is_some())
            .count() as u64
    }

    fn delete_model_terms_for(&mut self, model_name: &str, model_id: Id, field: Option<&str>) -> u64 {
        #[cfg(test)]
        {
            self.delete_statements += 1;
        }
        let before = self.model_terms.len();
        self.model_terms.retain(|_, a| {
            let matches = a.model_name == model_name
                && a.model_id == model_id
                && field.map(|f| a.field == f).unwrap_or(true);
            !matches
        });
        (before - self.model_terms.len()) as u64
    }

    fn query_model_terms(&self, query: &ListQuery) -> Page<ModelTerm> {
        let records: Vec<ModelTerm> = self.model_terms.values().cloned().collect();
        apply_list_query(&records, query)
    }
}

/// In-process store used by tests and by the `memory` backend.
///
/// A transaction holds the state lock until it is committed or dropped, so
/// transactions are serialized against each other and against plain calls.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete statements issued so far against the association table
    #[cfg(test)]
    pub async fn delete_statements(&self) -> u64 {
        self.state.lock().await.delete_statements
    }

    /// Make every following association insert fail until switched off
    #[cfg(test)]
    pub async fn fail_association_writes(&self, fail: bool) {
        self.state.lock().await.fail_association_writes = fail;
    }

    #[cfg(test)]
    pub async fn model_term_count(&self) -> usize {
        self.state.lock().await.model_terms.len()
    }
}

#[async_trait::async_trait]
impl VocabularyStore for MemoryStore {
    async fn find_vocabulary(&self, id: Id) -> Result<Option<Vocabulary>> {
        Ok(self.state.lock().await.find_vocabulary(id))
    }

    async fn find_vocabulary_by_name(&self, name: &str) -> Result<Option<Vocabulary>> {
        Ok(self.state.lock().await.find_vocabulary_by_name(name))
    }

    async fn save_vocabulary(&self, vocabulary: Vocabulary) -> Result<Vocabulary> {
        self.state.lock().await.save_vocabulary(vocabulary)
    }

    async fn delete_vocabulary(&self, id: Id) -> Result<bool> {
        Ok(self.state.lock().await.delete_vocabulary(id))
    }

    async fn query_vocabularies(&self, query: &ListQuery) -> Result<Page<Vocabulary>> {
        Ok(self.state.lock().await.query_vocabularies(query))
    }
}

#[async_trait::async_trait]
impl TermStore for MemoryStore {
    async fn find_term(&self, id: Id) -> Result<Option<Term>> {
        Ok(self.state.lock().await.find_term(id))
    }

    async fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Result<Option<Term>> {
        Ok(self.state.lock().await.find_term_by_text(text, vocabulary_name))
    }

    async fn find_terms_by_text(
        &self,
        texts: &[String],
        vocabulary_name: &str,
    ) -> Result<Vec<Term>> {
        Ok(self.state.lock().await.find_terms_by_text(texts, vocabulary_name))
    }

    async fn save_term(&self, term: Term) -> Result<Term> {
        self.state.lock().await.save_term(term)
    }

    async fn create_terms(&self, terms: Vec<NewTermRow>) -> Result<Vec<Term>> {
        Ok(self.state.lock().await.create_terms(terms))
    }

    async fn delete_term(&self, id: Id) -> Result<bool> {
        Ok(self.state.lock().await.delete_term(id))
    }

    async fn query_terms(&self, query: &ListQuery) -> Result<Page<Term>> {
        Ok(self.state.lock().await.query_terms(query))
    }
}

#[async_trait::async_trait]
impl ModelTermStore for MemoryStore {
    async fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>> {
        Ok(self
            .state
            .lock()
            .await
            .find_model_term(model_name, field, model_id, term_id))
    }

    async fn create_model_terms(&self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>> {
        self.state.lock().await.create_model_terms(rows)
    }

    async fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>> {
        Ok(self
            .state
            .lock()
            .await
            .find_field_terms(vocabulary_name, model_name, field, model_id))
    }

    async fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>> {
        Ok(self
            .state
            .lock()
            .await
            .find_model_term_ids(model_name, field, model_id, term_ids))
    }

    async fn delete_model_terms(&self, ids: &[Id]) -> Result<u64> {
        Ok(self.state.lock().await.delete_model_terms(ids))
    }

    async fn delete_model_terms_for(
        &self,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .delete_model_terms_for(model_name, model_id, field))
    }

    async fn query_model_terms(&self, query: &ListQuery) -> Result<Page<ModelTerm>> {
        Ok(self.state.lock().await.query_model_terms(query))
    }
}

#[derive(Debug)]
struct TransactionState {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

/// Writes go to a private copy that replaces the shared state on commit
#[derive(Debug)]
pub struct MemoryTransaction {
    inner: Mutex<TransactionState>,
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction {
            inner: Mutex::new(TransactionState { guard, working }),
        })
    }
}

#[async_trait::async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let TransactionState { mut guard, working } = self.inner.into_inner();
        *guard = working;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VocabularyStore for MemoryTransaction {
    async fn find_vocabulary(&self, id: Id) -> Result<Option<Vocabulary>> {
        Ok(self.inner.lock().await.working.find_vocabulary(id))
    }

    async fn find_vocabulary_by_name(&self, name: &str) -> Result<Option<Vocabulary>> {
        Ok(self.inner.lock().await.working.find_vocabulary_by_name(name))
    }

    async fn save_vocabulary(&self, vocabulary: Vocabulary) -> Result<Vocabulary> {
        self.inner.lock().await.working.save_vocabulary(vocabulary)
    }

    async fn delete_vocabulary(&self, id: Id) -> Result<bool> {
        Ok(self.inner.lock().await.working.delete_vocabulary(id))
    }

    async fn query_vocabularies(&self, query: &ListQuery) -> Result<Page<Vocabulary>> {
        Ok(self.inner.lock().await.working.query_vocabularies(query))
    }
}

#[async_trait::async_trait]
impl TermStore for MemoryTransaction {
    async fn find_term(&self, id: Id) -> Result<Option<Term>> {
        Ok(self.inner.lock().await.working.find_term(id))
    }

    async fn find_term_by_text(&self, text: &str, vocabulary_name: &str) -> Result<Option<Term>> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .find_term_by_text(text, vocabulary_name))
    }

    async fn find_terms_by_text(
        &self,
        texts: &[String],
        vocabulary_name: &str,
    ) -> Result<Vec<Term>> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .find_terms_by_text(texts, vocabulary_name))
    }

    async fn save_term(&self, term: Term) -> Result<Term> {
        self.inner.lock().await.working.save_term(term)
    }

    async fn create_terms(&self, terms: Vec<NewTermRow>) -> Result<Vec<Term>> {
        Ok(self.inner.lock().await.working.create_terms(terms))
    }

    async fn delete_term(&self, id: Id) -> Result<bool> {
        Ok(self.inner.lock().await.working.delete_term(id))
    }

    async fn query_terms(&self, query: &ListQuery) -> Result<Page<Term>> {
        Ok(self.inner.lock().await.working.query_terms(query))
    }
}

#[async_trait::async_trait]
impl ModelTermStore for MemoryTransaction {
    async fn find_model_term(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_id: Id,
    ) -> Result<Option<ModelTerm>> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .find_model_term(model_name, field, model_id, term_id))
    }

    async fn create_model_terms(&self, rows: Vec<NewModelTerm>) -> Result<Vec<ModelTerm>> {
        self.inner.lock().await.working.create_model_terms(rows)
    }

    async fn find_field_terms(
        &self,
        vocabulary_name: &str,
        model_name: &str,
        field: &str,
        model_id: Id,
    ) -> Result<Vec<Term>> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .find_field_terms(vocabulary_name, model_name, field, model_id))
    }

    async fn find_model_term_ids(
        &self,
        model_name: &str,
        field: &str,
        model_id: Id,
        term_ids: &[Id],
    ) -> Result<Vec<Id>> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .find_model_term_ids(model_name, field, model_id, term_ids))
    }

    async fn delete_model_terms(&self, ids: &[Id]) -> Result<u64> {
        Ok(self.inner.lock().await.working.delete_model_terms(ids))
    }

    async fn delete_model_terms_for(
        &self,
        model_name: &str,
        model_id: Id,
        field: Option<&str>,
    ) -> Result<u64> {
        Ok(self
            .inner
            .lock()
            .await
            .working
            .delete_model_terms_for(model_name, model_id, field))
    }

    async fn query_model_terms(&self, query: &ListQuery) -> Result<Page<ModelTerm>> {
        Ok(self.inner.lock().await.working.query_model_terms(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_find_vocabulary() {
        let store = MemoryStore::new();
        let vocabulary = Vocabulary::new("Tags".to_string(), "Free tags".to_string(), Some(4));

        let saved = store.save_vocabulary(vocabulary.clone()).await.unwrap();
        assert_ne!(saved.id, 0);

        let found = store.find_vocabulary(saved.id).await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.name, vocabulary.name);
        assert_eq!(found.description, vocabulary.description);
        assert_eq!(found.creator_id, vocabulary.creator_id);

        assert!(store.find_vocabulary(saved.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vocabulary_name_is_unique() {
        let store = MemoryStore::new();
        store
            .save_vocabulary(Vocabulary::new("Tags".to_string(), String::new(), None))
            .await
            .unwrap();

        let duplicate = store
            .save_vocabulary(Vocabulary::new("Tags".to_string(), String::new(), None))
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryStore::new();
        let saved = store
            .save_term(Term::new("rust".to_string(), String::new(), "Tags".to_string()))
            .await
            .unwrap();

        let mut changed = saved.clone();
        changed.description = "Systems language".to_string();
        let updated = store.save_term(changed).await.unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.created_at, saved.created_at);
        assert_eq!(updated.description, "Systems language");
    }

    #[tokio::test]
    async fn test_lookups_by_text_return_empty_when_missing() {
        let store = MemoryStore::new();
        store
            .create_terms(vec![NewTermRow {
                text: "gaming".to_string(),
                vocabulary_name: "Tags".to_string(),
            }])
            .await
            .unwrap();

        assert!(store
            .find_term_by_text("gaming", "Category")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_terms_by_text(&["health".to_string()], "Tags")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .find_terms_by_text(&["gaming".to_string()], "Tags")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_transaction_dropped_without_commit_rolls_back() {
        let store = MemoryStore::new();

        {
            let tx = store.begin().await.unwrap();
            tx.create_terms(vec![NewTermRow {
                text: "draft".to_string(),
                vocabulary_name: "Tags".to_string(),
            }])
            .await
            .unwrap();
            assert!(tx.find_term_by_text("draft", "Tags").await.unwrap().is_some());
        }

        assert!(store
            .find_term_by_text("draft", "Tags")
            .await
            .unwrap()
            .is_none());

        let tx = store.begin().await.unwrap();
        tx.create_terms(vec![NewTermRow {
            text: "kept".to_string(),
            vocabulary_name: "Tags".to_string(),
        }])
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(store
            .find_term_by_text("kept", "Tags")
            .await
            .unwrap()
            .is_some());
    }
}
