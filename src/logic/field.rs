//! Term fields on arbitrary models.
//!
//! A [`FieldConfiguration`] names a field (`"Article".tags`) and the vocabulary
//! its terms come from. Its operations keep the association rows of one model
//! instance in line with the list of texts a caller wants on that field.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::model::{Id, ModelTerm, NewModelTerm, NewTermRow, Term, DEFAULT_VOCABULARY};
use crate::store::{Store, StoreTransaction, TaxonomyStore};

pub const CATEGORY_VOCABULARY: &str = "Category";
pub const TAG_VOCABULARY: &str = DEFAULT_VOCABULARY;

/// What `update` does with associations that stay on the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderMode {
    /// Retained rows keep their `order`; only added rows get new positions
    #[default]
    KeepExisting,
    /// Every row is rewritten so `order` follows the desired list
    FullResync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfiguration {
    pub vocabulary_name: String,
    pub model_name: String,
    pub field_name: String,
    pub can_create: bool,
    pub form_field_multiple: bool,
    pub only_lowercase: bool,
    pub reorder: ReorderMode,
}

impl FieldConfiguration {
    pub fn new(
        vocabulary_name: impl Into<String>,
        model_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            vocabulary_name: vocabulary_name.into(),
            model_name: model_name.into(),
            field_name: field_name.into(),
            can_create: false,
            form_field_multiple: false,
            only_lowercase: false,
            reorder: ReorderMode::default(),
        }
    }

    /// Single-valued field over the "Category" vocabulary. Terms are curated, not typed in.
    pub fn category(model_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::new(CATEGORY_VOCABULARY, model_name, field_name)
    }

    /// Multi-valued, free-form field over the "Tags" vocabulary, lowercased
    pub fn tag(model_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            can_create: true,
            form_field_multiple: true,
            only_lowercase: true,
            ..Self::new(TAG_VOCABULARY, model_name, field_name)
        }
    }

    pub fn with_reorder(mut self, reorder: ReorderMode) -> Self {
        self.reorder = reorder;
        self
    }

    pub fn vocabulary_name(&self) -> &str {
        &self.vocabulary_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn can_create(&self) -> bool {
        self.can_create
    }

    pub fn form_field_multiple(&self) -> bool {
        self.form_field_multiple
    }

    pub fn only_lowercase(&self) -> bool {
        self.only_lowercase
    }

    /// Trimmed text, lowercased when the field asks for it. `None` for blank input.
    pub fn normalize_text(&self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(if self.only_lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        })
    }

    /// Normalized texts in input order, first occurrence wins
    pub fn normalize_texts<T: AsRef<str>>(&self, texts: &[T]) -> Vec<String> {
        texts
            .iter()
            .filter_map(|text| self.normalize_text(text.as_ref()))
            .unique()
            .collect()
    }

    /// Texts to look terms up by: each input as given (trimmed) followed by its
    /// normalized form, so rows stored before lowercasing was enabled still match
    fn lookup_texts<T: AsRef<str>>(&self, texts: &[T]) -> Vec<String> {
        texts
            .iter()
            .flat_map(|text| {
                let given = text.as_ref().trim().to_string();
                let normalized = self.normalize_text(&given);
                std::iter::once(given).chain(normalized)
            })
            .filter(|text| !text.is_empty())
            .unique()
            .collect()
    }

    fn association(&self, model_id: Id, term_id: Id, order: usize) -> NewModelTerm {
        NewModelTerm {
            model_name: self.model_name.clone(),
            model_id,
            field: self.field_name.clone(),
            vocabulary_name: self.vocabulary_name.clone(),
            term_id,
            order: i32::try_from(order).unwrap_or(i32::MAX),
        }
    }

    /// First term on the field by `order`
    pub async fn find_one_term<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
    ) -> TaxonomyResult<Option<Term>> {
        let terms = self
            .field_terms(store, model_id)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::find_one_term"))?;
        Ok(terms.into_iter().next())
    }

    /// Every term on the field, ordered by `order`
    pub async fn find_many_terms<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
    ) -> TaxonomyResult<Vec<Term>> {
        self.field_terms(store, model_id)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::find_many_terms"))
    }

    pub async fn find_one_assoc<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
        term_id: Id,
    ) -> TaxonomyResult<Option<ModelTerm>> {
        store
            .find_model_term(&self.model_name, &self.field_name, model_id, term_id)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::find_one_assoc"))
    }

    /// Attach an existing term to the field, looked up by the text as given
    /// and then by its normalized form. Never creates the term and never
    /// removes what is already attached.
    pub async fn add<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
        text: &str,
    ) -> TaxonomyResult<(Term, ModelTerm)> {
        const OP: &str = "FieldConfiguration::add";

        let candidates = self.lookup_texts(&[text]);
        if candidates.is_empty() {
            return Err(TaxonomyError::Validation("term text is required".to_string()));
        }

        let mut terms = store
            .find_terms_by_text(&candidates, &self.vocabulary_name)
            .await
            .map_err(TaxonomyError::wrap(OP))?;
        terms.sort_by_key(|term| term.id);

        // The text as given wins over its normalized form
        let term = candidates
            .iter()
            .find_map(|candidate| terms.iter().find(|term| &term.text == candidate))
            .cloned()
            .ok_or_else(|| {
                TaxonomyError::NotFound(format!(
                    "term '{}' in vocabulary '{}'",
                    text.trim(),
                    self.vocabulary_name
                ))
            })?;

        let association = store
            .create_model_terms(vec![self.association(model_id, term.id, 0)])
            .await
            .map_err(TaxonomyError::wrap(OP))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                TaxonomyError::persistence(OP, anyhow::anyhow!("association insert returned no row"))
            })?;

        debug!(
            "{}.{} #{}: attached '{}'",
            self.model_name, self.field_name, model_id, term.text
        );
        Ok((term, association))
    }

    /// Attach every text, creating missing terms first. Each association gets
    /// the position of its text in `texts` as `order`.
    pub async fn add_many<S, T>(
        &self,
        store: &S,
        model_id: Id,
        texts: &[T],
    ) -> TaxonomyResult<Vec<ModelTerm>>
    where
        S: TaxonomyStore + ?Sized,
        T: AsRef<str>,
    {
        let texts = self.normalize_texts(texts);
        self.add_texts(store, model_id, &texts)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::add_many"))
    }

    /// Make the field hold exactly `desired`
    pub async fn update<S, T>(&self, store: &S, model_id: Id, desired: &[T]) -> TaxonomyResult<()>
    where
        S: TaxonomyStore + ?Sized,
        T: AsRef<str>,
    {
        let desired = self.normalize_texts(desired);
        self.reconcile(store, model_id, &desired)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::update"))
    }

    /// Detach the given texts, matched as given and as normalized. Terms
    /// themselves are kept.
    pub async fn remove_many<S, T>(&self, store: &S, model_id: Id, texts: &[T]) -> TaxonomyResult<u64>
    where
        S: TaxonomyStore + ?Sized,
        T: AsRef<str>,
    {
        let texts = self.lookup_texts(texts);
        self.remove_texts(store, model_id, &texts)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::remove_many"))
    }

    /// Detach every term the model instance holds, on any field
    pub async fn clear<S: TaxonomyStore + ?Sized>(&self, store: &S, model_id: Id) -> TaxonomyResult<u64> {
        store
            .delete_model_terms_for(&self.model_name, model_id, None)
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::clear"))
    }

    /// Detach every term on this field only
    pub async fn clear_field<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
    ) -> TaxonomyResult<u64> {
        store
            .delete_model_terms_for(&self.model_name, model_id, Some(&self.field_name))
            .await
            .map_err(TaxonomyError::wrap("FieldConfiguration::clear_field"))
    }

    /// `update` inside one transaction; nothing is written unless every step succeeds
    pub async fn update_atomic<S, T>(&self, store: &S, model_id: Id, desired: &[T]) -> TaxonomyResult<()>
    where
        S: Store,
        T: AsRef<str>,
    {
        const OP: &str = "FieldConfiguration::update_atomic";

        let desired = self.normalize_texts(desired);
        let tx = store.begin().await.map_err(TaxonomyError::wrap(OP))?;
        self.reconcile(&tx, model_id, &desired)
            .await
            .map_err(TaxonomyError::wrap(OP))?;
        tx.commit().await.map_err(TaxonomyError::wrap(OP))
    }

    pub async fn add_many_atomic<S, T>(
        &self,
        store: &S,
        model_id: Id,
        texts: &[T],
    ) -> TaxonomyResult<Vec<ModelTerm>>
    where
        S: Store,
        T: AsRef<str>,
    {
        const OP: &str = "FieldConfiguration::add_many_atomic";

        let texts = self.normalize_texts(texts);
        let tx = store.begin().await.map_err(TaxonomyError::wrap(OP))?;
        let created = self
            .add_texts(&tx, model_id, &texts)
            .await
            .map_err(TaxonomyError::wrap(OP))?;
        tx.commit().await.map_err(TaxonomyError::wrap(OP))?;
        Ok(created)
    }

    pub async fn remove_many_atomic<S, T>(
        &self,
        store: &S,
        model_id: Id,
        texts: &[T],
    ) -> TaxonomyResult<u64>
    where
        S: Store,
        T: AsRef<str>,
    {
        const OP: &str = "FieldConfiguration::remove_many_atomic";

        let texts = self.lookup_texts(texts);
        let tx = store.begin().await.map_err(TaxonomyError::wrap(OP))?;
        let removed = self
            .remove_texts(&tx, model_id, &texts)
            .await
            .map_err(TaxonomyError::wrap(OP))?;
        tx.commit().await.map_err(TaxonomyError::wrap(OP))?;
        Ok(removed)
    }

    async fn field_terms<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
    ) -> anyhow::Result<Vec<Term>> {
        store
            .find_field_terms(
                &self.vocabulary_name,
                &self.model_name,
                &self.field_name,
                model_id,
            )
            .await
    }

    // `texts` are already normalized
    async fn add_texts<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
        texts: &[String],
    ) -> anyhow::Result<Vec<ModelTerm>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut terms = store
            .find_terms_by_text(texts, &self.vocabulary_name)
            .await?;

        let (_, missing): (Vec<&String>, Vec<&String>) = texts
            .iter()
            .partition(|text| terms.iter().any(|term| &term.text == *text));

        if !missing.is_empty() {
            debug!(
                "{}.{}: creating {} term(s) in '{}'",
                self.model_name,
                self.field_name,
                missing.len(),
                self.vocabulary_name
            );
            store
                .create_terms(
                    missing
                        .into_iter()
                        .map(|text| NewTermRow {
                            text: text.clone(),
                            vocabulary_name: self.vocabulary_name.clone(),
                        })
                        .collect(),
                )
                .await?;
            terms = store
                .find_terms_by_text(texts, &self.vocabulary_name)
                .await?;
        }

        // Oldest term wins when a text exists more than once in the vocabulary
        terms.sort_by_key(|term| term.id);
        let mut by_text: HashMap<&str, Id> = HashMap::new();
        for term in &terms {
            by_text.entry(term.text.as_str()).or_insert(term.id);
        }

        let rows: Vec<NewModelTerm> = texts
            .iter()
            .enumerate()
            .filter_map(|(position, text)| {
                by_text
                    .get(text.as_str())
                    .map(|term_id| self.association(model_id, *term_id, position))
            })
            .collect();

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        store.create_model_terms(rows).await
    }

    // `texts` are matched as stored, without normalizing
    async fn remove_texts<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
        texts: &[String],
    ) -> anyhow::Result<u64> {
        if texts.is_empty() {
            return Ok(0);
        }

        let term_ids: Vec<Id> = store
            .find_terms_by_text(texts, &self.vocabulary_name)
            .await?
            .into_iter()
            .map(|term| term.id)
            .collect();
        if term_ids.is_empty() {
            return Ok(0);
        }

        let ids = store
            .find_model_term_ids(&self.model_name, &self.field_name, model_id, &term_ids)
            .await?;
        if ids.is_empty() {
            return Ok(0);
        }

        store.delete_model_terms(&ids).await
    }

    async fn reconcile<S: TaxonomyStore + ?Sized>(
        &self,
        store: &S,
        model_id: Id,
        desired: &[String],
    ) -> anyhow::Result<()> {
        let current: Vec<String> = self
            .field_terms(store, model_id)
            .await?
            .into_iter()
            .map(|term| term.text)
            .unique()
            .collect();

        if current.is_empty() && desired.is_empty() {
            return Ok(());
        }

        match self.reorder {
            ReorderMode::KeepExisting => {
                let to_remove: Vec<String> = current
                    .iter()
                    .filter(|text| !desired.contains(text))
                    .cloned()
                    .collect();
                let to_add: Vec<String> = desired
                    .iter()
                    .filter(|text| !current.contains(text))
                    .cloned()
                    .collect();

                debug!(
                    "{}.{} #{}: remove {:?}, add {:?}",
                    self.model_name, self.field_name, model_id, to_remove, to_add
                );

                self.remove_texts(store, model_id, &to_remove).await?;
                self.add_texts(store, model_id, &to_add).await?;
            }
            ReorderMode::FullResync => {
                if current == desired {
                    return Ok(());
                }

                debug!(
                    "{}.{} #{}: resync to {:?}",
                    self.model_name, self.field_name, model_id, desired
                );

                store
                    .delete_model_terms_for(&self.model_name, model_id, Some(&self.field_name))
                    .await?;
                self.add_texts(store, model_id, desired).await?;
            }
        }

        Ok(())
    }
}
