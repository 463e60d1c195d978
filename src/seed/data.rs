use crate::logic::{CATEGORY_VOCABULARY, TAG_VOCABULARY};
use crate::model::{Term, Vocabulary};
use crate::store::traits::TaxonomyStore;
use anyhow::Result;
use log::info;

/// Vocabularies every installation starts with
const VOCABULARIES: &[(&str, &str)] = &[
    (TAG_VOCABULARY, "Free form tags, created while editing"),
    (CATEGORY_VOCABULARY, "Curated categories"),
];

const CATEGORIES: &[&str] = &["News", "Tutorials", "Announcements"];

/// Create the default vocabularies and categories. Existing records are kept,
/// so running it twice is harmless.
pub async fn load_seed_data<S: TaxonomyStore + ?Sized>(store: &S) -> Result<()> {
    for (name, description) in VOCABULARIES {
        if store.find_vocabulary_by_name(name).await?.is_some() {
            continue;
        }
        let vocabulary = store
            .save_vocabulary(Vocabulary::new(
                name.to_string(),
                description.to_string(),
                None,
            ))
            .await?;
        info!("Seeded vocabulary {} '{}'", vocabulary.id, vocabulary.name);
    }

    for text in CATEGORIES {
        if store
            .find_term_by_text(text, CATEGORY_VOCABULARY)
            .await?
            .is_some()
        {
            continue;
        }
        store
            .save_term(Term::new(
                text.to_string(),
                String::new(),
                CATEGORY_VOCABULARY.to_string(),
            ))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListQuery;
    use crate::store::MemoryStore;
    use crate::store::{TermStore, VocabularyStore};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();
        load_seed_data(&store).await.unwrap();

        let vocabularies = store
            .query_vocabularies(&ListQuery::default())
            .await
            .unwrap();
        assert_eq!(vocabularies.count, 2);
        assert!(store.find_vocabulary_by_name("Tags").await.unwrap().is_some());

        let categories = store
            .query_terms(&ListQuery {
                vocabulary: Some("Category".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(categories.count, 3);
    }
}
