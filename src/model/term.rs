use crate::model::{
    default_timestamp, default_vocabulary_name, join_origin, non_blank, Id, DEFAULT_VOCABULARY,
};
use crate::TaxonomyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value inside a vocabulary, e.g. tag "Gaming" in vocabulary "Tags".
///
/// `(text, vocabulary_name)` is expected to be unique. Nothing in the schema
/// enforces it; the field engine looks terms up before creating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(default)]
    pub id: Id,
    pub text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_vocabulary_name")]
    pub vocabulary_name: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    #[serde(default)]
    pub link_permanent: String,
}

impl Term {
    pub fn new(text: String, description: String, vocabulary_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            text,
            description,
            vocabulary_name,
            created_at: now,
            updated_at: now,
            link_permanent: String::new(),
        }
    }

    /// Path of the human-facing term page, empty for unsaved terms
    pub fn path(&self) -> String {
        if self.id == 0 {
            return String::new();
        }
        let vocabulary = if self.vocabulary_name.is_empty() {
            DEFAULT_VOCABULARY
        } else {
            self.vocabulary_name.as_str()
        };
        format!("/vocabulary/{}/term/{}", vocabulary, self.id)
    }

    pub fn load_path(&mut self, origin: &str) {
        self.link_permanent = join_origin(origin, &self.path());
    }
}

/// Input row for bulk term creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTermRow {
    pub text: String,
    pub vocabulary_name: String,
}

/// Term input model for creation through the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTerm {
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vocabulary_name: Option<String>,
}

impl NewTerm {
    /// Build the term, taking the vocabulary from the request path when the body omits it
    pub fn into_term(self, path_vocabulary: Option<&str>) -> Result<Term, TaxonomyError> {
        let text = non_blank(&self.text)
            .ok_or_else(|| TaxonomyError::Validation("term text is required".to_string()))?
            .to_string();

        let vocabulary_name = self
            .vocabulary_name
            .as_deref()
            .and_then(non_blank)
            .or_else(|| path_vocabulary.and_then(non_blank))
            .unwrap_or(DEFAULT_VOCABULARY)
            .to_string();

        Ok(Term::new(
            text,
            self.description.unwrap_or_default(),
            vocabulary_name,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermUpdate {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vocabulary_name: Option<String>,
}

impl TermUpdate {
    pub fn apply(self, term: &mut Term) -> Result<(), TaxonomyError> {
        if let Some(text) = self.text {
            term.text = non_blank(&text)
                .ok_or_else(|| TaxonomyError::Validation("term text can not be empty".to_string()))?
                .to_string();
        }
        if let Some(description) = self.description {
            term.description = description;
        }
        if let Some(vocabulary_name) = self.vocabulary_name {
            term.vocabulary_name = non_blank(&vocabulary_name)
                .ok_or_else(|| {
                    TaxonomyError::Validation("term vocabularyName can not be empty".to_string())
                })?
                .to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_path_falls_back_to_tags() {
        let mut term = Term::new("rust".to_string(), String::new(), String::new());
        assert_eq!(term.path(), "");

        term.id = 12;
        assert_eq!(term.path(), "/vocabulary/Tags/term/12");

        term.vocabulary_name = "Category".to_string();
        term.load_path("http://localhost:3001/");
        assert_eq!(
            term.link_permanent,
            "http://localhost:3001/vocabulary/Category/term/12"
        );
    }

    #[test]
    fn test_new_term_vocabulary_resolution() {
        let body = NewTerm {
            text: "Gaming".to_string(),
            description: None,
            vocabulary_name: None,
        };
        let term = body.clone().into_term(Some("Category")).unwrap();
        assert_eq!(term.vocabulary_name, "Category");

        let term = body.clone().into_term(None).unwrap();
        assert_eq!(term.vocabulary_name, DEFAULT_VOCABULARY);

        let explicit = NewTerm {
            vocabulary_name: Some("Genre".to_string()),
            ..body
        };
        let term = explicit.into_term(Some("Category")).unwrap();
        assert_eq!(term.vocabulary_name, "Genre");
    }

    #[test]
    fn test_term_update_rejects_blank_text() {
        let mut term = Term::new("rust".to_string(), String::new(), "Tags".to_string());
        let update = TermUpdate {
            text: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.apply(&mut term).is_err());
        assert_eq!(term.text, "rust");

        let update = TermUpdate {
            description: Some("A systems language".to_string()),
            ..Default::default()
        };
        update.apply(&mut term).unwrap();
        assert_eq!(term.description, "A systems language");
    }

    #[test]
    fn test_term_deserialize_defaults_vocabulary() {
        let term: Term = serde_json::from_str(r#"{"text": "gaming"}"#).unwrap();
        assert_eq!(term.vocabulary_name, "Tags");
        assert_eq!(term.id, 0);
    }
}
