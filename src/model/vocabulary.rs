use crate::model::{default_timestamp, join_origin, non_blank, Id};
use crate::TaxonomyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named namespace grouping related terms (e.g. "Tags", "Category")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    /// Zero until the record has been stored
    #[serde(default)]
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<Id>,

    /// Absolute link to the vocabulary page, computed on the way out
    #[sqlx(skip)]
    #[serde(default)]
    pub link_permanent: String,
}

impl Vocabulary {
    pub fn new(name: String, description: String, creator_id: Option<Id>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name,
            description,
            created_at: now,
            updated_at: now,
            creator_id,
            link_permanent: String::new(),
        }
    }

    pub fn path(&self) -> String {
        if self.id == 0 {
            return String::new();
        }
        format!("/vocabulary/{}", self.id)
    }

    pub fn load_path(&mut self, origin: &str) {
        self.link_permanent = join_origin(origin, &self.path());
    }
}

/// Vocabulary input model for creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVocabulary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creator_id: Option<Id>,
}

impl NewVocabulary {
    pub fn into_vocabulary(self) -> Result<Vocabulary, TaxonomyError> {
        let name = non_blank(&self.name)
            .ok_or_else(|| TaxonomyError::Validation("vocabulary name is required".to_string()))?
            .to_string();

        Ok(Vocabulary::new(
            name,
            self.description.unwrap_or_default(),
            self.creator_id,
        ))
    }
}

/// Partial update applied on top of a stored vocabulary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VocabularyUpdate {
    pub fn apply(self, vocabulary: &mut Vocabulary) -> Result<(), TaxonomyError> {
        if let Some(name) = self.name {
            vocabulary.name = non_blank(&name)
                .ok_or_else(|| {
                    TaxonomyError::Validation("vocabulary name can not be empty".to_string())
                })?
                .to_string();
        }
        if let Some(description) = self.description {
            vocabulary.description = description;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vocabulary_requires_name() {
        let input = NewVocabulary {
            name: "   ".to_string(),
            description: None,
            creator_id: None,
        };
        assert!(matches!(
            input.into_vocabulary(),
            Err(TaxonomyError::Validation(_))
        ));

        let input = NewVocabulary {
            name: " Tags ".to_string(),
            description: Some("Free tagging".to_string()),
            creator_id: Some(7),
        };
        let vocabulary = input.into_vocabulary().unwrap();
        assert_eq!(vocabulary.id, 0);
        assert_eq!(vocabulary.name, "Tags");
        assert_eq!(vocabulary.description, "Free tagging");
        assert_eq!(vocabulary.creator_id, Some(7));
    }

    #[test]
    fn test_vocabulary_link() {
        let mut vocabulary = Vocabulary::new("Category".to_string(), String::new(), None);
        vocabulary.load_path("https://cms.example.com");
        assert_eq!(vocabulary.link_permanent, "");

        vocabulary.id = 3;
        vocabulary.load_path("https://cms.example.com");
        assert_eq!(vocabulary.link_permanent, "https://cms.example.com/vocabulary/3");
    }

    #[test]
    fn test_vocabulary_json_is_camel_case() {
        let vocabulary = Vocabulary::new("Tags".to_string(), String::new(), None);
        let json = serde_json::to_value(&vocabulary).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("linkPermanent").is_some());
        assert!(json.get("creatorId").is_none());
    }
}
