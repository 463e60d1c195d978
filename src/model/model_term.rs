use crate::model::{default_timestamp, default_vocabulary_name, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Association row: instance `model_id` of `model_name` has `term_id` on `field`,
/// at position `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ModelTerm {
    pub id: Id,
    pub model_name: String,
    pub model_id: Id,
    pub field: String,
    #[serde(default = "default_vocabulary_name")]
    pub vocabulary_name: String,
    pub term_id: Option<Id>,
    #[sqlx(rename = "term_order")]
    pub order: i32,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Input row for association creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModelTerm {
    pub model_name: String,
    pub model_id: Id,
    pub field: String,
    pub vocabulary_name: String,
    pub term_id: Id,
    pub order: i32,
}

impl NewModelTerm {
    pub fn into_model_term(self, id: Id) -> ModelTerm {
        let now = Utc::now();
        ModelTerm {
            id,
            model_name: self.model_name,
            model_id: self.model_id,
            field: self.field,
            vocabulary_name: self.vocabulary_name,
            term_id: Some(self.term_id),
            order: self.order,
            created_at: now,
            updated_at: now,
        }
    }
}
