use crate::model::ModelTerm;

/// Renders one record tagged with a term as an HTML fragment for the term page.
///
/// The taxonomy only knows the association row; the host resolves
/// `model_name`/`model_id` to its own record.
#[async_trait::async_trait]
pub trait TeaserRenderer: Send + Sync {
    async fn render(&self, association: &ModelTerm) -> anyhow::Result<String>;
}

/// Renderer used when the host registers none
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTeasers;

#[async_trait::async_trait]
impl TeaserRenderer for NoTeasers {
    async fn render(&self, _association: &ModelTerm) -> anyhow::Result<String> {
        Ok(String::new())
    }
}
