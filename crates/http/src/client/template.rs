//! Template CRUD endpoint methods

use reqwest::Method;

use super::{AuthenticatedClient, ClientError};
use crate::types::{MessageResponse, Template, TemplateDraft};

impl AuthenticatedClient {
    /// Save a new template; the response carries the stored template
    /// with its assigned id
    pub async fn add_template(&self, draft: &TemplateDraft) -> Result<Template, ClientError> {
        let draft = draft.clone();
        self.execute(Method::POST, "/api/template/addtemplate", move |req| {
            req.json(&draft)
        })
        .await
    }

    /// Replace an existing template's name, subject, and body
    pub async fn update_template(
        &self,
        template_id: &str,
        draft: &TemplateDraft,
    ) -> Result<MessageResponse, ClientError> {
        let path = format!("/api/template/updatetemplate/{template_id}");
        let draft = draft.clone();
        self.execute(Method::PUT, &path, move |req| req.json(&draft))
            .await
    }

    /// Delete a template
    pub async fn delete_template(&self, template_id: &str) -> Result<MessageResponse, ClientError> {
        let path = format!("/api/template/deletetemplate/{template_id}");
        self.execute(Method::DELETE, &path, |req| req).await
    }
}
