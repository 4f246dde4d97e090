//! CSV upload endpoint methods

use reqwest::multipart::{Form, Part};
use reqwest::Method;

use super::{AuthenticatedClient, ClientError};
use crate::types::{CsvFileRef, MessageResponse};

impl AuthenticatedClient {
    /// Upload a recipient CSV as the multipart field `csv`.
    ///
    /// The form is rebuilt from the owned bytes on every attempt, so a
    /// replay after refresh resends the full body.
    pub async fn upload_csv(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<CsvFileRef, ClientError> {
        let file_name = file_name.to_string();
        self.execute(Method::POST, "/api/upload/csv", move |req| {
            let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
            req.multipart(Form::new().part("csv", part))
        })
        .await
    }

    /// Delete an uploaded CSV file
    pub async fn delete_csv(&self, file_id: &str) -> Result<MessageResponse, ClientError> {
        let path = format!("/api/upload/deletecsv/{file_id}");
        self.execute(Method::DELETE, &path, |req| req).await
    }
}
