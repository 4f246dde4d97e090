//! Mass-mail dispatch and log endpoint methods

use reqwest::Method;

use super::{AuthenticatedClient, ClientError};
use crate::types::{LogQuery, MailLogsPage, SendMassRequest, SendMassResponse};

impl AuthenticatedClient {
    /// Dispatch the mail to every row of the chosen CSV, substituting
    /// `{{field}}` placeholders server-side
    pub async fn send_mass(
        &self,
        request: &SendMassRequest,
    ) -> Result<SendMassResponse, ClientError> {
        let request = request.clone();
        self.execute(Method::POST, "/api/email/send-mass", move |req| {
            req.json(&request)
        })
        .await
    }

    /// Fetch one page of the dispatch log
    pub async fn logs(&self, query: &LogQuery) -> Result<MailLogsPage, ClientError> {
        let query = query.clone();
        self.execute(Method::GET, "/api/mail/logs", move |req| req.query(&query))
            .await
    }
}
