//! Twin queries against the hub service API

use async_trait::async_trait;
use http::Method;
use openapi_client::{QuerySpecification, Twin};
use tracing::{debug, warn};

use crate::errors::ManagerError;
use crate::hub::client::HttpClient;
use crate::hub::DeviceTwinQuery;

/// Header carrying the continuation token of a paged query
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

/// Page size requested from the hub
pub const MAX_ITEM_COUNT: usize = 100;

#[async_trait]
impl DeviceTwinQuery for HttpClient {
    async fn query_twins(&self, query: &str) -> Result<Vec<Twin>, ManagerError> {
        let body = QuerySpecification {
            query: query.to_string(),
        };
        let mut twins = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let url = self.url(&["devices", "query"], &[])?;
            let mut request = self
                .request(Method::POST, url)
                .await?
                .header("x-ms-max-item-count", MAX_ITEM_COUNT.to_string())
                .json(&body);
            if let Some(token) = &continuation {
                request = request.header(CONTINUATION_HEADER, token);
            }

            let response = self.send(request, "twin query").await?;
            let next = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            if next.is_some() && next == continuation {
                warn!("Twin query returned the same continuation token twice");
                return Err(ManagerError::ExternalService(
                    "twin query did not advance past its continuation token".to_string(),
                ));
            }
            continuation = next;

            let page: Vec<Twin> = response.json().await?;
            debug!("Twin query page returned {} twins", page.len());
            twins.extend(page);

            if continuation.is_none() {
                break;
            }
        }

        Ok(twins)
    }
}
