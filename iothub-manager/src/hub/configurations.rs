//! Configuration endpoints of the hub service API

use async_trait::async_trait;
use http::{header, Method};
use openapi_client::Configuration;

use crate::errors::ManagerError;
use crate::hub::client::HttpClient;
use crate::hub::ConfigurationRegistry;

const CONFIGURATIONS: &str = "configurations";

#[async_trait]
impl ConfigurationRegistry for HttpClient {
    async fn add_configuration(
        &self,
        configuration: Configuration,
    ) -> Result<Configuration, ManagerError> {
        let url = self.url(&[CONFIGURATIONS, &configuration.id], &[])?;
        let request = self.request(Method::PUT, url).await?.json(&configuration);
        let response = self
            .send(request, &format!("configuration {}", configuration.id))
            .await?;
        Ok(response.json().await?)
    }

    async fn get_configurations(&self, max_count: usize) -> Result<Vec<Configuration>, ManagerError> {
        let url = self.url(&[CONFIGURATIONS], &[("top", max_count.to_string())])?;
        let request = self.request(Method::GET, url).await?;
        let response = self.send(request, "configurations").await?;

        let mut configurations: Vec<Configuration> = response.json().await?;
        configurations.truncate(max_count);
        Ok(configurations)
    }

    async fn get_configuration(&self, id: &str) -> Result<Option<Configuration>, ManagerError> {
        let url = self.url(&[CONFIGURATIONS, id], &[])?;
        let request = self.request(Method::GET, url).await?;
        match self.send(request, &format!("configuration {}", id)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(ManagerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn remove_configuration(&self, id: &str) -> Result<(), ManagerError> {
        let url = self.url(&[CONFIGURATIONS, id], &[])?;
        let request = self
            .request(Method::DELETE, url)
            .await?
            .header(header::IF_MATCH, "*");
        self.send(request, &format!("configuration {}", id)).await?;
        Ok(())
    }
}
