use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::InstanceGateway;
use super::error::GatewayError;
use super::types::{
    DescribeRequest, DescribeResponse, Filter, StatusRequest, StatusResponse, TransitionAck,
    TransitionBody,
};
use crate::instance::{Action, Instance, InstanceState};

/// [`InstanceGateway`] backed by a JSON/HTTP control-plane endpoint.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "control plane request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GatewayError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }
}

impl InstanceGateway for HttpGateway {
    async fn describe_matching(&self, filters: &[Filter]) -> Result<Vec<Instance>, GatewayError> {
        let req = DescribeRequest {
            filters: filters.to_vec(),
        };
        let resp: DescribeResponse = self.post("/instances/describe", &req).await?;
        Ok(resp.instances)
    }

    async fn request_transition(
        &self,
        ids: &[String],
        action: Action,
        dry_run: bool,
    ) -> Result<TransitionAck, GatewayError> {
        let (path, body) = match action {
            Action::Start => (
                "/instances/start",
                TransitionBody {
                    instance_ids: ids.to_vec(),
                    dry_run,
                    force: None,
                    hibernate: None,
                },
            ),
            Action::Stop => (
                "/instances/stop",
                TransitionBody {
                    instance_ids: ids.to_vec(),
                    dry_run,
                    force: Some(false),
                    hibernate: Some(false),
                },
            ),
        };
        self.post(path, &body).await
    }

    async fn describe_states(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, InstanceState>, GatewayError> {
        let req = StatusRequest {
            instance_ids: ids.to_vec(),
        };
        let resp: StatusResponse = self.post("/instances/status", &req).await?;
        Ok(resp
            .states
            .into_iter()
            .map(|s| (s.id, s.state))
            .collect())
    }
}
