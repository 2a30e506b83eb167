//! Streams REST API client.
//!
//! Implements [`StreamsInstance`] over the instance resources rooted at
//! `<endpoint>/streams/rest/instances/<instance id>`. Reads go through the
//! configured [`RetryPolicy`]; writes (submit, cancel, appconfig changes)
//! are sent once.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::errors::StreamsApiError;
use super::retry::RetryPolicy;
use super::types::{
    AppConfigsResponse, BundleResponse, JobsResponse, MetricsResponse, OperatorsResponse,
    SubmitJobRequest,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AppConfigUpdate, ApplicationConfiguration, Config, Job, JobConfig, JobFilter, Metric,
    MetricSnapshot, CONDITION_METRIC_PREFIX,
};
use crate::domain::ports::StreamsInstance;

/// How requests are authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

/// Configuration for the Streams REST client
#[derive(Debug, Clone)]
pub struct StreamsClientConfig {
    pub endpoint: String,
    pub instance_id: String,
    pub auth: Auth,
    pub verify_ssl: bool,
    pub timeout_secs: u64,
    pub retry_policy: RetryPolicy,
}

impl StreamsClientConfig {
    /// Build the client configuration from the loaded [`Config`].
    ///
    /// `username_override` is the `--User` command line option.
    pub fn from_config(config: &Config, username_override: Option<&str>) -> DomainResult<Self> {
        let instance = &config.instance;
        if instance.endpoint.is_empty() {
            return Err(DomainError::ValidationFailed(
                "instance endpoint is not set (CP4D_URL or instance.endpoint)".to_string(),
            ));
        }
        if instance.id.is_empty() {
            return Err(DomainError::ValidationFailed(
                "instance id is not set (STREAMS_INSTANCE_ID or instance.id)".to_string(),
            ));
        }

        let username = username_override
            .map(str::to_string)
            .or_else(|| instance.username.clone());
        let auth = match (&instance.token, username, &instance.password) {
            (Some(token), _, _) if !token.is_empty() => Auth::Bearer(token.clone()),
            (_, Some(username), Some(password)) => Auth::Basic {
                username,
                password: password.clone(),
            },
            _ => Auth::None,
        };

        Ok(Self {
            endpoint: instance.endpoint.clone(),
            instance_id: instance.id.clone(),
            auth,
            verify_ssl: instance.verify_ssl,
            timeout_secs: instance.timeout_secs,
            retry_policy: RetryPolicy::from(&config.retry),
        })
    }
}

/// HTTP client for one Streams instance.
#[derive(Debug, Clone)]
pub struct StreamsRestClient {
    http: Client,
    instance_url: Url,
    instance_id: String,
    auth: Auth,
    retry_policy: RetryPolicy,
}

impl StreamsRestClient {
    pub fn with_config(config: StreamsClientConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(StreamsApiError::from)?;

        let mut instance_url = Url::parse(&config.endpoint).map_err(|e| {
            DomainError::ValidationFailed(format!("invalid endpoint {}: {e}", config.endpoint))
        })?;
        instance_url
            .path_segments_mut()
            .map_err(|()| {
                DomainError::ValidationFailed(format!("endpoint {} cannot be a base URL", config.endpoint))
            })?
            .pop_if_empty()
            .extend(["streams", "rest", "instances", config.instance_id.as_str()]);

        Ok(Self {
            http,
            instance_url,
            instance_id: config.instance_id,
            auth: config.auth,
            retry_policy: config.retry_policy,
        })
    }

    /// URL of a resource below the instance.
    fn resource_url(&self, segments: &[&str]) -> Url {
        let mut url = self.instance_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    async fn check(response: Response) -> Result<Response, StreamsApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StreamsApiError::from_status(status, body))
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, StreamsApiError> {
        let response = self.request(Method::GET, url).send().await?;
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET a JSON resource, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StreamsApiError> {
        debug!(%url, "GET");
        self.retry_policy
            .execute(|| self.get_json_once(url.clone()))
            .await
    }

    fn operators_url(&self, job: &Job) -> Result<Url, StreamsApiError> {
        match &job.operators {
            Some(url) => Url::parse(url)
                .map_err(|e| StreamsApiError::UnexpectedResponse(format!("operators url {url}: {e}"))),
            None => Ok(self.resource_url(&["jobs", job.id.as_str(), "operators"])),
        }
    }

    fn app_config_not_found(&self, name: &str) -> DomainError {
        DomainError::AppConfigNotFound {
            name: name.to_string(),
            instance: self.instance_id.clone(),
        }
    }
}

#[async_trait]
impl StreamsInstance for StreamsRestClient {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    #[instrument(skip(self), fields(instance = %self.instance_id))]
    async fn get_jobs(&self, filter: &JobFilter) -> DomainResult<Vec<Job>> {
        if let Some(id) = &filter.id {
            return match self.get_json::<Job>(self.resource_url(&["jobs", id.as_str()])).await {
                Ok(job) if filter.matches(&job) => Ok(vec![job]),
                Ok(_) | Err(StreamsApiError::NotFound(_)) => Ok(Vec::new()),
                Err(err) => Err(err.into()),
            };
        }

        let response: JobsResponse = self.get_json(self.resource_url(&["jobs"])).await?;
        Ok(response
            .jobs
            .into_iter()
            .filter(|job| filter.matches(job))
            .collect())
    }

    #[instrument(skip(self, job_config), fields(instance = %self.instance_id))]
    async fn submit_job(&self, bundle: &Path, job_config: &JobConfig) -> DomainResult<Job> {
        let bytes = tokio::fs::read(bundle).await?;

        let response = self
            .request(Method::POST, self.resource_url(&["applicationbundles"]))
            .header(reqwest::header::CONTENT_TYPE, "application/x-jar")
            .body(bytes)
            .send()
            .await
            .map_err(StreamsApiError::from)?;
        let uploaded: BundleResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(StreamsApiError::from)?;
        debug!(bundle_id = %uploaded.id, "Uploaded application bundle");

        let request = SubmitJobRequest {
            application: &uploaded.id,
            job_configuration_overlay: job_config.as_overlay(),
        };
        let response = self
            .request(Method::POST, self.resource_url(&["jobs"]))
            .json(&request)
            .send()
            .await
            .map_err(StreamsApiError::from)?;
        let job: Job = Self::check(response)
            .await
            .map_err(|e| DomainError::SubmissionFailed(e.to_string()))?
            .json()
            .await
            .map_err(StreamsApiError::from)?;

        info!(job_id = %job.id, "Submitted job");
        Ok(job)
    }

    #[instrument(skip(self), fields(instance = %self.instance_id))]
    async fn cancel_job(&self, job_id: &str, force: bool) -> DomainResult<bool> {
        let mut url = self.resource_url(&["jobs", job_id]);
        url.query_pairs_mut()
            .append_pair("force", if force { "true" } else { "false" });

        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(StreamsApiError::from)?;

        match Self::check(response).await {
            Ok(_) => Ok(true),
            Err(StreamsApiError::NotFound(_)) => Err(DomainError::JobNotFound(job_id.to_string())),
            Err(StreamsApiError::Conflict(body)) => {
                debug!(%body, "Cancel rejected");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_job_metrics(&self, job_id: &str) -> DomainResult<MetricSnapshot> {
        let job = self.find_job(job_id).await?;
        let operators_url = self.operators_url(&job)?;
        let operators: OperatorsResponse = self.get_json(operators_url.clone()).await?;

        let mut snapshot = MetricSnapshot::new();
        for operator in operators.operators {
            let metrics_url = match &operator.metrics {
                Some(url) => Url::parse(url).map_err(|e| {
                    StreamsApiError::UnexpectedResponse(format!("metrics url {url}: {e}"))
                })?,
                None => {
                    let mut url = operators_url.clone();
                    if let Ok(mut path) = url.path_segments_mut() {
                        path.extend([operator.name.as_str(), "metrics"]);
                    }
                    url
                }
            };
            let metrics: MetricsResponse = self.get_json(metrics_url).await?;
            for metric in metrics.metrics {
                if !metric.name.starts_with(CONDITION_METRIC_PREFIX) {
                    continue;
                }
                if let Some(value) = metric.value {
                    snapshot.insert(Metric {
                        name: metric.name,
                        value,
                    });
                }
            }
        }

        debug!(job_id, metrics = snapshot.len(), "Fetched condition metrics");
        Ok(snapshot)
    }

    async fn retrieve_log_trace(&self, job_id: &str, dir: &Path) -> DomainResult<Option<PathBuf>> {
        let response = self
            .request(Method::GET, self.resource_url(&["jobs", job_id, "logtrace"]))
            .send()
            .await
            .map_err(StreamsApiError::from)?;

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED
        ) {
            return Ok(None);
        }
        let response = Self::check(response).await?;

        let path = dir.join(format!("job_{job_id}_logtrace.tgz"));
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(StreamsApiError::from)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(Some(path))
    }

    async fn get_app_configs(
        &self,
        name: Option<&str>,
    ) -> DomainResult<Vec<ApplicationConfiguration>> {
        let response: AppConfigsResponse = self
            .get_json(self.resource_url(&["applicationconfigurations"]))
            .await?;
        Ok(response
            .application_configurations
            .into_iter()
            .filter(|config| name.is_none_or(|n| config.name == n))
            .collect())
    }

    async fn create_app_config(
        &self,
        update: &AppConfigUpdate,
    ) -> DomainResult<ApplicationConfiguration> {
        let response = self
            .request(Method::POST, self.resource_url(&["applicationconfigurations"]))
            .json(update)
            .send()
            .await
            .map_err(StreamsApiError::from)?;

        match Self::check(response).await {
            Ok(response) => Ok(response.json().await.map_err(StreamsApiError::from)?),
            Err(StreamsApiError::Conflict(_)) => Err(DomainError::AppConfigExists {
                name: update.name.clone().unwrap_or_default(),
                instance: self.instance_id.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_app_config(
        &self,
        name: &str,
        update: &AppConfigUpdate,
    ) -> DomainResult<ApplicationConfiguration> {
        let response = self
            .request(
                Method::PATCH,
                self.resource_url(&["applicationconfigurations", name]),
            )
            .json(update)
            .send()
            .await
            .map_err(StreamsApiError::from)?;

        match Self::check(response).await {
            Ok(response) => Ok(response.json().await.map_err(StreamsApiError::from)?),
            Err(StreamsApiError::NotFound(_)) => Err(self.app_config_not_found(name)),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_app_config(&self, name: &str) -> DomainResult<()> {
        let response = self
            .request(
                Method::DELETE,
                self.resource_url(&["applicationconfigurations", name]),
            )
            .send()
            .await
            .map_err(StreamsApiError::from)?;

        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(StreamsApiError::NotFound(_)) => Err(self.app_config_not_found(name)),
            Err(err) => Err(err.into()),
        }
    }
}
