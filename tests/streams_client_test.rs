use mockito::{Matcher, Server};
use serde_json::json;

use streamtool::domain::models::{AppConfigUpdate, ConditionMetricKind, JobConfig, JobFilter};
use streamtool::infrastructure::streams::{
    Auth, RetryPolicy, StreamsClientConfig, StreamsRestClient,
};
use streamtool::cli::{CliContext, UserArg};
use streamtool::{Config, DomainError, StreamsInstance};

const BASE: &str = "/streams/rest/instances/sample";

fn client(server: &Server, auth: Auth, retry_policy: RetryPolicy) -> StreamsRestClient {
    StreamsRestClient::with_config(StreamsClientConfig {
        endpoint: server.url(),
        instance_id: "sample".to_string(),
        auth,
        verify_ssl: true,
        timeout_secs: 5,
        retry_policy,
    })
    .unwrap()
}

fn job_json(server: &Server, id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "status": "running",
        "health": "healthy",
        "startedBy": "admin",
        "submitTime": 1_600_000_000_000_i64,
        "jobGroup": "/streams/jobgroups/default",
        "productVersion": "5.5.0",
        "operators": format!("{}{BASE}/jobs/{id}/operators", server.url()),
    })
}

#[tokio::test]
async fn test_list_jobs_with_basic_auth() {
    let mut server = Server::new_async().await;
    let body = json!({ "jobs": [job_json(&server, "1", "alpha"), job_json(&server, "2", "beta")] });
    let mock = server
        .mock("GET", format!("{BASE}/jobs").as_str())
        .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = client(
        &server,
        Auth::Basic {
            username: "admin".to_string(),
            password: "secret".to_string(),
        },
        RetryPolicy::none(),
    );
    let jobs = client.get_jobs(&JobFilter::by_name("beta")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "2");
    assert_eq!(jobs[0].job_group_short(), "default");
}

#[tokio::test]
async fn test_find_missing_job() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("{BASE}/jobs/42").as_str())
        .with_status(404)
        .with_body("no such job")
        .create_async()
        .await;

    let client = client(&server, Auth::None, RetryPolicy::none());
    let err = client.find_job("42").await.unwrap_err();

    assert!(matches!(err, DomainError::JobNotFound(ref id) if id == "42"));
}

#[tokio::test]
async fn test_cancel_job_passes_force() {
    let mut server = Server::new_async().await;
    let accepted = server
        .mock("DELETE", format!("{BASE}/jobs/7").as_str())
        .match_query(Matcher::UrlEncoded("force".into(), "true".into()))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .create_async()
        .await;
    let rejected = server
        .mock("DELETE", format!("{BASE}/jobs/8").as_str())
        .match_query(Matcher::UrlEncoded("force".into(), "false".into()))
        .with_status(409)
        .with_body("job is busy")
        .create_async()
        .await;

    let client = client(&server, Auth::Bearer("tok".to_string()), RetryPolicy::none());

    assert!(client.cancel_job("7", true).await.unwrap());
    accepted.assert_async().await;

    assert!(!client.cancel_job("8", false).await.unwrap());
    rejected.assert_async().await;
}

#[tokio::test]
async fn test_job_metrics_keep_condition_metrics_only() {
    let mut server = Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", format!("{BASE}/jobs/3").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(job_json(&server, "3", "app").to_string())
        .create_async()
        .await;
    server
        .mock("GET", format!("{BASE}/jobs/3/operators").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "operators": [
                    { "name": "Src", "metrics": format!("{url}/ops/src/metrics") },
                    { "name": "Check", "metrics": format!("{url}/ops/check/metrics") }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/ops/src/metrics")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "metrics": [{ "name": "nTuplesSubmitted", "value": 99 }] }).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/ops/check/metrics")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "metrics": [
                    { "name": "streamsx.condition:valid:c1", "value": 1 },
                    { "name": "streamsx.condition:seq:c1", "value": 5 },
                    { "name": "streamsx.condition:fail:c1", "value": 0 },
                    { "name": "streamsx.condition:seq:c2" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client(&server, Auth::None, RetryPolicy::none());
    let snapshot = client.get_job_metrics("3").await.unwrap();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.condition_value(ConditionMetricKind::Seq, "c1"), Some(5));
    assert_eq!(snapshot.condition_value(ConditionMetricKind::Seq, "c2"), None);
    assert!(snapshot.get("nTuplesSubmitted").is_none());
}

#[tokio::test]
async fn test_server_errors_are_retried_then_transient() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("{BASE}/jobs").as_str())
        .with_status(503)
        .with_body("unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = client(&server, Auth::None, RetryPolicy::new(2, 1, 1));
    let err = client.get_jobs(&JobFilter::default()).await.unwrap_err();

    mock.assert_async().await;
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_without_retry_sends_one_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("{BASE}/jobs").as_str())
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let mut config = Config::default();
    config.instance.endpoint = server.url();
    config.instance.id = "sample".to_string();
    config.retry.max_retries = 3;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 1;
    let ctx = CliContext {
        config,
        json: false,
    };

    let client = ctx.connect_without_retry(&UserArg::default()).unwrap();
    let err = client.get_jobs(&JobFilter::default()).await.unwrap_err();

    mock.assert_async().await;
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_submit_uploads_bundle_then_creates_job() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", format!("{BASE}/applicationbundles").as_str())
        .match_header("content-type", "application/x-jar")
        .match_body("sab-bytes")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "bundle-1" }).to_string())
        .create_async()
        .await;
    let submit = server
        .mock("POST", format!("{BASE}/jobs").as_str())
        .match_body(Matcher::PartialJson(json!({
            "application": "bundle-1",
            "jobConfigurationOverlay": {
                "jobConfigOverlays": [{ "jobConfig": { "jobName": "nightly" } }]
            }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(job_json(&server, "11", "nightly").to_string())
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("app.sab");
    std::fs::write(&bundle, "sab-bytes").unwrap();
    let config = JobConfig {
        job_name: Some("nightly".to_string()),
        ..Default::default()
    };

    let client = client(&server, Auth::None, RetryPolicy::none());
    let job = client.submit_job(&bundle, &config).await.unwrap();

    upload.assert_async().await;
    submit.assert_async().await;
    assert_eq!(job.id, "11");
}

#[tokio::test]
async fn test_log_trace_download() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("{BASE}/jobs/5/logtrace").as_str())
        .with_status(200)
        .with_body(b"archive".as_slice())
        .create_async()
        .await;
    server
        .mock("GET", format!("{BASE}/jobs/6/logtrace").as_str())
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client(&server, Auth::None, RetryPolicy::none());

    let path = client.retrieve_log_trace("5", dir.path()).await.unwrap().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"archive");
    assert!(client.retrieve_log_trace("6", dir.path()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_app_config_errors_map_to_domain() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", format!("{BASE}/applicationconfigurations").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "applicationConfigurations": [
                    { "name": "kafka", "owner": "admin", "properties": { "brokers": "b:9092" } },
                    { "name": "db", "owner": "admin" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", format!("{BASE}/applicationconfigurations").as_str())
        .with_status(409)
        .create_async()
        .await;
    server
        .mock("DELETE", format!("{BASE}/applicationconfigurations/gone").as_str())
        .with_status(404)
        .create_async()
        .await;

    let client = client(&server, Auth::None, RetryPolicy::none());

    let kafka = client.get_app_configs(Some("kafka")).await.unwrap();
    assert_eq!(kafka.len(), 1);
    assert_eq!(kafka[0].properties["brokers"], "b:9092");

    let exists = client
        .create_app_config(&AppConfigUpdate {
            name: Some("kafka".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(
        exists.to_string(),
        "The kafka application configuration already exists in the following sample instance"
    );

    let missing = client.delete_app_config("gone").await.unwrap_err();
    assert!(matches!(missing, DomainError::AppConfigNotFound { .. }));
}
