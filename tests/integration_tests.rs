//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML config → HTTP listing → fetcher → view

use remote_list::http::{RestEntityLookup, RestListTransport};
use remote_list::{
    ClientConfig, Entity, EntityDecoder, EntityKey, Error, FetchOptions, JsonValue, ListFetcher,
    ListView, LoadingStatus, ParamsMergeDecoder, Record, RecordDecoder, SerdeDecoder,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Task {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    job_id: Option<String>,
}

impl Entity for Task {
    fn key(&self) -> EntityKey {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskParams {
    job_id: String,
}

impl TaskParams {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }
}

type TaskView = ListView<Task, TaskParams>;

fn client_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(server.uri());
    config.http.rate_limit = None;
    config.http.max_retries = 0;
    config
}

fn task_view(config: &ClientConfig, job_id: &str) -> TaskView {
    let client = Arc::new(config.build_client(None).unwrap());
    let transport =
        RestListTransport::<TaskParams>::new(client.clone(), "/jobs/{{ params.jobId }}/tasks");
    let decoder = ParamsMergeDecoder::new(SerdeDecoder::<Task>::new());
    let lookup_decoder: Arc<dyn EntityDecoder<(), JsonValue, Task>> =
        Arc::new(SerdeDecoder::<Task>::new());
    let lookup = RestEntityLookup::new(client, "/tasks/{{ key }}", lookup_decoder);

    let fetcher: ListFetcher<Task, TaskParams> =
        ListFetcher::new(Arc::new(transport), Arc::new(decoder), TaskParams::new(job_id));
    ListView::with_lookup(fetcher, Arc::new(lookup))
}

fn task(id: &str, state: &str) -> JsonValue {
    json!({ "id": id, "state": state })
}

fn keys(view: &TaskView) -> Vec<String> {
    view.items().iter().map(Entity::key).collect()
}

async fn mount_page(server: &MockServer, route: &str, body: JsonValue) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_view_pages_through_child_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-1/tasks"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "value": [task("t3", "running")] })),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({
            "value": [task("t1", "active"), task("t2", "completed")],
            "odata.nextLink": "/jobs/job-1/tasks?page=2"
        }),
    )
    .await;

    let view = task_view(&client_config(&server), "job-1");

    let page = view.fetch_next().await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(view.has_more());
    assert_eq!(keys(&view), vec!["t1", "t2"]);

    let page = view.fetch_next().await.unwrap();
    assert_eq!(page.len(), 1);
    assert!(!view.has_more());
    assert_eq!(view.status(), LoadingStatus::Ready);
    assert_eq!(keys(&view), vec!["t1", "t2", "t3"]);

    // Parent identifiers are merged back from the parameters
    let items = view.items();
    assert!(items.iter().all(|t| t.job_id.as_deref() == Some("job-1")));

    // Exhausted listings issue no further requests
    let page = view.fetch_next().await.unwrap();
    assert!(page.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_options_become_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-1/tasks"))
        .and(query_param("$filter", "state eq 'active'"))
        .and(query_param("$select", "id,state"))
        .and(query_param("$top", "50"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "value": [task("t1", "active")] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let view = task_view(&client_config(&server), "job-1");
    view.set_options(
        FetchOptions::new()
            .with_filter("state eq 'active'")
            .with_select(["id", "state"])
            .with_max_results(50),
    );

    view.fetch_next().await.unwrap();
    assert_eq!(keys(&view), vec!["t1"]);
}

#[tokio::test]
async fn test_refresh_reissues_first_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-1/tasks"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "value": [task("t1", "active")] })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let view = task_view(&client_config(&server), "job-1");
    view.fetch_next().await.unwrap();
    view.refresh().await.unwrap();

    assert_eq!(keys(&view), vec!["t1"]);
}

#[tokio::test]
async fn test_marker_pagination_from_yaml_config() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/containers"))
        .and(query_param("marker", "m2"))
        .and(query_param("maxresults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Containers": { "Items": [{ "Name": "c" }] },
            "NextMarker": ""
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/containers"))
        .and(query_param("maxresults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Containers": { "Items": [{ "Name": "a" }, { "Name": "b" }] },
            "NextMarker": "m2"
        })))
        .mount(&server)
        .await;

    let yaml = format!(
        r#"
base_url: "{}"
http:
  max_retries: 0
  rate_limit: null
listing:
  records_path: Containers.Items
  key_field: Name
  page_size: 2
  query_names:
    max_results: maxresults
  pagination:
    type: marker
    path: NextMarker
"#,
        server.uri()
    );
    let config = ClientConfig::from_yaml_str(&yaml).unwrap();

    let client = Arc::new(config.build_client(None).unwrap());
    let transport = RestListTransport::<()>::new(client, "/containers")
        .with_listing(config.listing.clone());
    let decoder = RecordDecoder::new(&config.listing.key_field);
    let fetcher: ListFetcher<Record, ()> =
        ListFetcher::new(Arc::new(transport), Arc::new(decoder), ());

    let items = fetcher.fetch_all().await.unwrap();
    let names: Vec<_> = items.iter().map(Entity::key).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(!fetcher.has_more());
}

// ============================================================================
// Fixed Keys
// ============================================================================

#[tokio::test]
async fn test_pinned_task_survives_job_switch() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({ "value": [task("t1", "active"), task("t2", "active")] }),
    )
    .await;
    mount_page(
        &server,
        "/jobs/job-2/tasks",
        json!({ "value": [task("t3", "active")] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task("t9", "completed")))
        .mount(&server)
        .await;

    let view = task_view(&client_config(&server), "job-1");
    view.set_fixed_keys(["t9"]).await;
    assert_eq!(keys(&view), vec!["t9"]);

    view.fetch_next().await.unwrap();
    assert_eq!(keys(&view), vec!["t9", "t1", "t2"]);

    view.set_params(TaskParams::new("job-2"));
    assert_eq!(keys(&view), vec!["t9"]);

    view.fetch_next().await.unwrap();
    assert_eq!(keys(&view), vec!["t9", "t3"]);
}

#[tokio::test]
async fn test_pinned_task_listed_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({ "value": [task("t1", "active"), task("t2", "running")] }),
    )
    .await;

    let view = task_view(&client_config(&server), "job-1");
    view.fetch_next().await.unwrap();
    view.set_fixed_keys(["t2"]).await;

    let items = view.items();
    assert_eq!(keys(&view), vec!["t2", "t1"]);
    assert_eq!(items[0].state, "running");
}

#[tokio::test]
async fn test_pinned_task_deleted_remotely() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({ "value": [task("t1", "active")] }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/tasks/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let view = task_view(&client_config(&server), "job-1");
    view.set_fixed_keys(["gone"]).await;
    view.fetch_next().await.unwrap();

    assert_eq!(keys(&view), vec!["t1"]);
    assert_eq!(view.fixed_keys(), vec!["gone"]);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_server_error_reported_then_recovered() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-1/tasks"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({ "value": [task("t1", "active")] }),
    )
    .await;

    let view = task_view(&client_config(&server), "job-1");
    let errors = view.subscribe_errors();

    let err = view.fetch_next().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(view.status(), LoadingStatus::Error);
    assert!(matches!(*errors.borrow(), Some(Error::Fetch { .. })));
    assert!(view.items().is_empty());

    view.fetch_next().await.unwrap();
    assert_eq!(keys(&view), vec!["t1"]);
    assert!(errors.borrow().is_none());
}

#[tokio::test]
async fn test_malformed_page_rejected_whole() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/jobs/job-1/tasks",
        json!({ "value": [task("t1", "active"), { "state": "active" }] }),
    )
    .await;

    let view = task_view(&client_config(&server), "job-1");
    let err = view.fetch_next().await.unwrap_err();

    assert!(matches!(err, Error::Deserialization { index: 1, .. }));
    assert!(view.items().is_empty());
    assert!(view.has_more());
}
