//! Resource and data source lifecycles against a mocked Instana backend

use instana::api::models::ApplicationConfig;
use instana::api::Client;
use instana::data_sources::{CustomEventSpecDataSource, LookupDataSource};
use instana::resourcehandle::HandleResource;
use instana::resources::{
    AlertingChannelResource, ApiTokenResource, ApplicationConfigResource,
    AutomationActionResource, LogAlertConfigResource, SloCorrectionConfigResource,
};
use instana::tagfilter;
use mockito::{Matcher, Server};
use tfplug::data_source::ReadDataSourceRequest;
use tfplug::resource::{CreateResourceRequest, ReadResourceRequest, UpdateResourceRequest};
use tfplug::{Context, DataSource, Resource, Value};

fn client(server: &Server) -> Client {
    Client::new(&server.url(), "test-token", false).unwrap()
}

fn echo(request: &mockito::Request) -> Vec<u8> {
    request.body().unwrap().clone()
}

#[tokio::test]
async fn email_channel_is_created_with_only_its_block() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock(
            "PUT",
            Matcher::Regex(r"^/api/events/settings/alertingChannels/[0-9a-f]{32}$".to_string()),
        )
        .match_header("authorization", "apiToken test-token")
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"c1","kind":"EMAIL","name":"ops","emails":["a@x","b@x"]}"#)
        .create_async()
        .await;

    let resource = HandleResource::with_client(AlertingChannelResource, client(&server));
    let resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "instana_alerting_channel".to_string(),
                planned_state: Value::object([
                    ("id", Value::Unknown),
                    ("name", Value::from("ops")),
                    (
                        "email",
                        Value::List(vec![Value::object([(
                            "emails",
                            Value::string_set(["a@x", "b@x"]),
                        )])]),
                    ),
                ]),
                config: Value::Null,
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    assert_eq!(resp.new_state.get_string("id").as_deref(), Some("c1"));
    let mut emails = resp
        .new_state
        .get_block("email")
        .map(|block| block.get_string_list("emails"))
        .unwrap_or_default();
    emails.sort();
    assert_eq!(emails, vec!["a@x", "b@x"]);
    for other in ["slack", "webhook", "ops_genie", "pager_duty", "splunk"] {
        assert!(resp.new_state.get(other).is_null(), "{} should be empty", other);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn tag_filter_keeps_its_configured_spelling_across_reads() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/api/application-monitoring/settings/application")
        .match_body(Matcher::Regex(r#""stringValue":"/home""#.to_string()))
        .with_body_from_request(echo)
        .create_async()
        .await;

    let resource = HandleResource::with_client(ApplicationConfigResource, client(&server));
    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "instana_application_config".to_string(),
                planned_state: Value::object([
                    ("id", Value::Unknown),
                    ("label", Value::from("shop")),
                    ("tag_filter", Value::from(r#"request.path@dest eQuAlS "/home""#)),
                ]),
                config: Value::Null,
            },
        )
        .await;

    assert!(!created.diagnostics.has_errors(), "{:?}", created.diagnostics);
    assert_eq!(
        created.new_state.get_string("tag_filter").as_deref(),
        Some(r#"request.path@dest eQuAlS "/home""#)
    );
    create.assert_async().await;

    let id = created.new_state.get_string("id").unwrap();
    let stored = ApplicationConfig {
        id: id.clone(),
        label: "shop".to_string(),
        scope: "INCLUDE_NO_DOWNSTREAM".to_string(),
        boundary_scope: "DEFAULT".to_string(),
        tag_filter_expression: tagfilter::wire_from_text(Some("request.path@dest EQUALS '/home'"))
            .unwrap(),
        access_rules: Vec::new(),
    };
    let _read = server
        .mock(
            "GET",
            format!("/api/application-monitoring/settings/application/{}", id).as_str(),
        )
        .with_body(serde_json::to_string(&stored).unwrap())
        .create_async()
        .await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "instana_application_config".to_string(),
                current_state: created.new_state.clone(),
            },
        )
        .await;
    assert!(!read.diagnostics.has_errors(), "{:?}", read.diagnostics);
    assert_eq!(read.new_state, Some(created.new_state));
}

#[tokio::test]
async fn script_action_sends_encoded_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/automation/actions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(
                r#""name":"script_ssh"[^}]*"encoding":"base64","value":"ZWNobyAiaGki""#.to_string(),
            ),
            Matcher::Regex(r#""name":"subtype"[^}]*"encoding":"ascii","value":"bash""#.to_string()),
            Matcher::Regex(r#""name":"timeout"[^}]*"encoding":"ascii","value":"10""#.to_string()),
            Matcher::Regex(r#""type":"SCRIPT""#.to_string()),
        ]))
        .with_body_from_request(echo)
        .create_async()
        .await;

    let resource = HandleResource::with_client(AutomationActionResource, client(&server));
    let resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "instana_automation_action".to_string(),
                planned_state: Value::object([
                    ("id", Value::Unknown),
                    ("name", Value::from("restart")),
                    (
                        "script",
                        Value::List(vec![Value::object([
                            ("content", Value::from(r#"echo "hi""#)),
                            ("interpreter", Value::from("bash")),
                            ("timeout", Value::from("10")),
                        ])]),
                    ),
                ]),
                config: Value::Null,
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    let script = resp.new_state.get_block("script").unwrap();
    assert_eq!(script.get_string("content").as_deref(), Some(r#"echo "hi""#));
    assert_eq!(script.get_string("interpreter").as_deref(), Some("bash"));
    assert_eq!(script.get_string("timeout").as_deref(), Some("10"));
    assert!(resp.new_state.get("http").is_null());
    mock.assert_async().await;
}

#[tokio::test]
async fn custom_event_spec_lookup_reports_the_query() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/events/settings/event-specifications/custom")
        .with_body(
            r#"[{"id":"ev1","name":"eventName","entityType":"host","triggering":false,"enabled":true,"rules":[]}]"#,
        )
        .create_async()
        .await;

    let data_source =
        LookupDataSource::<CustomEventSpecDataSource>::with_client(client(&server));
    let config = Value::object([
        ("name", Value::from("customEvent2")),
        ("entity_type", Value::from("host")),
    ]);
    let resp = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "instana_custom_event_spec".to_string(),
                config,
            },
        )
        .await;

    let error = resp.diagnostics.errors().next().unwrap();
    assert!(
        error
            .detail
            .contains("no custom event specification found for name 'customEvent2' and entity type 'host'"),
        "{}",
        error.detail
    );
}

#[tokio::test]
async fn custom_event_spec_lookup_finds_a_match() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/events/settings/event-specifications/custom")
        .with_body(
            r#"[{"id":"ev1","name":"eventName","entityType":"host","query":"entity.zone:eu","triggering":true,"enabled":true,"rules":[]}]"#,
        )
        .create_async()
        .await;

    let data_source =
        LookupDataSource::<CustomEventSpecDataSource>::with_client(client(&server));
    let resp = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "instana_custom_event_spec".to_string(),
                config: Value::object([
                    ("name", Value::from("eventName")),
                    ("entity_type", Value::from("host")),
                ]),
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    assert_eq!(resp.state.get_string("id").as_deref(), Some("ev1"));
    assert_eq!(resp.state.get_string("query").as_deref(), Some("entity.zone:eu"));
    assert_eq!(resp.state.get_bool("triggering"), Some(true));
}

fn token_state(name: &str) -> Value {
    Value::object([
        ("id", Value::from("tok-1")),
        ("internal_id", Value::from("int-1")),
        ("access_granting_token", Value::from("grant")),
        ("name", Value::from(name)),
        ("can_configure_users", Value::from(true)),
    ])
}

#[tokio::test]
async fn api_token_is_addressed_by_internal_id() {
    let mut server = Server::new_async().await;
    let update = server
        .mock("PUT", "/api/settings/api-tokens/int-1")
        .match_body(Matcher::Regex(r#""canConfigureUsers":true"#.to_string()))
        .with_body_from_request(echo)
        .create_async()
        .await;
    let by_id = server
        .mock("PUT", "/api/settings/api-tokens/tok-1")
        .expect(0)
        .create_async()
        .await;

    let resource = HandleResource::with_client(ApiTokenResource, client(&server));
    let resp = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "instana_api_token".to_string(),
                prior_state: token_state("ci"),
                planned_state: token_state("ci-renamed"),
                config: Value::Null,
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    assert_eq!(resp.new_state.get_string("id").as_deref(), Some("tok-1"));
    assert_eq!(resp.new_state.get_string("internal_id").as_deref(), Some("int-1"));
    assert_eq!(resp.new_state.get_string("name").as_deref(), Some("ci-renamed"));
    update.assert_async().await;
    by_id.assert_async().await;

    let read = server
        .mock("GET", "/api/settings/api-tokens/int-1")
        .with_body(
            r#"{"id":"tok-1","accessGrantingToken":"grant","internalId":"int-1","name":"ci-renamed","canConfigureUsers":true}"#,
        )
        .create_async()
        .await;
    let resp = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "instana_api_token".to_string(),
                current_state: token_state("ci-renamed"),
            },
        )
        .await;
    let state = resp.new_state.unwrap();
    assert_eq!(state.get_string("id").as_deref(), Some("tok-1"));
    assert_eq!(state.get_bool("can_configure_users"), Some(true));
    read.assert_async().await;
}

fn log_alert_state(id: Value, name: &str) -> Value {
    Value::object([
        ("id", id),
        ("name", Value::from(name)),
        ("tag_filter", Value::from("log.level@na EQUALS 'ERROR'")),
        (
            "rules",
            Value::List(vec![Value::object([
                ("metric_name", Value::from("log.count")),
                ("alert_type", Value::from("logCount")),
                ("aggregation", Value::from("SUM")),
                ("threshold_operator", Value::from(">")),
            ])]),
        ),
    ])
}

#[tokio::test]
async fn log_alert_updates_are_posted_to_the_item() {
    let mut server = Server::new_async().await;
    let update = server
        .mock("POST", "/api/events/settings/global-alert-configs/logs/log-1")
        .match_body(Matcher::Regex(r#""name":"error logs v2""#.to_string()))
        .with_body_from_request(echo)
        .create_async()
        .await;
    let put = server.mock("PUT", Matcher::Any).expect(0).create_async().await;

    let resource = HandleResource::with_client(LogAlertConfigResource, client(&server));
    let resp = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "instana_log_alert_config".to_string(),
                prior_state: log_alert_state(Value::from("log-1"), "error logs"),
                planned_state: log_alert_state(Value::from("log-1"), "error logs v2"),
                config: Value::Null,
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    assert_eq!(resp.new_state.get_string("name").as_deref(), Some("error logs v2"));
    assert_eq!(
        resp.new_state.get_string("tag_filter").as_deref(),
        Some("log.level@na EQUALS 'ERROR'")
    );
    update.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn slo_correction_is_created_with_its_schedule() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/api/settings/correction")
        .match_body(Matcher::Regex(
            r#""scheduling":\{"startTime":1700000000000,"duration":1,"durationUnit":"DAY""#
                .to_string(),
        ))
        .with_body_from_request(echo)
        .create_async()
        .await;

    let resource = HandleResource::with_client(SloCorrectionConfigResource, client(&server));
    let resp = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "instana_slo_correction_config".to_string(),
                planned_state: Value::object([
                    ("id", Value::Unknown),
                    ("name", Value::from("release freeze")),
                    ("description", Value::from("holiday release freeze")),
                    ("active", Value::from(true)),
                    ("slo_ids", Value::string_set(["SLOTFcheckout"])),
                    (
                        "scheduling",
                        Value::List(vec![Value::object([
                            ("start_time", Value::from(1_700_000_000_000i64)),
                            ("duration", Value::from(1i64)),
                            ("duration_unit", Value::from("DAY")),
                            ("recurrent", Value::from(false)),
                        ])]),
                    ),
                ]),
                config: Value::Null,
            },
        )
        .await;

    assert!(!resp.diagnostics.has_errors(), "{:?}", resp.diagnostics);
    assert!(!resp.new_state.get_string("id").unwrap_or_default().is_empty());
    let scheduling = resp.new_state.get_block("scheduling").unwrap();
    assert_eq!(scheduling.get_i64("start_time"), Some(1_700_000_000_000));
    assert_eq!(scheduling.get_string("duration_unit").as_deref(), Some("DAY"));
    create.assert_async().await;
}
