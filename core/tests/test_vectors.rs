//! Verify request building and status mapping against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON (not raw strings) so field order does
//! not matter.

use std::time::Duration;

use ctxmem::status::check_status;
use ctxmem::{
    ApiError, ClientConfig, ContextMemory, EntryFilter, EntryOptions, HttpMethod, HttpRequest,
    HttpResponse, NewEntry, NewNamespace, SearchOptions, UreqTransport,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> ContextMemory<UreqTransport> {
    let config = ClientConfig {
        api_key: "test-key".to_string(),
        base_url: BASE_URL.to_string(),
        timeout: Duration::from_secs(30),
    };
    ContextMemory::new(config)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_field<'a>(input: &'a Value, name: &str) -> &'a str {
    input[name].as_str().unwrap()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn build(c: &ContextMemory<UreqTransport>, operation: &str, input: &Value) -> HttpRequest {
    match operation {
        "text_lookup" => c
            .build_text_lookup(str_field(input, "namespace"), str_field(input, "key"))
            .unwrap(),
        "search" => {
            let mut options = SearchOptions::new();
            if let Some(ns) = input["namespace"].as_str() {
                options = options.namespace(ns);
            }
            if let Some(limit) = input["limit"].as_u64() {
                options = options.limit(limit as u32);
            }
            if let Some(threshold) = input["threshold"].as_f64() {
                options = options.threshold(threshold);
            }
            if input.get("tags").is_some() {
                options = options.tags(strings(&input["tags"]));
            }
            c.build_search(str_field(input, "query"), &options).unwrap()
        }
        "create_entry" => {
            let mut options = EntryOptions::new();
            if input.get("tags").is_some() {
                options = options.tags(strings(&input["tags"]));
            }
            if let Some(ttl) = input["ttl_seconds"].as_u64() {
                options = options.ttl_seconds(ttl);
            }
            if let Some(importance) = input["importance"].as_f64() {
                options = options.importance(importance);
            }
            let entry = NewEntry::new(str_field(input, "key"), input["value"].clone(), options);
            c.build_create_entry(str_field(input, "namespace"), &entry)
                .unwrap()
        }
        "list_entries" => {
            let filter = EntryFilter {
                tag: input["tag"].as_str().map(str::to_string),
                limit: input["limit"].as_u64().map(|l| l as u32),
            };
            c.build_list_entries(str_field(input, "namespace"), &filter)
        }
        "delete_entry" => c.build_delete_entry(str_field(input, "namespace"), str_field(input, "id")),
        "list_namespaces" => c.build_list_namespaces(),
        "create_namespace" => {
            let mut ns = NewNamespace::new(str_field(input, "slug"));
            if let Some(name) = input["name"].as_str() {
                ns = ns.name(name);
            }
            if let Some(description) = input["description"].as_str() {
                ns = ns.description(description);
            }
            c.build_create_namespace(&ns).unwrap()
        }
        "get_namespace" => c.build_get_namespace(str_field(input, "slug")),
        "delete_namespace" => c.build_delete_namespace(str_field(input, "slug")),
        "account" => c.build_account(),
        other => panic!("unknown operation: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];
        let req = build(&c, case["operation"].as_str().unwrap(), &case["input"]);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
        assert_eq!(req.header("x-api-key"), Some("test-key"), "{name}: api key");

        let expected_query: Vec<(String, String)> = expected
            .get("query")
            .map(|q| {
                q.as_array()
                    .unwrap()
                    .iter()
                    .map(|pair| {
                        let pair = strings(pair);
                        (pair[0].clone(), pair[1].clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(req.query, expected_query, "{name}: query");

        match expected.get("body") {
            Some(expected_body) => {
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content-type");
                let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
            }
            None => {
                assert!(req.body.is_none(), "{name}: body should be None");
                assert!(req.header("content-type").is_none(), "{name}: content-type");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

fn kind(err: &ApiError) -> &'static str {
    match err {
        ApiError::Authentication(_) => "Authentication",
        ApiError::RateLimit { .. } => "RateLimit",
        ApiError::NotFound(_) => "NotFound",
        ApiError::Validation(_) => "Validation",
        ApiError::LimitExceeded(_) => "LimitExceeded",
        ApiError::Request(_) => "Request",
        ApiError::Serialization(_) => "Serialization",
        ApiError::Deserialization(_) => "Deserialization",
    }
}

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let mut response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        if let Some(headers) = sim.get("headers") {
            for pair in headers.as_array().unwrap() {
                let pair = strings(pair);
                response = response.with_header(pair[0].clone(), pair[1].clone());
            }
        }

        let result = check_status(&response);
        match case["expected_error"].as_str() {
            None => assert!(result.is_ok(), "{name}: expected success"),
            Some(expected_kind) => {
                let err = result.unwrap_err();
                assert_eq!(kind(&err), expected_kind, "{name}: kind");
                assert_eq!(err.message(), case["expected_message"].as_str().unwrap(), "{name}: message");
                assert_eq!(err.status(), Some(response.status), "{name}: status");
                if let Some(retry_after) = case.get("expected_retry_after") {
                    assert_eq!(err.retry_after(), retry_after.as_u64(), "{name}: retry_after");
                }
            }
        }
    }
}
