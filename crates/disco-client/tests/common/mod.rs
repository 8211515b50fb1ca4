#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use disco_core::config::DiscoConfig;
use serde_json::{Value, json};

/// Request counters and failure switches of a fake discovery server.
#[derive(Default)]
pub struct Hits {
    pub directory: AtomicUsize,
    pub spec: AtomicUsize,
    pub api: AtomicUsize,
    pub fail_directory: AtomicBool,
    pub duplicate_directory: AtomicBool,
    pub slow_specs: AtomicBool,
}

#[derive(Clone)]
struct Shared {
    base_url: String,
    hits: Arc<Hits>,
}

/// An in-process server that plays both the discovery service and the API.
pub struct FakeGoogle {
    pub base_url: String,
    pub hits: Arc<Hits>,
}

impl FakeGoogle {
    pub fn config(&self) -> DiscoConfig {
        DiscoConfig {
            directory_url: format!("{}/discovery/v1/apis", self.base_url),
            request_timeout_secs: 5,
            ..DiscoConfig::default()
        }
    }

    pub fn directory_hits(&self) -> usize {
        self.hits.directory.load(Ordering::SeqCst)
    }

    pub fn spec_hits(&self) -> usize {
        self.hits.spec.load(Ordering::SeqCst)
    }

    pub fn fail_directory(&self) {
        self.hits.fail_directory.store(true, Ordering::SeqCst);
    }

    /// Append a second, differently titled `sheets:v4` entry to the directory.
    pub fn duplicate_directory(&self) {
        self.hits.duplicate_directory.store(true, Ordering::SeqCst);
    }

    /// Delay every specification response by two seconds.
    pub fn slow_specs(&self) {
        self.hits.slow_specs.store(true, Ordering::SeqCst);
    }
}

pub async fn spawn() -> FakeGoogle {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(Hits::default());

    let app = Router::new()
        .route("/discovery/v1/apis", get(directory))
        .route("/specs/{name}", get(spec))
        .fallback(api)
        .with_state(Shared {
            base_url: base_url.clone(),
            hits: Arc::clone(&hits),
        });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeGoogle { base_url, hits }
}

async fn directory(State(shared): State<Shared>) -> Response {
    shared.hits.directory.fetch_add(1, Ordering::SeqCst);
    // Long enough for concurrent readers to pile up behind the refresh.
    tokio::time::sleep(Duration::from_millis(50)).await;
    if shared.hits.fail_directory.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let mut document = directory_document(&shared.base_url);
    if shared.hits.duplicate_directory.load(Ordering::SeqCst) {
        if let Some(items) = document["items"].as_array_mut() {
            items.push(json!({
                "id": "sheets:v4",
                "name": "sheets",
                "version": "v4",
                "title": "A Sheets mirror",
                "discoveryRestUrl": format!("{}/specs/mirror", shared.base_url),
                "preferred": true
            }));
        }
    }
    Json(document).into_response()
}

async fn spec(State(shared): State<Shared>, Path(name): Path<String>) -> Response {
    shared.hits.spec.fetch_add(1, Ordering::SeqCst);
    if shared.hits.slow_specs.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    match name.as_str() {
        "sheets" => Json(sheets_document(&shared.base_url)).into_response(),
        _ => (StatusCode::NOT_FOUND, "no such document").into_response(),
    }
}

/// Everything else is an API call. The first id segment after
/// `/v4/spreadsheets/` picks the behavior.
async fn api(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    shared.hits.api.fetch_add(1, Ordering::SeqCst);
    let id = uri
        .path()
        .strip_prefix("/v4/spreadsheets/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default()
        .to_string();

    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
        "text" => "plain ok".into_response(),
        "empty" => StatusCode::NO_CONTENT.into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({})).into_response()
        }
        _ => {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let echo = json!({
                "method": method.as_str(),
                "path": uri.path(),
                "query": uri.query(),
                "authorization": header("authorization"),
                "contentType": header("content-type"),
                "accept": header("accept"),
                "bodyLength": body.len(),
                "body": serde_json::from_slice::<Value>(&body).ok(),
            });
            let mut response = Json(echo).into_response();
            response
                .headers_mut()
                .append("x-fake", HeaderValue::from_static("a"));
            response
                .headers_mut()
                .append("x-fake", HeaderValue::from_static("b"));
            response
        }
    }
}

pub fn directory_document(base_url: &str) -> Value {
    json!({
        "kind": "discovery#directoryList",
        "discoveryVersion": "v1",
        "items": [
            {
                "id": "sheets:v4",
                "name": "sheets",
                "version": "v4",
                "title": "Google Sheets API",
                "description": "Reads and writes Google Sheets.",
                "discoveryRestUrl": format!("{base_url}/specs/sheets"),
                "preferred": true
            },
            {
                "id": "sheets:v3",
                "name": "sheets",
                "version": "v3",
                "title": "Google Sheets API",
                "discoveryRestUrl": format!("{base_url}/specs/sheets-v3"),
                "preferred": false
            },
            {
                "id": "drive:v3",
                "name": "drive",
                "version": "v3",
                "title": "Drive API",
                "discoveryRestUrl": format!("{base_url}/specs/drive"),
                "preferred": false
            }
        ]
    })
}

pub const LONG_DESCRIPTION: &str = "Returns the spreadsheet at the given ID. The caller must \
    specify the spreadsheet ID. By default, data within grids is not returned.";

pub fn sheets_document(base_url: &str) -> Value {
    let range_params = json!({
        "spreadsheetId": {"type": "string", "location": "path", "required": true},
        "range": {"type": "string", "location": "path", "required": true}
    });
    let mut get_params = range_params.clone();
    get_params["majorDimension"] = json!({
        "type": "string",
        "location": "query",
        "enum": ["DIMENSION_UNSPECIFIED", "ROWS", "COLUMNS"]
    });
    let mut update_params = range_params.clone();
    update_params["valueInputOption"] = json!({"type": "string", "location": "query"});

    json!({
        "kind": "discovery#restDescription",
        "id": "sheets:v4",
        "name": "sheets",
        "version": "v4",
        "title": "Google Sheets API",
        "rootUrl": format!("{base_url}/"),
        "servicePath": "",
        "parameters": {
            "fields": {"type": "string", "location": "query"}
        },
        "schemas": {
            "Spreadsheet": {
                "id": "Spreadsheet",
                "type": "object",
                "properties": {
                    "spreadsheetId": {"type": "string"},
                    "sheets": {"type": "array", "items": {"$ref": "Sheet"}}
                }
            },
            "Sheet": {
                "id": "Sheet",
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "spreadsheet": {"$ref": "Spreadsheet"}
                }
            },
            "ValueRange": {
                "id": "ValueRange",
                "type": "object",
                "description": "Data within a range of the spreadsheet.",
                "properties": {
                    "range": {"type": "string"},
                    "majorDimension": {"type": "string"},
                    "values": {"type": "array", "items": {"type": "array", "items": {"type": "any"}}}
                }
            }
        },
        "resources": {
            "spreadsheets": {
                "methods": {
                    "get": {
                        "id": "sheets.spreadsheets.get",
                        "path": "v4/spreadsheets/{spreadsheetId}",
                        "httpMethod": "GET",
                        "description": LONG_DESCRIPTION,
                        "parameters": {
                            "spreadsheetId": {"type": "string", "location": "path", "required": true},
                            "includeGridData": {"type": "boolean", "location": "query"}
                        },
                        "response": {"$ref": "Spreadsheet"}
                    }
                },
                "resources": {
                    "values": {
                        "methods": {
                            "get": {
                                "id": "sheets.spreadsheets.values.get",
                                "path": "v4/spreadsheets/{spreadsheetId}/values/{range}",
                                "httpMethod": "GET",
                                "description": "Returns a range of values from a spreadsheet.",
                                "parameters": get_params,
                                "response": {"$ref": "ValueRange"}
                            },
                            "update": {
                                "id": "sheets.spreadsheets.values.update",
                                "path": "v4/spreadsheets/{spreadsheetId}/values/{range}",
                                "httpMethod": "PUT",
                                "description": "Sets values in a range of a spreadsheet.",
                                "parameters": update_params,
                                "request": {"$ref": "ValueRange"},
                                "response": {"$ref": "UpdateValuesResponse"}
                            },
                            "clear": {
                                "id": "sheets.spreadsheets.values.clear",
                                "path": "v4/spreadsheets/{spreadsheetId}/values/{range}:clear",
                                "httpMethod": "POST",
                                "parameters": range_params
                            }
                        }
                    }
                }
            }
        }
    })
}
