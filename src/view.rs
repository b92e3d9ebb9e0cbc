//! # Render Context
//!
//! Pages are emitted as their render context: a JSON document naming the
//! template plus the per-request locals and page data. Any template engine
//! can consume the same document.

use crate::db::models::Identity;
use crate::error::ErrorPage;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Per-request values every template can read
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Locals {
    pub current_user: Option<Identity>,
    pub success: Vec<String>,
    pub error: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Page {
    view: &'static str,
    locals: Locals,
    data: Map<String, Value>,
}

impl Page {
    pub fn new(view: &'static str, locals: Locals) -> Self {
        Self {
            view,
            locals,
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn error(locals: Locals, err: &ErrorPage) -> Self {
        let err = serde_json::to_value(err).unwrap_or(Value::Null);
        Self::new("error", locals).with("err", err)
    }

    fn document(self) -> Value {
        let mut document = match serde_json::to_value(self.locals) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        document.insert("view".to_string(), Value::from(self.view));
        document.extend(self.data);
        Value::Object(document)
    }
}

/// `302 Found` to `to`, the status browsers follow with a GET after a form post
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self.document()).into_response()
    }
}
