//! GraphQL-over-HTTP endpoint.
//!
//! # Responsibilities
//! - Decode the request envelope from a JSON body (POST) or query string (GET)
//! - Hand the operation to a [`QueryExecutor`]
//! - Serve GraphiQL to browsers in development
//!
//! Schema and resolvers live behind [`QueryExecutor`]; this module only moves
//! envelopes in and results out.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::response::ApiError;

/// A decoded GraphQL operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: Value,
    pub operation_name: Option<String>,
}

/// POST body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphQlBody {
    pub query: Option<String>,
    pub variables: Option<Value>,
    pub operation_name: Option<String>,
}

/// GET query string; `variables` arrives JSON-encoded.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphQlParams {
    pub query: Option<String>,
    pub variables: Option<String>,
    pub operation_name: Option<String>,
}

impl TryFrom<GraphQlBody> for GraphQlRequest {
    type Error = ApiError;

    fn try_from(body: GraphQlBody) -> Result<Self, Self::Error> {
        Ok(Self {
            query: require_query(body.query)?,
            variables: body.variables.unwrap_or(Value::Null),
            operation_name: body.operation_name,
        })
    }
}

impl TryFrom<GraphQlParams> for GraphQlRequest {
    type Error = ApiError;

    fn try_from(params: GraphQlParams) -> Result<Self, Self::Error> {
        let query = require_query(params.query)?;
        let variables = match params.variables.as_deref().map(str::trim) {
            None | Some("") => Value::Null,
            Some(raw) => serde_json::from_str(raw)
                .map_err(|_| ApiError::bad_request("Variables are invalid JSON."))?,
        };
        Ok(Self {
            query,
            variables,
            operation_name: params.operation_name,
        })
    }
}

fn require_query(query: Option<String>) -> Result<String, ApiError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(ApiError::bad_request("Must provide query string.")),
    }
}

/// Executes GraphQL operations against the application schema.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    /// Run one operation, returning the GraphQL response document
    /// (`{"data": .., "errors": ..}`).
    async fn execute(&self, request: GraphQlRequest) -> Result<Value, ApiError>;
}

/// Executor with an empty `Query` root: answers `{ __typename }` and reports
/// every other selection as a GraphQL error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypenameExecutor;

#[async_trait]
impl QueryExecutor for TypenameExecutor {
    async fn execute(&self, request: GraphQlRequest) -> Result<Value, ApiError> {
        if is_typename_query(&request.query) {
            return Ok(json!({ "data": { "__typename": "Query" } }));
        }
        Ok(json!({
            "data": null,
            "errors": [{ "message": "No resolvers are registered for this operation." }]
        }))
    }
}

/// `{ __typename }`, optionally as `query [Name] { __typename }`.
fn is_typename_query(query: &str) -> bool {
    let query = query.trim();
    let selection = match query.strip_prefix("query") {
        Some(rest) => {
            let Some(open) = rest.find('{') else {
                return false;
            };
            let name = rest[..open].trim();
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return false;
            }
            &rest[open..]
        }
        None => query,
    };

    let compact: String = selection.chars().filter(|c| !c.is_whitespace()).collect();
    compact == "{__typename}"
}

/// GraphiQL page served to browsers in development.
pub const GRAPHIQL_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>GraphiQL</title>
    <link rel="stylesheet" href="https://unpkg.com/graphiql/graphiql.min.css" />
  </head>
  <body style="margin: 0;">
    <div id="graphiql" style="height: 100vh;"></div>
    <script crossorigin src="https://unpkg.com/react/umd/react.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/react-dom/umd/react-dom.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/graphiql/graphiql.min.js"></script>
    <script>
      const fetcher = GraphiQL.createFetcher({ url: window.location.pathname });
      ReactDOM.render(
        React.createElement(GraphiQL, { fetcher }),
        document.getElementById('graphiql'),
      );
    </script>
  </body>
</html>
"#;
