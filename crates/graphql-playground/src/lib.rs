//! A GraphiQL page talking to a GraphQL endpoint of the same host.

use std::future::{ready, Ready};

use axum::response::Html;

const GRAPHIQL_VERSION: &str = "1.5.16";
const GRAPHIQL_CSS_SRI: &str = "sha256-HADQowUuFum02+Ckkv5Yu5ygRoLllHZqg0TFZXY7NHI=";
const GRAPHIQL_JS_SRI: &str = "sha256-uHp12yvpXC4PC9+6JmITxKuLYwjlW9crq9ywPE5Rxco=";
const REACT_SRI: &str = "sha256-Ipu/TQ50iCCVZBUsZyNJfxrDk0E2yhaEIz0vqI+kFG8=";
const REACT_DOM_SRI: &str = "sha256-nbMykgB6tsOFJ7OdVmPpdqMFVk4ZsqWocT6issAPUF0=";

const DEFAULT_TITLE: &str = "GraphQL Playground";
const DEFAULT_ENDPOINT: &str = "/query";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundConfig {
    /// Page title. Default: `GraphQL Playground`
    pub title: String,
    /// Path of the GraphQL endpoint on the serving host, used for both queries and
    /// subscriptions. Default: `/query`
    pub endpoint: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        PlaygroundConfig {
            title: DEFAULT_TITLE.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }
}

impl PlaygroundConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        PlaygroundConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Generate the GraphiQL page.
///
/// # Example
///
/// ```rust
/// use graphql_playground::{source, PlaygroundConfig};
///
/// let page = source(&PlaygroundConfig::new("/graphql").title("My API"));
/// assert!(page.contains("<title>My API</title>"));
/// ```
pub fn source(config: &PlaygroundConfig) -> String {
    let title = if config.title.is_empty() {
        DEFAULT_TITLE
    } else {
        config.title.as_str()
    };
    let endpoint = if config.endpoint.is_empty() {
        DEFAULT_ENDPOINT
    } else {
        config.endpoint.as_str()
    };

    format!(
        r##"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <link
      rel="stylesheet"
      href="https://cdn.jsdelivr.net/npm/graphiql@{GRAPHIQL_VERSION}/graphiql.min.css"
      integrity="{GRAPHIQL_CSS_SRI}"
      crossorigin="anonymous"
    />
  </head>
  <body style="margin: 0;">
    <div id="graphiql" style="height: 100vh;"></div>
    <script
      src="https://cdn.jsdelivr.net/npm/react@17.0.2/umd/react.production.min.js"
      integrity="{REACT_SRI}"
      crossorigin="anonymous"
    ></script>
    <script
      src="https://cdn.jsdelivr.net/npm/react-dom@17.0.2/umd/react-dom.production.min.js"
      integrity="{REACT_DOM_SRI}"
      crossorigin="anonymous"
    ></script>
    <script
      src="https://cdn.jsdelivr.net/npm/graphiql@{GRAPHIQL_VERSION}/graphiql.min.js"
      integrity="{GRAPHIQL_JS_SRI}"
      crossorigin="anonymous"
    ></script>
    <script>
      const endpoint = {endpoint};
      const url = location.protocol + '//' + location.host + endpoint;
      const wsProto = location.protocol == 'https:' ? 'wss:' : 'ws:';
      const subscriptionUrl = wsProto + '//' + location.host + endpoint;
      const fetcher = GraphiQL.createFetcher({{ url, subscriptionUrl }});
      ReactDOM.render(
        React.createElement(GraphiQL, {{
          fetcher: fetcher,
          headerEditorEnabled: true,
          shouldPersistHeaders: true
        }}),
        document.getElementById('graphiql'),
      );
    </script>
  </body>
</html>
"##,
        title = escape_html(title),
        endpoint = script_string(endpoint),
    )
}

/// An axum handler serving the page rendered once from `config`.
pub fn handler(config: PlaygroundConfig) -> impl FnOnce() -> Ready<Html<String>> + Clone + Send + Sync + 'static {
    let page = source(&config);
    move || ready(Html(page))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// A JavaScript string literal that cannot close the surrounding `<script>` element.
fn script_string(text: &str) -> String {
    serde_json::Value::from(text)
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
