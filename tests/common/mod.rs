#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use tasklist_api::app::{app, AppState};
use tasklist_api::config::AppConfig;
use tasklist_api::database::Stores;

/// A server running in-process on its own port with a fresh memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::for_tests();
        config.server.port = port;

        let state = AppState::new(&config, Stores::memory())?;
        let router = app(state, &config);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {e}");
            }
        });

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login returned {}", res.status());
        Ok(res.json().await?)
    }

    /// Register and log in, returning the bearer token
    pub async fn session(&self, username: &str, password: &str) -> Result<String> {
        let res = self.register(username, password).await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register returned {}", res.status());

        let body = self.login(username, password).await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("no token in login response: {}", body))
    }

    pub async fn list_todos(&self, token: &str) -> Result<Vec<Value>> {
        let res = self.client.get(self.url("/todos")).bearer_auth(token).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "list returned {}", res.status());
        let body: Value = res.json().await?;
        body["data"]
            .as_array()
            .cloned()
            .with_context(|| format!("list data is not an array: {}", body))
    }

    pub async fn create_todo(&self, token: &str, name: &str, description: &str) -> Result<i64> {
        let res = self
            .client
            .post(self.url("/todos"))
            .bearer_auth(token)
            .json(&json!({ "name": name, "description": description }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create returned {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["id"]
            .as_i64()
            .with_context(|| format!("no id in create response: {}", body))
    }

    pub async fn update_todo(&self, token: &str, id: i64, changes: Value) -> Result<Value> {
        let res = self
            .client
            .patch(self.url(&format!("/todos/{}", id)))
            .bearer_auth(token)
            .json(&changes)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "update returned {}", res.status());
        Ok(res.json().await?)
    }

    pub async fn delete_todo(&self, token: &str, id: i64) -> Result<Value> {
        let res = self
            .client
            .delete(self.url(&format!("/todos/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "delete returned {}", res.status());
        Ok(res.json().await?)
    }
}
