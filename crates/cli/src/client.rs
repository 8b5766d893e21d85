// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: a thin blocking HTTP wrapper around the daemon's status
//! surface. No retry/reconnect logic — a device-local daemon is either up
//! or it isn't, and the caller (a human or a script) decides what to do
//! about that.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the daemon at {url}: {source}")]
    Unreachable { url: String, #[source] source: reqwest::Error },
    #[error("the daemon refused the request: {0}")]
    Refused(String),
    #[error("the daemon returned an unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("could not parse the daemon's response: {0}")]
    Decode(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct DaemonClient {
    base_url: String,
    http: Client,
}

impl DaemonClient {
    pub fn new() -> Self {
        Self { base_url: env::daemon_url(), http: Client::builder().timeout(env::request_timeout()).build().unwrap_or_default() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .map_err(|source| ClientError::Unreachable { url: self.base_url.clone(), source })?;
        Self::into_body(response)
    }

    fn post(&self, path: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(path))
            .send()
            .map_err(|source| ClientError::Unreachable { url: self.base_url.clone(), source })?;
        Self::into_body(response).map(|_| ())
    }

    fn into_body(response: reqwest::blocking::Response) -> Result<Value, ClientError> {
        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(response.json::<Value>().unwrap_or(Value::Null)),
            StatusCode::CONFLICT => {
                let body = response.json::<ErrorBody>()?;
                Err(ClientError::Refused(body.error))
            }
            status => Err(ClientError::UnexpectedStatus(status)),
        }
    }

    pub fn status(&self) -> Result<Value, ClientError> {
        self.get("/status")
    }

    pub fn activity(&self) -> Result<Value, ClientError> {
        self.get("/activity")
    }

    pub fn trigger(&self) -> Result<(), ClientError> {
        self.post("/trigger")
    }

    pub fn monitor_start(&self) -> Result<(), ClientError> {
        self.post("/monitor/start")
    }

    pub fn monitor_stop(&self) -> Result<(), ClientError> {
        self.post("/monitor/stop")
    }

    pub fn reset_state(&self) -> Result<(), ClientError> {
        self.post("/reset-state")
    }
}

impl Default for DaemonClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
