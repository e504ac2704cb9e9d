use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::models::{ErrorResponse, TaskInfo, TaskListItem};

pub struct HTTPClient {
    pub base_url: String,
    client: Client,
}

impl HTTPClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| err.to_string())?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn create(&self) -> Result<TaskInfo, String> {
        let resp = self
            .client
            .post(self.url("/tasks"))
            .send()
            .map_err(|err| err.to_string())?;
        decode(resp)
    }

    pub fn get(&self, id: &str) -> Result<TaskInfo, String> {
        let resp = self
            .client
            .get(self.url(&format!("/tasks/{}", id)))
            .send()
            .map_err(|err| err.to_string())?;
        decode(resp)
    }

    pub fn list(&self) -> Result<Vec<TaskListItem>, String> {
        let resp = self
            .client
            .get(self.url("/tasks/all"))
            .send()
            .map_err(|err| err.to_string())?;
        decode(resp)
    }

    pub fn filter(
        &self,
        status: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<TaskInfo>, String> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let resp = self
            .client
            .get(self.url("/tasks/filter"))
            .query(&query)
            .send()
            .map_err(|err| err.to_string())?;
        decode(resp)
    }

    pub fn cancel(&self, id: &str) -> Result<(), String> {
        let resp = self
            .client
            .put(self.url(&format!("/tasks/{}/cancel", id)))
            .send()
            .map_err(|err| err.to_string())?;
        expect_success(resp)
    }

    pub fn delete(&self, id: &str) -> Result<(), String> {
        let resp = self
            .client
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .map_err(|err| err.to_string())?;
        expect_success(resp)
    }

    pub fn health(&self) -> Result<String, String> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .map_err(|err| err.to_string())?;
        if resp.status().is_success() {
            resp.text().map_err(|err| err.to_string())
        } else {
            Err(http_error(resp))
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, String> {
    if resp.status().is_success() {
        resp.json::<T>().map_err(|err| err.to_string())
    } else {
        Err(http_error(resp))
    }
}

fn expect_success(resp: Response) -> Result<(), String> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(http_error(resp))
    }
}

fn http_error(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.message)
        .unwrap_or(body);
    format!("http {}: {}", status.as_u16(), message)
}
