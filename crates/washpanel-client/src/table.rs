// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table query builder for the backend's REST surface.
//!
//! Covers the subset of the query grammar the dashboard uses: `select`,
//! `eq` filters, `order`, `limit`, and representation-returning writes.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use washpanel_core::WashpanelError;

use crate::backend::BackendClient;

/// A single query against one table, built fluently and executed once.
///
/// Obtained from [`crate::handle::ClientHandle::table`]; binds the client
/// instance that was current at call time.
pub struct TableQuery {
    client: Option<Arc<BackendClient>>,
    table: String,
    filters: Vec<(String, String)>,
    select: Option<String>,
    order: Option<String>,
    limit: Option<u32>,
    bearer: Option<String>,
}

impl TableQuery {
    pub(crate) fn new(client: Option<Arc<BackendClient>>, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            filters: Vec::new(),
            select: None,
            order: None,
            limit: None,
            bearer: None,
        }
    }

    /// Restrict returned columns (`select=` parameter).
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Add an equality filter: `column=eq.value`.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Order by `column`, ascending or descending.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Attach a user access token as the `Authorization` bearer.
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// Execute as a GET, returning all matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, WashpanelError> {
        let (client, url) = self.endpoint()?;
        let mut request = client.http().get(url);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        self.read_rows(response).await
    }

    /// Execute as a GET expecting exactly one row.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, WashpanelError> {
        let table = self.table.clone();
        let rows: Vec<T> = self.limit(1).fetch().await?;
        rows.into_iter().next().ok_or_else(|| WashpanelError::Api {
            message: format!("no rows returned from `{table}`"),
            source: None,
        })
    }

    /// Insert `body` and return the stored representation.
    pub async fn insert<T: DeserializeOwned>(
        self,
        body: &impl Serialize,
    ) -> Result<T, WashpanelError> {
        let (client, url) = self.endpoint()?;
        let mut request = client
            .http()
            .post(url)
            .header("Prefer", "return=representation")
            .json(body);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let table = self.table.clone();
        let mut rows: Vec<T> = self.read_rows(response).await?;
        rows.pop().ok_or_else(|| WashpanelError::Api {
            message: format!("insert into `{table}` returned no representation"),
            source: None,
        })
    }

    /// Patch all rows matching the filters with `body`.
    pub async fn update(self, body: &impl Serialize) -> Result<(), WashpanelError> {
        let (client, url) = self.endpoint()?;
        let mut request = client.http().patch(url).json(body);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WashpanelError::Api {
                message: format!("table `{}` update returned {status}: {body}", self.table),
                source: None,
            });
        }
        Ok(())
    }

    fn endpoint(&self) -> Result<(Arc<BackendClient>, reqwest::Url), WashpanelError> {
        let client = self
            .client
            .clone()
            .ok_or(WashpanelError::ClientNotInitialized)?;
        let mut url = client.rest_endpoint(&self.table);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(select) = &self.select {
                pairs.append_pair("select", select);
            }
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            if let Some(order) = &self.order {
                pairs.append_pair("order", order);
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok((client, url))
    }

    fn transport_error(&self, e: reqwest::Error) -> WashpanelError {
        WashpanelError::Api {
            message: format!("table `{}` request failed: {e}", self.table),
            source: Some(Box::new(e)),
        }
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<T>, WashpanelError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| WashpanelError::Api {
            message: format!("failed to read `{}` response body: {e}", self.table),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(WashpanelError::Api {
                message: format!("table `{}` request returned {status}: {body}", self.table),
                source: None,
            });
        }

        serde_json::from_str(&body).map_err(|e| WashpanelError::Api {
            message: format!("failed to parse `{}` rows: {e}", self.table),
            source: Some(Box::new(e)),
        })
    }
}
