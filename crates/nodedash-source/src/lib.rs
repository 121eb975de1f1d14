// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use nodedash_app::{Machine, MachineRecord};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// JSON document served by `/api/machines` and accepted by
/// [`load_machines_file`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MachinesDocument {
    pub machines: Vec<MachineRecord>,
}

impl MachinesDocument {
    pub fn from_machines(machines: &[Machine]) -> Self {
        Self {
            machines: machines.iter().map(Machine::to_record).collect(),
        }
    }

    /// Fails on the first invalid record or repeated id; a partial fleet is
    /// never returned.
    pub fn into_machines(self) -> Result<Vec<Machine>> {
        let mut seen = BTreeSet::new();
        let mut machines = Vec::with_capacity(self.machines.len());
        for (index, record) in self.machines.into_iter().enumerate() {
            let machine =
                Machine::from_record(record).with_context(|| format!("machine record {index}"))?;
            if !seen.insert(machine.id.clone()) {
                bail!("machine record {index} repeats id {}", machine.id);
            }
            machines.push(machine);
        }
        Ok(machines)
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("source.base_url must not be empty");
        }
        let parsed =
            Url::parse(&base_url).with_context(|| format!("parse source.base_url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "source.base_url {:?} must use http or https, got {}",
                base_url,
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Readiness probe; any 2xx counts as healthy.
    pub fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        debug!(base_url = %self.base_url, "source healthy");
        Ok(())
    }

    pub fn list_machines(&self) -> Result<Vec<Machine>> {
        let response = self
            .http
            .get(format!("{}/api/machines", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let document: MachinesDocument = response.json().context("decode machine list")?;
        let machines = document.into_machines()?;
        info!(base_url = %self.base_url, count = machines.len(), "loaded machines");
        Ok(machines)
    }
}

pub fn load_machines_file(path: &Path) -> Result<Vec<Machine>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read machines file {}", path.display()))?;
    let document: MachinesDocument = serde_json::from_str(&raw).with_context(|| {
        format!(
            "parse machines file {} -- expected {{\"machines\": [...]}}",
            path.display()
        )
    })?;
    let machines = document
        .into_machines()
        .with_context(|| format!("load machines file {}", path.display()))?;
    info!(path = %path.display(), count = machines.len(), "loaded machines file");
    Ok(machines)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!(
            "timed out waiting for {base_url} -- raise source.timeout or check the server"
        );
    }
    anyhow!(
        "cannot reach {} -- start the clan web server or pass --machines-file ({})",
        base_url,
        error
    )
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message { message: String },
    Text(String),
}

impl ErrorBody {
    fn message(&self) -> &str {
        match self {
            Self::Message { message } => message,
            Self::Text(text) => text,
        }
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message().is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message());
    }

    let body = body.trim();
    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::{MachinesDocument, clean_error_response, load_machines_file};
    use anyhow::Result;
    use nodedash_app::{Machine, MachineStatus};
    use reqwest::StatusCode;
    use std::fs;

    #[test]
    fn clean_error_response_prefers_structured_message() {
        let error = clean_error_response(
            StatusCode::BAD_GATEWAY,
            r#"{"error":{"message":"inventory unavailable"}}"#,
        );
        assert_eq!(error.to_string(), "server error (502): inventory unavailable");

        let error = clean_error_response(StatusCode::NOT_FOUND, r#"{"error":"no such clan"}"#);
        assert_eq!(error.to_string(), "server error (404): no such clan");
    }

    #[test]
    fn clean_error_response_falls_back_to_status() {
        let error = clean_error_response(StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert_eq!(error.to_string(), "server error (503): busy");

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{\"oops\": true}");
        assert_eq!(error.to_string(), "server returned 500");

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(error.to_string(), "server returned 500");
    }

    #[test]
    fn document_round_trips_machines() -> Result<()> {
        let machines = vec![
            Machine::new("m-1", "web01", MachineStatus::Online, 0),
            Machine::new("m-2", "db01", MachineStatus::Pending, 9),
        ];
        let document = MachinesDocument::from_machines(&machines);
        assert_eq!(document.into_machines()?, machines);
        Ok(())
    }

    #[test]
    fn load_machines_file_rejects_unknown_status() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("machines.json");
        fs::write(
            &path,
            r#"{"machines":[
                {"id":"a","name":"ok","status":"online","last_seen":1},
                {"id":"b","name":"bad","status":"rebooting","last_seen":2}
            ]}"#,
        )?;

        let error = load_machines_file(&path).expect_err("unknown status should fail the load");
        let message = format!("{error:#}");
        assert!(message.contains("machines.json"));
        assert!(message.contains("machine record 1"));
        assert!(message.contains("unknown status"));
        Ok(())
    }

    #[test]
    fn load_machines_file_rejects_repeated_id() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("machines.json");
        fs::write(
            &path,
            r#"{"machines":[
                {"id":"dup","name":"web01","status":"online","last_seen":0},
                {"id":"other","name":"web02","status":"offline","last_seen":4},
                {"id":"dup","name":"web03","status":"pending","last_seen":1}
            ]}"#,
        )?;

        let error = load_machines_file(&path).expect_err("repeated id should fail the load");
        let message = format!("{error:#}");
        assert!(message.contains("machines.json"));
        assert!(message.contains("machine record 2 repeats id dup"));
        Ok(())
    }

    #[test]
    fn document_with_repeated_id_is_rejected() {
        let document = MachinesDocument {
            machines: vec![
                Machine::new("dup", "alpha", MachineStatus::Online, 0).to_record(),
                Machine::new("dup", "alpha", MachineStatus::Online, 0).to_record(),
            ],
        };
        let error = document
            .into_machines()
            .expect_err("two rows with one id should fail");
        assert_eq!(error.to_string(), "machine record 1 repeats id dup");
    }

    #[test]
    fn load_machines_file_reports_missing_path() {
        let error = load_machines_file(std::path::Path::new("/nonexistent/nodedash/machines.json"))
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("read machines file"));
    }

    #[test]
    fn load_machines_file_reports_malformed_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("machines.json");
        fs::write(&path, "[1, 2, 3]")?;
        let error = load_machines_file(&path).expect_err("wrong shape should fail");
        assert!(error.to_string().contains("expected {\"machines\": [...]}"));
        Ok(())
    }
}
