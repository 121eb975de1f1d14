// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_FLAKE_ATTR: &str = "default";

/// Parameters carried by a join link: which flake to join and which
/// attribute of it. Neither value is validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinParams {
    pub flake_url: String,
    pub flake_attr: String,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            flake_url: String::new(),
            flake_attr: DEFAULT_FLAKE_ATTR.to_owned(),
        }
    }
}

impl JoinParams {
    /// Reads `flake` and `attr` from a raw query string. A leading `?` is
    /// ignored and the first occurrence of each key wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut flake = None;
        let mut attr = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "flake" if flake.is_none() => flake = Some(value.into_owned()),
                "attr" if attr.is_none() => attr = Some(value.into_owned()),
                _ => {}
            }
        }
        Self::new(flake.unwrap_or_default(), attr.unwrap_or_default())
    }

    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("parse join url {raw:?}"))?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    pub fn new(flake_url: impl Into<String>, flake_attr: impl Into<String>) -> Self {
        let flake_attr = flake_attr.into();
        Self {
            flake_url: flake_url.into(),
            flake_attr: if flake_attr.trim().is_empty() {
                DEFAULT_FLAKE_ATTR.to_owned()
            } else {
                flake_attr
            },
        }
    }

    pub fn needs_flake_input(&self) -> bool {
        self.flake_url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_FLAKE_ATTR, JoinParams};
    use anyhow::Result;

    #[test]
    fn empty_query_uses_defaults() {
        let params = JoinParams::from_query("");
        assert_eq!(params, JoinParams::default());
        assert_eq!(params.flake_attr, DEFAULT_FLAKE_ATTR);
        assert!(params.needs_flake_input());
    }

    #[test]
    fn query_values_are_decoded() {
        let params =
            JoinParams::from_query("?flake=git%2Bhttps%3A%2F%2Fgit.example%2Fclan&attr=prod");
        assert_eq!(params.flake_url, "git+https://git.example/clan");
        assert_eq!(params.flake_attr, "prod");
        assert!(!params.needs_flake_input());
    }

    #[test]
    fn first_occurrence_wins_and_blank_attr_defaults() {
        let params = JoinParams::from_query("flake=a&flake=b&attr=");
        assert_eq!(params.flake_url, "a");
        assert_eq!(params.flake_attr, DEFAULT_FLAKE_ATTR);
    }

    #[test]
    fn from_url_reads_query() -> Result<()> {
        let params =
            JoinParams::from_url("http://localhost:2979/join?attr=lab&flake=github:acme/infra")?;
        assert_eq!(params, JoinParams::new("github:acme/infra", "lab"));
        Ok(())
    }

    #[test]
    fn from_url_rejects_garbage() {
        let error = JoinParams::from_url("not a url").expect_err("relative text should fail");
        assert!(error.to_string().contains("parse join url"));
    }
}
