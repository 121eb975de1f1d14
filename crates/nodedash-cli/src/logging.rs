// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NODEDASH_LOG";

/// Routes tracing output to `file`. The terminal belongs to the dashboard,
/// so nothing is written to stdout or stderr.
pub fn init(level: &str, file: &Path) -> Result<()> {
    if let Some(parent) = file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let writer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("open log file {}", file.display()))?;

    let filter = build_filter(level, env::var(LOG_ENV).ok().as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(writer))
        .try_init()
        .map_err(|error| anyhow!("initialize logging: {error}"))
}

fn build_filter(config_level: &str, env_override: Option<&str>) -> Result<EnvFilter> {
    let directive = env_override
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(config_level);
    EnvFilter::try_new(directive).with_context(|| {
        format!("invalid log filter {directive:?}; use a level such as info or debug")
    })
}
