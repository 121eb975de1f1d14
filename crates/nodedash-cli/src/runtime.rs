// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use nodedash_app::Machine;
use nodedash_source::{Client, load_machines_file};
use nodedash_testkit::FleetFaker;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEMO_SEED: u64 = 2979;
pub const DEMO_FLEET_SIZE: usize = 37;

/// Row source selected at startup.
#[derive(Debug, Clone)]
pub enum SourceRuntime {
    Http(Client),
    File(PathBuf),
    Demo { seed: u64, count: usize },
}

impl SourceRuntime {
    pub fn demo() -> Self {
        Self::Demo {
            seed: DEMO_SEED,
            count: DEMO_FLEET_SIZE,
        }
    }

    /// Startup check used by `--check`: the source must answer and every
    /// record must convert. Returns the machine count.
    pub fn probe(&mut self) -> Result<usize> {
        if let Self::Http(client) = self {
            client
                .health()
                .with_context(|| format!("health check {}/health", client.base_url()))?;
        }
        let machines = nodedash_tui::DashboardRuntime::load_machines(self)?;
        Ok(machines.len())
    }
}

impl nodedash_tui::DashboardRuntime for SourceRuntime {
    fn load_machines(&mut self) -> Result<Vec<Machine>> {
        debug!(source = %self.source_label(), "loading machines");
        match self {
            Self::Http(client) => client.list_machines(),
            Self::File(path) => load_machines_file(path),
            Self::Demo { seed, count } => {
                let machines = FleetFaker::new(*seed).fleet(*count);
                info!(seed = *seed, count = machines.len(), "generated demo fleet");
                Ok(machines)
            }
        }
    }

    fn source_label(&self) -> String {
        match self {
            Self::Http(client) => client.base_url().to_owned(),
            Self::File(path) => format!("file {}", path.display()),
            Self::Demo { seed, .. } => format!("demo fleet (seed {seed})"),
        }
    }
}
