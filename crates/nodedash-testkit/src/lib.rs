// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use nodedash_app::{Machine, MachineId, MachineStatus};
use nodedash_source::MachinesDocument;
use std::fs;
use std::path::PathBuf;

const ROLES: [&str; 14] = [
    "web", "db", "cache", "build", "edge", "backup", "gateway", "monitor", "storage", "mail",
    "proxy", "runner", "media", "vpn",
];

const SITES: [&str; 8] = ["fra", "ams", "nyc", "sfo", "sin", "syd", "lon", "tor"];

/// Status weights out of 10: most of a fleet is online.
const STATUS_WEIGHTS: [(MachineStatus, usize); 3] = [
    (MachineStatus::Online, 6),
    (MachineStatus::Offline, 3),
    (MachineStatus::Pending, 1),
];

const MAX_LAST_SEEN_DAYS: usize = 90;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible machine fleets. Ids are unique per faker;
/// names may repeat.
#[derive(Debug, Clone)]
pub struct FleetFaker {
    rng: DeterministicRng,
    seed: u64,
    issued: usize,
}

impl FleetFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            issued: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn machine(&mut self) -> Machine {
        self.issued += 1;
        let site = self.pick(&SITES);
        let role = self.pick(&ROLES);
        let number = self.rng.int_n(4) + 1;
        let name = format!("{role}{number:02}.{site}");
        let id = MachineId::new(format!("{site}-{:04x}", self.issued));
        let status = self.status();
        let last_seen = match status {
            MachineStatus::Online => self.rng.int_n(2),
            MachineStatus::Offline | MachineStatus::Pending => {
                self.rng.int_n(MAX_LAST_SEEN_DAYS + 1)
            }
        };
        Machine::new(id, name, status, last_seen as u32)
    }

    pub fn fleet(&mut self, count: usize) -> Vec<Machine> {
        (0..count).map(|_| self.machine()).collect()
    }

    fn status(&mut self) -> MachineStatus {
        let total = STATUS_WEIGHTS.iter().map(|(_, weight)| weight).sum();
        let mut roll = self.rng.int_n(total);
        for (status, weight) in STATUS_WEIGHTS {
            if roll < weight {
                return status;
            }
            roll -= weight;
        }
        MachineStatus::Online
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Small fixed fleet with repeated statuses and distinct names.
pub fn reference_fleet() -> Vec<Machine> {
    vec![
        Machine::new("n1", "alpha", MachineStatus::Pending, 3),
        Machine::new("n2", "bravo", MachineStatus::Online, 2),
        Machine::new("n3", "charlie", MachineStatus::Online, 0),
        Machine::new("n4", "delta", MachineStatus::Pending, 9),
        Machine::new("n5", "echo", MachineStatus::Offline, 1),
        Machine::new("n6", "foxtrot", MachineStatus::Online, 1),
        Machine::new("n7", "golf", MachineStatus::Offline, 5),
    ]
}

/// Writes `machines` as a [`MachinesDocument`] in a fresh temp dir.
/// The dir must be kept alive for as long as the path is used.
pub fn write_machines_file(machines: &[Machine]) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("machines.json");
    let body = serde_json::to_string_pretty(&MachinesDocument::from_machines(machines))
        .context("encode machines")?;
    fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}
