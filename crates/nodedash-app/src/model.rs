// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::ids::MachineId;

/// Declaration order is the sort order for [`SortKey::Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Online,
    Offline,
    Pending,
}

impl MachineStatus {
    pub const ALL: [Self; 3] = [Self::Online, Self::Offline, Self::Pending];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Pending => "pending",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Pending => "Pending",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Built from a [`MachineRecord`] via [`Machine::from_record`]; there is no
/// direct deserialization path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    pub status: MachineStatus,
    /// Days since the machine was last seen.
    pub last_seen: u32,
}

/// Wire shape of a machine as reported by a data source, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub last_seen: i64,
}

impl Machine {
    pub fn new(
        id: impl Into<MachineId>,
        name: impl Into<String>,
        status: MachineStatus,
        last_seen: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            last_seen,
        }
    }

    pub fn from_record(record: MachineRecord) -> Result<Self> {
        if record.id.trim().is_empty() {
            bail!("machine {:?} has an empty id", record.name);
        }
        let status = MachineStatus::parse(&record.status).ok_or_else(|| {
            anyhow!(
                "machine {} has unknown status {:?}; expected online, offline, or pending",
                record.id,
                record.status
            )
        })?;
        let last_seen = u32::try_from(record.last_seen).map_err(|_| {
            anyhow!(
                "machine {} has invalid last_seen {}; expected a non-negative day count",
                record.id,
                record.last_seen
            )
        })?;

        Ok(Self {
            id: MachineId::new(record.id),
            name: record.name,
            status,
            last_seen,
        })
    }

    pub fn to_record(&self) -> MachineRecord {
        MachineRecord {
            id: self.id.as_str().to_owned(),
            name: self.name.clone(),
            status: self.status.as_str().to_owned(),
            last_seen: i64::from(self.last_seen),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Status,
    LastSeen,
}

impl SortKey {
    pub const ALL: [Self; 3] = [Self::Name, Self::Status, Self::LastSeen];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Status => "status",
            Self::LastSeen => "last_seen",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "DISPLAY NAME & ID",
            Self::Status => "STATUS",
            Self::LastSeen => "LAST SEEN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "status" => Some(Self::Status),
            "last_seen" => Some(Self::LastSeen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Header-click transition: the active ascending column flips to
    /// descending, anything else starts over ascending on `key`.
    pub fn requested(self, key: SortKey) -> Self {
        let direction = match (self.key == key, self.direction) {
            (true, SortDirection::Asc) => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Self { key, direction }
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortKey::Status, SortDirection::Asc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    TwentyFive,
}

impl PageSize {
    pub const ALL: [Self; 3] = [Self::Five, Self::Ten, Self::TwentyFive];

    pub const fn get(self) -> usize {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::TwentyFive => 25,
        }
    }

    pub fn parse(value: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.get() == value)
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Five => Self::Ten,
            Self::Ten => Self::TwentyFive,
            Self::TwentyFive => Self::Five,
        }
    }
}
