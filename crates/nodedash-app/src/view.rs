// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Pure table view-model: filter, sort, paginate, and tally a machine list.
//!
//! Nothing here holds state between calls. The same rows and query always
//! produce an equal [`ViewResult`], so callers recompute whenever any input
//! changes.

use std::cmp::Ordering;

use crate::{Machine, MachineId, MachineStatus, SortDirection, SortKey, SortState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: String,
    pub sort: SortState,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewResult {
    pub visible_rows: Vec<Machine>,
    pub filtered_count: usize,
    pub status_counts: StatusCounts,
    pub padding_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub online: usize,
    pub offline: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCard {
    pub label: &'static str,
    pub value: usize,
    /// `None` for the trailing total card.
    pub status: Option<MachineStatus>,
}

impl StatusCounts {
    pub const fn get(&self, status: MachineStatus) -> usize {
        match status {
            MachineStatus::Online => self.online,
            MachineStatus::Offline => self.offline,
            MachineStatus::Pending => self.pending,
        }
    }

    pub const fn total(&self) -> usize {
        self.online + self.offline + self.pending
    }

    fn record(&mut self, status: MachineStatus) {
        match status {
            MachineStatus::Online => self.online += 1,
            MachineStatus::Offline => self.offline += 1,
            MachineStatus::Pending => self.pending += 1,
        }
    }

    /// Cards for the summary panel: each status with a non-zero count in
    /// declaration order, then a total over those cards.
    pub fn summary(&self) -> Vec<SummaryCard> {
        let mut cards = MachineStatus::ALL
            .into_iter()
            .filter(|status| self.get(*status) > 0)
            .map(|status| SummaryCard {
                label: status.label(),
                value: self.get(status),
                status: Some(status),
            })
            .collect::<Vec<_>>();
        let total = cards.iter().map(|card| card.value).sum();
        cards.push(SummaryCard {
            label: "Total",
            value: total,
            status: None,
        });
        cards
    }
}

pub fn compare(
    left: &Machine,
    right: &Machine,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let ascending = match key {
        SortKey::Name => left.name.cmp(&right.name),
        SortKey::Status => left.status.cmp(&right.status),
        SortKey::LastSeen => left.last_seen.cmp(&right.last_seen),
    };
    match direction {
        SortDirection::Asc => ascending,
        // `reverse` keeps `Equal` as `Equal`.
        SortDirection::Desc => ascending.reverse(),
    }
}

pub fn comparator(
    key: SortKey,
    direction: SortDirection,
) -> impl Fn(&Machine, &Machine) -> Ordering {
    move |left, right| compare(left, right, key, direction)
}

/// Sorts into a new vector. Ties fall back to input position, so the
/// output order is fully determined by the input order and `cmp`.
pub fn stable_sort<F>(rows: &[Machine], cmp: F) -> Vec<Machine>
where
    F: Fn(&Machine, &Machine) -> Ordering,
{
    let mut indexed = rows.iter().enumerate().collect::<Vec<_>>();
    indexed.sort_unstable_by(|(left_index, left), (right_index, right)| {
        cmp(left, right).then_with(|| left_index.cmp(right_index))
    });
    indexed.into_iter().map(|(_, row)| row.clone()).collect()
}

pub fn page_slice<T>(rows: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_mul(page_size);
    if start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(rows.len());
    &rows[start..end]
}

/// Blank rows needed to keep a trailing page as tall as a full one. The
/// first page is never padded.
pub fn padding_rows(row_count: usize, page: usize, page_size: usize) -> usize {
    if page == 0 {
        return 0;
    }
    page.saturating_add(1)
        .saturating_mul(page_size)
        .saturating_sub(row_count)
}

pub fn page_count(row_count: usize, page_size: usize) -> usize {
    row_count.div_ceil(page_size.max(1)).max(1)
}

pub fn matches_query(machine: &Machine, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || contains_needle(machine, &needle)
}

fn contains_needle(machine: &Machine, needle: &str) -> bool {
    machine.name.to_lowercase().contains(needle)
        || machine.id.as_str().to_lowercase().contains(needle)
}

pub fn filter_rows(rows: &[Machine], query: &str) -> Vec<Machine> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|machine| contains_needle(machine, &needle))
        .cloned()
        .collect()
}

pub fn aggregate(rows: &[Machine]) -> StatusCounts {
    rows.iter().fold(StatusCounts::default(), |mut counts, row| {
        counts.record(row.status);
        counts
    })
}

pub fn toggle_selection(current: Option<&MachineId>, clicked: &MachineId) -> Option<MachineId> {
    if current == Some(clicked) {
        None
    } else {
        Some(clicked.clone())
    }
}

pub fn compute(rows: &[Machine], query: &ViewQuery) -> ViewResult {
    let filtered = filter_rows(rows, &query.filter);
    let status_counts = aggregate(&filtered);
    let sorted = stable_sort(
        &filtered,
        comparator(query.sort.key, query.sort.direction),
    );
    let visible_rows = page_slice(&sorted, query.page, query.page_size).to_vec();

    ViewResult {
        padding_rows: padding_rows(sorted.len(), query.page, query.page_size),
        filtered_count: sorted.len(),
        status_counts,
        visible_rows,
    }
}
