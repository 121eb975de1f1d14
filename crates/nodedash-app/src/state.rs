// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{
    Machine, MachineId, PageSize, SortKey, SortState, ViewQuery, ViewResult, compute,
    filter_rows, page_count, toggle_selection,
};

/// Per-session table state. Rows are not owned here; every command that
/// depends on them receives the current list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    pub sort: SortState,
    pub page: usize,
    pub page_size: PageSize,
    pub filter: String,
    pub selected: Option<MachineId>,
    pub expanded: BTreeSet<MachineId>,
    pub status_line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    RequestSort(SortKey),
    SetPage(usize),
    NextPage,
    PrevPage,
    SetPageSize(PageSize),
    CyclePageSize,
    SetFilter(String),
    ClickRow(MachineId),
    ClearSelection,
    ToggleExpanded(MachineId),
    RowsReplaced,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    SortChanged(SortState),
    PageChanged(usize),
    PageSizeChanged(PageSize),
    FilterChanged(String),
    SelectionChanged(Option<MachineId>),
    ExpansionChanged { id: MachineId, expanded: bool },
    StatusUpdated(String),
    StatusCleared,
}

impl DashboardState {
    pub fn with_sort(sort: SortState, page_size: PageSize) -> Self {
        Self {
            sort,
            page_size,
            ..Self::default()
        }
    }

    pub fn query(&self) -> ViewQuery {
        ViewQuery {
            filter: self.filter.clone(),
            sort: self.sort,
            page: self.page,
            page_size: self.page_size.get(),
        }
    }

    pub fn view(&self, rows: &[Machine]) -> ViewResult {
        compute(rows, &self.query())
    }

    pub fn is_expanded(&self, id: &MachineId) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_selected(&self, id: &MachineId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn dispatch(&mut self, command: DashboardCommand, rows: &[Machine]) -> Vec<DashboardEvent> {
        match command {
            DashboardCommand::RequestSort(key) => {
                self.sort = self.sort.requested(key);
                let label = format!("sort {} {}", key.as_str(), self.sort.direction.as_str());
                vec![DashboardEvent::SortChanged(self.sort), self.set_status(&label)]
            }
            DashboardCommand::SetPage(index) => {
                let last = self.page_count(rows) - 1;
                self.change_page(index.min(last), rows)
            }
            DashboardCommand::NextPage => {
                if self.page + 1 >= self.page_count(rows) {
                    return vec![self.set_status("last page")];
                }
                self.change_page(self.page + 1, rows)
            }
            DashboardCommand::PrevPage => {
                if self.page == 0 {
                    return vec![self.set_status("first page")];
                }
                self.change_page(self.page - 1, rows)
            }
            DashboardCommand::SetPageSize(size) => self.change_page_size(size),
            DashboardCommand::CyclePageSize => self.change_page_size(self.page_size.next()),
            DashboardCommand::SetFilter(query) => {
                let query = query.trim().to_owned();
                self.filter = query.clone();
                let mut events = vec![DashboardEvent::FilterChanged(query.clone())];
                events.extend(self.reset_page_if_out_of_range(rows));
                let label = if query.is_empty() {
                    "filter cleared".to_owned()
                } else {
                    let matches = filter_rows(rows, &query).len();
                    format!("filter {query:?}: {matches} matching")
                };
                events.push(self.set_status(&label));
                events
            }
            DashboardCommand::ClickRow(id) => {
                self.selected = toggle_selection(self.selected.as_ref(), &id);
                let label = match &self.selected {
                    Some(selected) => format!("{selected} selected"),
                    None => "selection cleared".to_owned(),
                };
                vec![
                    DashboardEvent::SelectionChanged(self.selected.clone()),
                    self.set_status(&label),
                ]
            }
            DashboardCommand::ClearSelection => {
                if self.selected.take().is_none() {
                    return Vec::new();
                }
                vec![
                    DashboardEvent::SelectionChanged(None),
                    self.set_status("selection cleared"),
                ]
            }
            DashboardCommand::ToggleExpanded(id) => {
                let expanded = if self.expanded.remove(&id) {
                    false
                } else {
                    self.expanded.insert(id.clone());
                    true
                };
                vec![DashboardEvent::ExpansionChanged { id, expanded }]
            }
            DashboardCommand::RowsReplaced => self.reconcile_rows(rows),
            DashboardCommand::SetStatus(message) => vec![self.set_status(&message)],
            DashboardCommand::ClearStatus => {
                self.status_line = None;
                vec![DashboardEvent::StatusCleared]
            }
        }
    }

    fn page_count(&self, rows: &[Machine]) -> usize {
        let filtered = filter_rows(rows, &self.filter).len();
        page_count(filtered, self.page_size.get())
    }

    fn change_page(&mut self, page: usize, rows: &[Machine]) -> Vec<DashboardEvent> {
        self.page = page;
        let label = format!("page {} of {}", page + 1, self.page_count(rows));
        vec![DashboardEvent::PageChanged(page), self.set_status(&label)]
    }

    fn change_page_size(&mut self, size: PageSize) -> Vec<DashboardEvent> {
        self.page_size = size;
        self.page = 0;
        let label = format!("rows per page: {}", size.get());
        vec![
            DashboardEvent::PageSizeChanged(size),
            DashboardEvent::PageChanged(0),
            self.set_status(&label),
        ]
    }

    /// Back to the first page once the filtered rows no longer reach the
    /// current page's start offset.
    fn reset_page_if_out_of_range(&mut self, rows: &[Machine]) -> Option<DashboardEvent> {
        if self.page == 0 {
            return None;
        }
        let filtered = filter_rows(rows, &self.filter).len();
        if self.page * self.page_size.get() < filtered {
            return None;
        }
        self.page = 0;
        Some(DashboardEvent::PageChanged(0))
    }

    fn reconcile_rows(&mut self, rows: &[Machine]) -> Vec<DashboardEvent> {
        let present = rows.iter().map(|row| &row.id).collect::<BTreeSet<_>>();
        let mut events = Vec::new();

        if self
            .selected
            .as_ref()
            .is_some_and(|selected| !present.contains(selected))
        {
            self.selected = None;
            events.push(DashboardEvent::SelectionChanged(None));
        }

        let stale = self
            .expanded
            .iter()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect::<Vec<_>>();
        for id in stale {
            self.expanded.remove(&id);
            events.push(DashboardEvent::ExpansionChanged {
                id,
                expanded: false,
            });
        }

        events.extend(self.reset_page_if_out_of_range(rows));
        events
    }

    fn set_status(&mut self, message: &str) -> DashboardEvent {
        self.status_line = Some(message.to_owned());
        DashboardEvent::StatusUpdated(message.to_owned())
    }
}
