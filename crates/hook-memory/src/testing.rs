//! In-memory `MemoryService` for tests.

use crate::client::MemoryService;
use crate::error::{MemoryError, Result};
use crate::schema::{
    CreateSummaryView, MemoryHit, SearchRequest, SummaryPartition, SummaryView, TaskRef,
    WorkingMemory,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct FakeService {
    down: bool,
    hits: Vec<MemoryHit>,
    summaries: HashMap<String, String>,
    views: RefCell<Vec<SummaryView>>,
    created: RefCell<Vec<CreateSummaryView>>,
    searches: RefCell<Vec<SearchRequest>>,
    partitions: RefCell<Vec<(String, Map<String, Value>)>>,
    refreshed: RefCell<Vec<String>>,
    working: RefCell<HashMap<String, WorkingMemory>>,
    puts: RefCell<usize>,
    racing_writes: RefCell<VecDeque<WorkingMemory>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service every call to which fails.
    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    pub fn with_hits(mut self, scores: &[f64]) -> Self {
        self.hits = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| MemoryHit {
                text: format!("memory {i} ({score})"),
                score,
                created_at: None,
            })
            .collect();
        self
    }

    pub fn with_hit(mut self, text: &str, score: f64) -> Self {
        self.hits.push(MemoryHit {
            text: text.to_string(),
            score,
            created_at: None,
        });
        self
    }

    pub fn with_hit_at(mut self, text: &str, score: f64, created_at: DateTime<Utc>) -> Self {
        self.hits.push(MemoryHit {
            text: text.to_string(),
            score,
            created_at: Some(created_at),
        });
        self
    }

    pub fn with_view(self, view: SummaryView) -> Self {
        self.views.borrow_mut().push(view);
        self
    }

    pub fn with_summary(mut self, view_name: &str, summary: &str) -> Self {
        self.summaries
            .insert(view_name.to_string(), summary.to_string());
        self
    }

    pub fn with_working_memory(self, memory: WorkingMemory) -> Self {
        self.working
            .borrow_mut()
            .insert(memory.session_id.clone(), memory);
        self
    }

    /// After the next write, replace the session with `memory`, as a
    /// concurrent writer holding an older snapshot would.
    pub fn with_racing_write(self, memory: WorkingMemory) -> Self {
        self.racing_writes.borrow_mut().push_back(memory);
        self
    }

    pub fn created_views(&self) -> Vec<CreateSummaryView> {
        self.created.borrow().clone()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.borrow().clone()
    }

    pub fn partitions(&self) -> Vec<(String, Map<String, Value>)> {
        self.partitions.borrow().clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed.borrow().clone()
    }

    pub fn working_memory(&self, session_id: &str) -> Option<WorkingMemory> {
        self.working.borrow().get(session_id).cloned()
    }

    pub fn put_count(&self) -> usize {
        *self.puts.borrow()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.down {
            Err(MemoryError::unavailable(operation, "connection refused"))
        } else {
            Ok(())
        }
    }
}

impl MemoryService for FakeService {
    fn search_long_term(&self, request: &SearchRequest) -> Result<Vec<MemoryHit>> {
        self.check("search")?;
        self.searches.borrow_mut().push(request.clone());
        // Unfiltered on purpose: the client must enforce score and limit.
        Ok(self.hits.clone())
    }

    fn get_working_memory(
        &self,
        session_id: &str,
        _namespace: Option<&str>,
        _user_id: Option<&str>,
    ) -> Result<Option<WorkingMemory>> {
        self.check("get working memory")?;
        Ok(self.working.borrow().get(session_id).cloned())
    }

    fn put_working_memory(&self, memory: &WorkingMemory) -> Result<()> {
        self.check("put working memory")?;
        *self.puts.borrow_mut() += 1;
        let stored = self
            .racing_writes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| memory.clone());
        self.working
            .borrow_mut()
            .insert(memory.session_id.clone(), stored);
        Ok(())
    }

    fn list_summary_views(&self) -> Result<Vec<SummaryView>> {
        self.check("list summary views")?;
        Ok(self.views.borrow().clone())
    }

    fn create_summary_view(&self, request: &CreateSummaryView) -> Result<SummaryView> {
        self.check("create summary view")?;
        let view = SummaryView {
            id: format!("view-{}", self.views.borrow().len() + 1),
            name: Some(request.name.clone()),
            time_window_days: request.time_window_days,
        };
        self.views.borrow_mut().push(view.clone());
        self.created.borrow_mut().push(request.clone());
        Ok(view)
    }

    fn run_summary_partition(
        &self,
        view_id: &str,
        group: &Map<String, Value>,
    ) -> Result<SummaryPartition> {
        self.check("run summary partition")?;
        self.partitions
            .borrow_mut()
            .push((view_id.to_string(), group.clone()));
        let name = self
            .views
            .borrow()
            .iter()
            .find(|v| v.id == view_id)
            .and_then(|v| v.name.clone())
            .unwrap_or_default();
        Ok(SummaryPartition {
            summary: self.summaries.get(&name).cloned(),
            memory_count: usize::from(self.summaries.contains_key(&name)),
        })
    }

    fn run_summary_view(&self, view_id: &str) -> Result<TaskRef> {
        self.check("run summary view")?;
        self.refreshed.borrow_mut().push(view_id.to_string());
        Ok(TaskRef {
            id: format!("task-{view_id}"),
        })
    }
}
