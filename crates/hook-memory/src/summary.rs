//! Workspace and session summary views.

use crate::client::MemoryService;
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::identity::Identity;
use crate::schema::{CreateSummaryView, SummaryView};
use serde_json::{Map, Value};

/// Which summary a view produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryScope {
    /// All sessions of a workspace, grouped by namespace
    Workspace,
    /// One session, grouped by namespace and session id
    Session,
}

impl SummaryScope {
    pub fn group_by(self) -> &'static [&'static str] {
        match self {
            Self::Workspace => &["namespace"],
            Self::Session => &["namespace", "session_id"],
        }
    }

    /// Whether configuration asks for this summary.
    pub fn enabled(self, config: &MemoryConfig) -> bool {
        match self {
            Self::Workspace => config.create_workspace_summary,
            Self::Session => config.create_session_summary,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Session => "session",
        }
    }
}

/// A view bound to the concrete group of the current identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTarget {
    pub scope: SummaryScope,
    pub view_name: String,
    pub group: Map<String, Value>,
}

impl SummaryTarget {
    /// Target for `scope`, or `None` when there is no workspace to name the
    /// view after.
    pub fn for_identity(scope: SummaryScope, identity: &Identity) -> Option<Self> {
        let workspace = identity.workspace.as_ref()?;

        let mut group = Map::new();
        group.insert(
            "namespace".to_string(),
            Value::String(identity.namespace.to_string()),
        );

        let view_name = match scope {
            SummaryScope::Workspace => workspace.workspace_view_name(),
            SummaryScope::Session => {
                group.insert(
                    "session_id".to_string(),
                    Value::String(identity.session.to_string()),
                );
                workspace.session_view_name(&identity.session)
            }
        };

        Some(Self {
            scope,
            view_name,
            group,
        })
    }

    /// Targets enabled by configuration, workspace first.
    pub fn enabled(identity: &Identity, config: &MemoryConfig) -> Vec<Self> {
        [SummaryScope::Workspace, SummaryScope::Session]
            .into_iter()
            .filter(|scope| scope.enabled(config))
            .filter_map(|scope| Self::for_identity(scope, identity))
            .collect()
    }

    /// Id of the view, creating it when no view of that name exists.
    ///
    /// An existing view is reused even when its time window differs from the
    /// configured one; the difference is logged.
    pub fn ensure_view(
        &self,
        service: &dyn MemoryService,
        config: &MemoryConfig,
    ) -> Result<String> {
        let views = service.list_summary_views()?;
        if let Some(view) = views
            .into_iter()
            .find(|v| v.name.as_deref() == Some(self.view_name.as_str()))
        {
            if let Some(days) = stale_window(&view, config) {
                tracing::warn!(
                    view = %self.view_name,
                    view_days = days,
                    configured_days = config.summary_time_window_days,
                    "summary view uses a different time window"
                );
            }
            tracing::debug!(view = %self.view_name, id = %view.id, "summary view exists");
            return Ok(view.id);
        }

        tracing::info!(view = %self.view_name, "creating summary view");
        let created = service.create_summary_view(&CreateSummaryView {
            name: self.view_name.clone(),
            source: "long_term".to_string(),
            group_by: self.scope.group_by().iter().map(|f| f.to_string()).collect(),
            time_window_days: Some(config.summary_time_window_days),
        })?;
        Ok(created.id)
    }

    /// Summary text for this target's group, `None` when blank.
    pub fn fetch(
        &self,
        service: &dyn MemoryService,
        config: &MemoryConfig,
    ) -> Result<Option<String>> {
        let view_id = self.ensure_view(service, config)?;
        let partition = service.run_summary_partition(&view_id, &self.group)?;
        tracing::debug!(
            view = %self.view_name,
            memories = partition.memory_count,
            "summary partition computed"
        );
        Ok(partition.summary.filter(|s| !s.trim().is_empty()))
    }

    /// Request an asynchronous refresh of the view.
    pub fn refresh(&self, service: &dyn MemoryService, config: &MemoryConfig) -> Result<String> {
        let view_id = self.ensure_view(service, config)?;
        let task = service.run_summary_view(&view_id)?;
        tracing::info!(view = %self.view_name, task = %task.id, "summary refresh started");
        Ok(task.id)
    }
}

/// The view's time window when it disagrees with the configured one.
pub fn stale_window(view: &SummaryView, config: &MemoryConfig) -> Option<u32> {
    view.time_window_days
        .filter(|&days| days != config.summary_time_window_days)
}
