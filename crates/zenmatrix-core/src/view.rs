use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SORT: &str = "createdAt_desc";
pub const DEFAULT_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    List,
    Matrix,
}

/// Tri-state completion filter: the "all" state omits the parameter
/// entirely instead of sending a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletedFilter {
    All,
    Completed,
    NotCompleted,
}

impl CompletedFilter {
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Completed => Some("true"),
            Self::NotCompleted => Some("false"),
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "true" => Ok(Self::Completed),
            "false" => Ok(Self::NotCompleted),
            other => Err(anyhow!("completed filter must be true, false, or all, got: {other}")),
        }
    }
}

/// Everything that shapes one tasks query: search text, the three field
/// filters, the sort selection, paging, and which view is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub search: String,
    pub priority: String,
    pub completed: CompletedFilter,
    pub project: String,
    pub sort_by: String,
    pub page: u32,
    pub limit: u32,
    pub mode: ViewMode,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            priority: String::new(),
            completed: CompletedFilter::All,
            project: String::new(),
            sort_by: DEFAULT_SORT.to_string(),
            page: 1,
            limit: DEFAULT_LIMIT,
            mode: ViewMode::List,
        }
    }
}

impl ViewState {
    /// A fetch-everything query: no filters, no paging. Used when a single
    /// task has to be located client-side (the API has no by-id GET).
    pub fn unpaginated() -> Self {
        Self {
            mode: ViewMode::Matrix,
            ..Self::default()
        }
    }

    /// Reset filters, sort and page to their defaults. Page size and the
    /// active view survive a clear.
    pub fn clear_filters(&mut self) {
        let limit = self.limit;
        let mode = self.mode;
        *self = Self {
            limit,
            mode,
            ..Self::default()
        };
    }

    /// Derive the query pairs for `GET /api/tasks`. A pair is emitted only
    /// when its source field actually selects something; `page`/`limit`
    /// only apply to the paginated list view. Never fails: an empty state
    /// in matrix mode yields an empty set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        if !self.priority.is_empty() {
            pairs.push(("priority", self.priority.clone()));
        }
        if let Some(value) = self.completed.as_param() {
            pairs.push(("isCompleted", value.to_string()));
        }
        if !self.project.is_empty() {
            pairs.push(("proyecto", self.project.clone()));
        }
        if !self.sort_by.is_empty() {
            match self.sort_by.split_once('_') {
                Some((field, direction)) => {
                    pairs.push(("sortBy", field.to_string()));
                    pairs.push(("sortDirection", direction.to_string()));
                }
                None => pairs.push(("sortBy", self.sort_by.clone())),
            }
        }
        if self.mode == ViewMode::List {
            pairs.push(("page", self.page.to_string()));
            pairs.push(("limit", self.limit.to_string()));
        }

        pairs
    }
}

/// Fold command-line tokens into the view-state. `key:value` tokens drive
/// individual fields; bare words (and unknown keys) accumulate into the
/// search text, replacing it when any are present.
pub fn apply_tokens(view: &mut ViewState, tokens: &[String]) -> anyhow::Result<()> {
    let mut search_terms: Vec<&str> = Vec::new();

    for token in tokens {
        if let Some((key, value)) = token.split_once(':') {
            match key.to_ascii_lowercase().as_str() {
                "search" => {
                    view.search = value.trim().to_string();
                    continue;
                }
                "project" | "proyecto" => {
                    view.project = value.trim().to_string();
                    continue;
                }
                "priority" | "pri" | "prioridad" => {
                    view.priority = value.trim().to_string();
                    continue;
                }
                "completed" => {
                    view.completed = CompletedFilter::parse(value)?;
                    continue;
                }
                "sort" => {
                    view.sort_by = parse_sort_token(value)?;
                    continue;
                }
                "page" => {
                    view.page = parse_positive(value, "page")?;
                    continue;
                }
                "limit" => {
                    view.limit = parse_positive(value, "limit")?;
                    view.page = 1;
                    continue;
                }
                _ => {}
            }
        }
        search_terms.push(token);
    }

    if !search_terms.is_empty() {
        view.search = search_terms.join(" ");
    }

    debug!(?view, "view state after applying tokens");
    Ok(())
}

fn parse_positive(value: &str, what: &str) -> anyhow::Result<u32> {
    let parsed: u32 = value
        .parse()
        .with_context(|| format!("{what} must be a number, got: {value}"))?;
    if parsed == 0 {
        bail!("{what} must be at least 1");
    }
    Ok(parsed)
}

/// Sort tokens look like `createdAt_desc`: a field name, an underscore,
/// and a direction. The field is passed through to the server as-is.
fn parse_sort_token(value: &str) -> anyhow::Result<String> {
    let Some((field, direction)) = value.split_once('_') else {
        bail!("sort must look like field_asc or field_desc, got: {value}");
    };
    if field.is_empty() {
        bail!("sort is missing a field name: {value}");
    }
    if direction != "asc" && direction != "desc" {
        bail!("sort direction must be asc or desc, got: {direction}");
    }
    Ok(value.to_string())
}
