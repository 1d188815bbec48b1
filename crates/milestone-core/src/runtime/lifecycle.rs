// crates/milestone-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Project Lifecycle Service
// Description: Idempotent, resumable project create and update orchestration.
// Purpose: Keep metadata, milestone cells, and the date index consistent.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! The metadata record of a project doubles as a request-scoped lock. Its
//! status moves `CREATING -> ACTIVE -> UPDATING -> ACTIVE`, and every move is
//! a compare-and-swap on `status` plus `lastRequestId`. A request that crashes
//! midway leaves its request id on the metadata; replaying the same id resumes
//! the work, while any other id is rejected as a conflict.
//!
//! Cell and date index writes are ordered so readers never see a milestone
//! cell without its mirror: date deletes, then cell deletes, then cell puts,
//! then date puts. Failures are not rolled back; replay is the recovery path.
//!
//! Security posture: every caller input is validated before the first store
//! access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Attributes;
use crate::core::DateError;
use crate::core::DateIndexEntry;
use crate::core::GridDocument;
use crate::core::GridError;
use crate::core::IdentifierError;
use crate::core::Item;
use crate::core::ItemKey;
use crate::core::MilestoneCell;
use crate::core::ProjectId;
use crate::core::ProjectMeta;
use crate::core::ProjectName;
use crate::core::ProjectStatus;
use crate::core::RecordError;
use crate::core::RequestId;
use crate::core::Timestamp;
use crate::core::grid::Grid;
use crate::core::grid_from_cells;
use crate::core::keys;
use crate::core::records::LAST_REQUEST_ID_ATTRIBUTE;
use crate::core::records::STATUS_ATTRIBUTE;
use crate::core::records::UPDATED_AT_ATTRIBUTE;
use crate::interfaces::Clock;
use crate::interfaces::Condition;
use crate::interfaces::KeyValueStore;
use crate::interfaces::QueryRequest;
use crate::interfaces::ReadConsistency;
use crate::interfaces::SortKeyCondition;
use crate::interfaces::StoreError;
use crate::interfaces::WriteRequest;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::LifecycleAuditEvent;
use crate::runtime::audit::LifecycleAuditEventParams;
use crate::runtime::audit::LifecycleOperation;
use crate::runtime::audit::LifecycleOutcome;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::WriteCounts;
use crate::runtime::batch::BatchWriteError;
use crate::runtime::batch::BatchWriter;
use crate::runtime::batch::Deadline;
use crate::runtime::diff::DiffTarget;
use crate::runtime::diff::GridDiff;
use crate::runtime::diff::diff_grid;
use crate::runtime::diff::diff_grid_resuming;
use crate::runtime::diff::materialize_grid;
use crate::runtime::system::SystemClock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Page size used when reading all cells of a project.
const CELL_PAGE_SIZE: usize = 100;
/// Page size used when scanning project metadata.
const META_PAGE_SIZE: usize = 100;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Conflict reasons surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Project already exists under another request.
    AlreadyExists,
    /// Project creation is still in flight.
    BeingCreated,
    /// Project is locked by an in-flight update.
    BeingUpdated,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AlreadyExists => "project already exists",
            Self::BeingCreated => "project is being created",
            Self::BeingUpdated => "project is locked for update",
        };
        f.write_str(label)
    }
}

/// Project service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    /// Caller input failed validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Project state conflicts with the request.
    #[error("conflict: {0}")]
    Conflict(ConflictKind),
    /// Project does not exist.
    #[error("project not found: {0}")]
    NotFound(String),
    /// Batch writer retry ceiling reached.
    #[error("storage exhausted after {attempts} retries with {unprocessed} unprocessed writes")]
    StorageExhausted {
        /// Retries performed.
        attempts: u32,
        /// Writes left unprocessed.
        unprocessed: usize,
    },
    /// Caller deadline reached during batch writes.
    #[error("deadline exceeded with {unprocessed} unprocessed writes")]
    DeadlineExceeded {
        /// Writes left unprocessed.
        unprocessed: usize,
    },
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProjectError {
    /// Returns true when the caller, not the service, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict(_) | Self::NotFound(_))
    }
}

impl From<BatchWriteError> for ProjectError {
    fn from(error: BatchWriteError) -> Self {
        match error {
            BatchWriteError::Exhausted {
                attempts,
                unprocessed,
            } => Self::StorageExhausted {
                attempts,
                unprocessed,
            },
            BatchWriteError::DeadlineExceeded {
                unprocessed,
            } => Self::DeadlineExceeded {
                unprocessed,
            },
            BatchWriteError::Store(error) => Self::Store(error),
        }
    }
}

impl From<RecordError> for ProjectError {
    fn from(error: RecordError) -> Self {
        Self::Store(StoreError::from(error))
    }
}

impl From<IdentifierError> for ProjectError {
    fn from(error: IdentifierError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl From<GridError> for ProjectError {
    fn from(error: GridError) -> Self {
        Self::Validation(error.to_string())
    }
}

impl From<DateError> for ProjectError {
    fn from(error: DateError) -> Self {
        Self::Validation(error.to_string())
    }
}

// ============================================================================
// SECTION: Requests and Views
// ============================================================================

/// Per-call context passed explicitly through every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationContext {
    /// Caller deadline bounding batch retries.
    pub deadline: Option<Deadline>,
}

impl OperationContext {
    /// Context bounded by a deadline.
    #[must_use]
    pub const fn with_deadline(deadline: Deadline) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }
}

/// Raw create request as received from a caller.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    /// Project identifier.
    pub project_id: String,
    /// Project name.
    pub project_name: String,
    /// Desired grid.
    pub grid: GridDocument,
    /// Idempotency key; must be a UUID.
    pub request_id: Option<String>,
}

/// Raw update request as received from a caller.
#[derive(Debug, Clone)]
pub struct UpdateProjectRequest {
    /// Project identifier.
    pub project_id: String,
    /// Desired grid.
    pub grid: GridDocument,
    /// Idempotency key; must be a UUID.
    pub request_id: Option<String>,
}

/// Full project view returned by reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Project name.
    pub project_name: ProjectName,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Last accepted idempotency key.
    pub last_request_id: RequestId,
    /// Last transition time.
    pub updated_at: Timestamp,
    /// Complete grid document.
    pub grid: GridDocument,
}

/// Project summary returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Project name.
    pub project_name: ProjectName,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Last transition time.
    pub updated_at: Timestamp,
}

impl From<ProjectMeta> for ProjectSummary {
    fn from(meta: ProjectMeta) -> Self {
        Self {
            project_id: meta.project_id,
            project_name: meta.project_name,
            status: meta.status,
            updated_at: meta.updated_at,
        }
    }
}

/// Outcome of a conditional metadata create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateClaim {
    /// This request created the metadata.
    Created,
    /// Metadata already existed; holds the current record.
    AlreadyExists(ProjectMeta),
    /// Metadata exists and is locked by an in-flight update.
    Locked(ProjectMeta),
}

/// Expected metadata state for a guarded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedState {
    /// Required current status.
    pub status: ProjectStatus,
    /// Required current request id.
    pub request_id: RequestId,
}

/// Create-specific decision given the current metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CreateDecision {
    /// Same request already completed.
    Replay,
    /// Same request was interrupted; finish it.
    Resume,
    /// Request conflicts with the current state.
    Reject(ConflictKind),
}

/// Result of a successful write operation before auditing.
struct Completed {
    /// Project view to return.
    view: ProjectView,
    /// Audit outcome.
    outcome: LifecycleOutcome,
    /// Writes issued.
    writes: WriteCounts,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Project lifecycle service over a key-value store.
pub struct ProjectService<S> {
    /// Backing store.
    store: S,
    /// Batch writer for cell and date index writes.
    writer: BatchWriter,
    /// Timestamp source.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Audit sink for lifecycle events.
    audit: Arc<dyn AuditSink>,
}

impl<S: KeyValueStore> ProjectService<S> {
    /// Creates a service with the system clock and no audit output.
    #[must_use]
    pub fn new(store: S, writer: BatchWriter) -> Self {
        Self {
            store,
            writer,
            clock: Arc::new(SystemClock),
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Creates a project, or replays or resumes a prior create with the same request id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] on invalid input, conflicts, or storage failure.
    pub fn create_project(
        &self,
        ctx: &OperationContext,
        request: &CreateProjectRequest,
    ) -> Result<ProjectView, ProjectError> {
        let result = self.create_inner(ctx, request);
        self.record(
            LifecycleOperation::Create,
            &request.project_id,
            request.request_id.as_deref(),
            result,
        )
    }

    /// Applies a desired grid to an active project, or replays or resumes a prior update.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] on invalid input, unknown projects, conflicts,
    /// or storage failure.
    pub fn update_project(
        &self,
        ctx: &OperationContext,
        request: &UpdateProjectRequest,
    ) -> Result<ProjectView, ProjectError> {
        let result = self.update_inner(ctx, request);
        self.record(
            LifecycleOperation::Update,
            &request.project_id,
            request.request_id.as_deref(),
            result,
        )
    }

    /// Returns a project with its complete grid, in any status.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotFound`] for unknown projects.
    pub fn get_project(&self, project_id: &str) -> Result<ProjectView, ProjectError> {
        let project_id = ProjectId::parse(project_id)?;
        let meta = self
            .load_meta(&project_id, ReadConsistency::Eventual)?
            .ok_or_else(|| ProjectError::NotFound(project_id.to_string()))?;
        self.view(meta)
    }

    /// Lists all projects ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Store`] when the scan fails.
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>, ProjectError> {
        let mut summaries = Vec::new();
        let mut start: Option<ItemKey> = None;
        loop {
            let page = self.store.scan_sort_key(keys::META_SORT_KEY, start.as_ref(), META_PAGE_SIZE)?;
            for item in &page.items {
                summaries.push(ProjectSummary::from(ProjectMeta::from_item(item)?));
            }
            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(summaries)
    }

    /// Moves the metadata to `next` if it still matches `expected`.
    ///
    /// Returns false when another writer changed the metadata first.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Store`] when the conditional write fails.
    pub fn try_transition(
        &self,
        project_id: &ProjectId,
        expected: &ExpectedState,
        next: ProjectStatus,
        request_id: &RequestId,
    ) -> Result<bool, ProjectError> {
        let mut attributes = Attributes::new();
        attributes.insert(STATUS_ATTRIBUTE.to_string(), Value::from(next.as_str()));
        attributes.insert(LAST_REQUEST_ID_ATTRIBUTE.to_string(), Value::from(request_id.as_str()));
        attributes.insert(
            UPDATED_AT_ATTRIBUTE.to_string(),
            Value::from(self.clock.now().as_unix_millis()),
        );
        let condition = Condition::All(vec![
            Condition::equals(STATUS_ATTRIBUTE, expected.status.as_str()),
            Condition::equals(LAST_REQUEST_ID_ATTRIBUTE, expected.request_id.as_str()),
        ]);
        let outcome =
            self.store.update_item(&ProjectMeta::key_for(project_id), &attributes, &condition)?;
        Ok(outcome.is_applied())
    }

    /// Conditionally creates the metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Store`] when the write or the follow-up read fails.
    pub fn claim_create(&self, meta: &ProjectMeta) -> Result<CreateClaim, ProjectError> {
        if self.store.put_item(&meta.to_item()?, &Condition::NotExists)?.is_applied() {
            return Ok(CreateClaim::Created);
        }
        let winner = self.load_meta(&meta.project_id, ReadConsistency::Strong)?.ok_or_else(|| {
            StoreError::Store(format!("metadata for {} vanished after create race", meta.project_id))
        })?;
        if winner.status == ProjectStatus::Updating {
            Ok(CreateClaim::Locked(winner))
        } else {
            Ok(CreateClaim::AlreadyExists(winner))
        }
    }

    // ------------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------------

    /// Create flow without auditing.
    fn create_inner(
        &self,
        ctx: &OperationContext,
        request: &CreateProjectRequest,
    ) -> Result<Completed, ProjectError> {
        let request_id = RequestId::require(request.request_id.as_deref())?;
        let project_id = ProjectId::parse(request.project_id.as_str())?;
        let project_name = ProjectName::parse(request.project_name.as_str())?;
        let grid = Grid::from_document(&request.grid)?;

        let existing = self.load_meta(&project_id, ReadConsistency::Strong)?;
        let current = match existing {
            Some(meta) => meta,
            None => {
                let meta = ProjectMeta {
                    project_id: project_id.clone(),
                    project_name: project_name.clone(),
                    status: ProjectStatus::Creating,
                    last_request_id: request_id.clone(),
                    updated_at: self.clock.now(),
                };
                match self.claim_create(&meta)? {
                    CreateClaim::Created => {
                        let writes = self.apply_grid(ctx, &meta, &grid, &[], false)?;
                        return self.finish(
                            &meta,
                            ProjectStatus::Creating,
                            LifecycleOutcome::Applied,
                            writes,
                        );
                    }
                    CreateClaim::Locked(_) => {
                        return Err(ProjectError::Conflict(ConflictKind::BeingUpdated));
                    }
                    CreateClaim::AlreadyExists(winner) => winner,
                }
            }
        };

        match create_decision(&current, &request_id) {
            CreateDecision::Replay => self.replay(current),
            CreateDecision::Reject(kind) => Err(ProjectError::Conflict(kind)),
            CreateDecision::Resume => {
                let cells = self.load_cells(&project_id)?;
                let writes = self.apply_grid(ctx, &current, &grid, &cells, true)?;
                self.finish(&current, ProjectStatus::Creating, LifecycleOutcome::Resumed, writes)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Update flow without auditing.
    fn update_inner(
        &self,
        ctx: &OperationContext,
        request: &UpdateProjectRequest,
    ) -> Result<Completed, ProjectError> {
        let request_id = RequestId::require(request.request_id.as_deref())?;
        let project_id = ProjectId::parse(request.project_id.as_str())?;
        let grid = Grid::from_document(&request.grid)?;

        let meta = self
            .load_meta(&project_id, ReadConsistency::Strong)?
            .ok_or_else(|| ProjectError::NotFound(project_id.to_string()))?;

        let (locked, outcome, resuming) = match update_decision(&meta, &request_id) {
            UpdateDecision::Replay => return self.replay(meta),
            UpdateDecision::Reject(kind) => return Err(ProjectError::Conflict(kind)),
            UpdateDecision::Resume => (meta, LifecycleOutcome::Resumed, true),
            UpdateDecision::Lock => {
                let expected = ExpectedState {
                    status: ProjectStatus::Active,
                    request_id: meta.last_request_id.clone(),
                };
                if !self.try_transition(&project_id, &expected, ProjectStatus::Updating, &request_id)? {
                    return Err(ProjectError::Conflict(ConflictKind::BeingUpdated));
                }
                let locked = ProjectMeta {
                    status: ProjectStatus::Updating,
                    last_request_id: request_id.clone(),
                    ..meta
                };
                (locked, LifecycleOutcome::Applied, false)
            }
        };

        let cells = self.load_cells(&project_id)?;
        let writes = self.apply_grid(ctx, &locked, &grid, &cells, resuming)?;
        self.finish(&locked, ProjectStatus::Updating, outcome, writes)
    }

    // ------------------------------------------------------------------------
    // Shared Steps
    // ------------------------------------------------------------------------

    /// Diffs and writes the grid in mirror-safe order.
    fn apply_grid(
        &self,
        ctx: &OperationContext,
        meta: &ProjectMeta,
        grid: &Grid,
        existing: &[MilestoneCell],
        resuming: bool,
    ) -> Result<WriteCounts, ProjectError> {
        let target = DiffTarget {
            project_id: &meta.project_id,
            project_name: &meta.project_name,
            updated_at: self.clock.now(),
        };
        let diff = if resuming {
            diff_grid_resuming(existing, grid, target)
        } else if existing.is_empty() {
            materialize_grid(grid, target)
        } else {
            diff_grid(existing, grid, target)
        };
        self.write_diff(ctx, &diff)?;
        Ok(diff.counts())
    }

    /// Submits the four diff lists through the batch writer.
    fn write_diff(&self, ctx: &OperationContext, diff: &GridDiff) -> Result<(), ProjectError> {
        let date_deletes: Vec<WriteRequest> =
            diff.date_deletes.iter().cloned().map(WriteRequest::Delete).collect();
        let milestone_deletes: Vec<WriteRequest> =
            diff.milestone_deletes.iter().cloned().map(WriteRequest::Delete).collect();
        let milestone_puts = put_requests(&diff.milestone_puts, MilestoneCell::to_item)?;
        let date_puts = put_requests(&diff.date_puts, DateIndexEntry::to_item)?;
        for requests in [date_deletes, milestone_deletes, milestone_puts, date_puts] {
            if !requests.is_empty() {
                self.writer.write_all(&self.store, &requests, ctx.deadline)?;
            }
        }
        Ok(())
    }

    /// Flips an in-flight status back to active and returns the final view.
    fn finish(
        &self,
        meta: &ProjectMeta,
        from: ProjectStatus,
        outcome: LifecycleOutcome,
        writes: WriteCounts,
    ) -> Result<Completed, ProjectError> {
        let expected = ExpectedState {
            status: from,
            request_id: meta.last_request_id.clone(),
        };
        // A failed guard means a concurrent replay of this request already finished.
        let _ = self.try_transition(
            &meta.project_id,
            &expected,
            ProjectStatus::Active,
            &meta.last_request_id,
        )?;
        let current = self
            .load_meta(&meta.project_id, ReadConsistency::Strong)?
            .ok_or_else(|| ProjectError::NotFound(meta.project_id.to_string()))?;
        Ok(Completed {
            view: self.view(current)?,
            outcome,
            writes,
        })
    }

    /// Returns the current state for a completed request.
    fn replay(&self, meta: ProjectMeta) -> Result<Completed, ProjectError> {
        Ok(Completed {
            view: self.view(meta)?,
            outcome: LifecycleOutcome::Replayed,
            writes: WriteCounts::default(),
        })
    }

    /// Builds a project view from metadata and stored cells.
    fn view(&self, meta: ProjectMeta) -> Result<ProjectView, ProjectError> {
        let cells = self.load_cells(&meta.project_id)?;
        Ok(ProjectView {
            grid: grid_from_cells(&cells).to_document(),
            project_id: meta.project_id,
            project_name: meta.project_name,
            status: meta.status,
            last_request_id: meta.last_request_id,
            updated_at: meta.updated_at,
        })
    }

    /// Reads the metadata record.
    fn load_meta(
        &self,
        project_id: &ProjectId,
        consistency: ReadConsistency,
    ) -> Result<Option<ProjectMeta>, ProjectError> {
        self.store
            .get_item(&ProjectMeta::key_for(project_id), consistency)?
            .map(|item| ProjectMeta::from_item(&item))
            .transpose()
            .map_err(ProjectError::from)
    }

    /// Reads every milestone cell of a project.
    fn load_cells(&self, project_id: &ProjectId) -> Result<Vec<MilestoneCell>, ProjectError> {
        let mut cells = Vec::new();
        let mut request = QueryRequest {
            partition_key: keys::project_partition(project_id),
            sort_key: SortKeyCondition::BeginsWith(keys::MILESTONE_SORT_PREFIX.to_string()),
            exclusive_start: None,
            limit: CELL_PAGE_SIZE,
        };
        loop {
            let page = self.store.query(&request)?;
            for item in &page.items {
                cells.push(MilestoneCell::from_item(item)?);
            }
            match page.last_evaluated_key {
                Some(key) => request.exclusive_start = Some(key.sk),
                None => break,
            }
        }
        Ok(cells)
    }

    /// Emits the audit event for a finished operation.
    fn record(
        &self,
        operation: LifecycleOperation,
        project_id: &str,
        request_id: Option<&str>,
        result: Result<Completed, ProjectError>,
    ) -> Result<ProjectView, ProjectError> {
        let (outcome, writes, detail) = match &result {
            Ok(completed) => (completed.outcome, completed.writes, None),
            Err(error) if error.is_client_error() => {
                (LifecycleOutcome::Rejected, WriteCounts::default(), Some(error.to_string()))
            }
            Err(error) => (LifecycleOutcome::Failed, WriteCounts::default(), Some(error.to_string())),
        };
        self.audit.record_lifecycle(&LifecycleAuditEvent::new(LifecycleAuditEventParams {
            operation,
            project_id: project_id.to_string(),
            request_id: request_id.unwrap_or_default().to_string(),
            outcome,
            writes,
            detail,
        }));
        result.map(|completed| completed.view)
    }
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Update-specific decision including the lock step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateDecision {
    /// Same request already completed.
    Replay,
    /// Same request was interrupted mid-update.
    Resume,
    /// New request against an active project.
    Lock,
    /// Request conflicts with the current state.
    Reject(ConflictKind),
}

/// Classifies a create request against existing metadata.
fn create_decision(meta: &ProjectMeta, request_id: &RequestId) -> CreateDecision {
    let same_request = meta.last_request_id == *request_id;
    match (meta.status, same_request) {
        (ProjectStatus::Active, true) => CreateDecision::Replay,
        (ProjectStatus::Creating, true) => CreateDecision::Resume,
        (ProjectStatus::Creating, false) => CreateDecision::Reject(ConflictKind::BeingCreated),
        (ProjectStatus::Updating, _) => CreateDecision::Reject(ConflictKind::BeingUpdated),
        (ProjectStatus::Active, false) => CreateDecision::Reject(ConflictKind::AlreadyExists),
    }
}

/// Classifies an update request against existing metadata.
fn update_decision(meta: &ProjectMeta, request_id: &RequestId) -> UpdateDecision {
    let same_request = meta.last_request_id == *request_id;
    match (meta.status, same_request) {
        (ProjectStatus::Active, true) => UpdateDecision::Replay,
        (ProjectStatus::Updating, true) => UpdateDecision::Resume,
        (ProjectStatus::Active, false) => UpdateDecision::Lock,
        (ProjectStatus::Creating, _) => UpdateDecision::Reject(ConflictKind::BeingCreated),
        (ProjectStatus::Updating, false) => UpdateDecision::Reject(ConflictKind::BeingUpdated),
    }
}

/// Encodes records as put requests.
fn put_requests<T>(
    records: &[T],
    encode: impl Fn(&T) -> Result<Item, RecordError>,
) -> Result<Vec<WriteRequest>, RecordError> {
    records.iter().map(|record| encode(record).map(WriteRequest::Put)).collect()
}
