//! `PostgreSQL` repository implementation for workflow snapshots.

use super::{
    models::{WorkflowRecord, WorkflowRow},
    schema::workflows,
};
use crate::workflow::{
    domain::{
        ApplyOutcome, ChangeRequest, PersistedWorkflowData, ProjectId, PromptText, Workflow,
        WorkflowId, WorkflowStage,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// `PostgreSQL` connection pool type used by workflow adapters.
pub type WorkflowPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed workflow repository.
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: WorkflowPgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkflowPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkflowRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkflowRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkflowRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkflowRepositoryError::persistence)?
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn store(&self, workflow: &Workflow) -> WorkflowRepositoryResult<()> {
        let workflow_id = workflow.id();
        let record = to_record(workflow)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(workflows::table)
                .values(&record)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkflowRepositoryError::DuplicateWorkflow(workflow_id)
                    }
                    _ => WorkflowRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, workflow: &Workflow) -> WorkflowRepositoryResult<()> {
        let workflow_id = workflow.id();
        let record = to_record(workflow)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(workflows::table.find(workflow_id.into_inner()))
                .set(&record)
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if updated == 0 {
                return Err(WorkflowRepositoryError::NotFound(workflow_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: WorkflowId) -> WorkflowRepositoryResult<Option<Workflow>> {
        self.run_blocking(move |connection| {
            let row = workflows::table
                .filter(workflows::id.eq(id.into_inner()))
                .select(WorkflowRow::as_select())
                .first::<WorkflowRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            row.map(row_to_workflow).transpose()
        })
        .await
    }

    async fn find_active(&self) -> WorkflowRepositoryResult<Vec<Workflow>> {
        let terminal: Vec<&'static str> = WorkflowStage::ALL
            .into_iter()
            .filter(|stage| stage.is_terminal())
            .map(WorkflowStage::as_str)
            .collect();

        self.run_blocking(move |connection| {
            let rows = workflows::table
                .filter(workflows::stage.ne_all(terminal))
                .order(workflows::created_at.asc())
                .select(WorkflowRow::as_select())
                .load::<WorkflowRow>(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            rows.into_iter().map(row_to_workflow).collect()
        })
        .await
    }
}

fn to_json<T: Serialize>(value: &T) -> WorkflowRepositoryResult<Value> {
    serde_json::to_value(value).map_err(WorkflowRepositoryError::persistence)
}

fn from_json<T: DeserializeOwned>(value: Value) -> WorkflowRepositoryResult<T> {
    serde_json::from_value(value).map_err(WorkflowRepositoryError::persistence)
}

fn to_record(workflow: &Workflow) -> WorkflowRepositoryResult<WorkflowRecord> {
    Ok(WorkflowRecord {
        id: workflow.id().into_inner(),
        project_id: workflow.project_id().as_str().to_owned(),
        prompt: workflow.prompt().as_str().to_owned(),
        stage: workflow.stage().as_str().to_owned(),
        generated_code: workflow.generated_code().map(to_json).transpose()?,
        plan: workflow.plan().map(to_json).transpose()?,
        apply_output: workflow
            .apply_outcome()
            .map(|outcome| outcome.output().to_owned()),
        failure: workflow.failure().map(to_json).transpose()?,
        sync_warning: workflow.sync_warning().map(to_json).transpose()?,
        history: to_json(&workflow.history())?,
        created_at: workflow.created_at(),
        updated_at: workflow.updated_at(),
    })
}

fn row_to_workflow(row: WorkflowRow) -> WorkflowRepositoryResult<Workflow> {
    let WorkflowRow {
        id,
        project_id,
        prompt,
        stage,
        generated_code,
        plan,
        apply_output,
        failure,
        sync_warning,
        history,
        created_at,
        updated_at,
    } = row;

    let request = ChangeRequest::from_persisted(
        WorkflowId::from_uuid(id),
        ProjectId::new(project_id).map_err(WorkflowRepositoryError::persistence)?,
        PromptText::new(prompt).map_err(WorkflowRepositoryError::persistence)?,
        created_at,
    );
    let data = PersistedWorkflowData {
        request,
        stage: WorkflowStage::try_from(stage.as_str())
            .map_err(WorkflowRepositoryError::persistence)?,
        generated_code: generated_code.map(from_json).transpose()?,
        plan: plan.map(from_json).transpose()?,
        apply_outcome: apply_output.map(ApplyOutcome::new),
        failure: failure.map(from_json).transpose()?,
        sync_warning: sync_warning.map(from_json).transpose()?,
        history: from_json(history)?,
        updated_at,
    };
    Ok(Workflow::from_persisted(data))
}
