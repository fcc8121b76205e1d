//! Diesel schema for workflow persistence.

diesel::table! {
    /// Workflow snapshots, one row per change request.
    workflows (id) {
        /// Workflow (and change request) identifier.
        id -> Uuid,
        /// Target project identifier.
        #[max_length = 100]
        project_id -> Varchar,
        /// Operator prompt.
        prompt -> Text,
        /// Current workflow stage.
        #[max_length = 50]
        stage -> Varchar,
        /// Generated code and analysis, once generation succeeded.
        generated_code -> Nullable<Jsonb>,
        /// Plan summary, once planning succeeded.
        plan -> Nullable<Jsonb>,
        /// Apply output, once apply succeeded.
        apply_output -> Nullable<Text>,
        /// Failure record, once an adapter failed.
        failure -> Nullable<Jsonb>,
        /// Sync warning attached to a completed workflow.
        sync_warning -> Nullable<Jsonb>,
        /// Append-only stage history.
        history -> Jsonb,
        /// Submission timestamp.
        created_at -> Timestamptz,
        /// Latest transition timestamp.
        updated_at -> Timestamptz,
    }
}
