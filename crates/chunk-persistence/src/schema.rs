//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    batch_job_execution (job_execution_id) {
        job_execution_id -> Uuid,
        job_name -> Text,
        execution_context -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    batch_step_execution (step_execution_id) {
        step_execution_id -> Uuid,
        job_execution_id -> Uuid,
        step_name -> Text,
        status -> Text,
        exit_code -> Text,
        exit_description -> Text,
        read_count -> BigInt,
        write_count -> BigInt,
        filter_count -> BigInt,
        commit_count -> BigInt,
        rollback_count -> BigInt,
        start_time -> Nullable<Timestamptz>,
        end_time -> Nullable<Timestamptz>,
        last_updated -> Nullable<Timestamptz>,
        failures -> Jsonb,
        execution_context -> Jsonb,
    }
}

diesel::allow_tables_to_appear_in_same_query!(batch_job_execution, batch_step_execution,);
