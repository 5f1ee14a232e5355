// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seven-phase commit pipeline (§4.3).

use crate::error::EngineError;
use crate::validate::validate_tree;
use ncfd_core::DatastoreName;
use ncfd_plugin::{PluginError, PluginRegistry, TransactionContext};
use ncfd_schema::SchemaRegistry;
use ncfd_storage::DatastoreRegistry;

/// Outcome of a successful commit. `plugin_commit_failures` is non-empty
/// only when step 6 (`trans_commit`) partially failed; the new
/// configuration is installed regardless (§4.3 step 6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub plugin_commit_failures: Vec<(String, PluginError)>,
}

/// Runs `candidate_src`'s content through validate → transaction begin →
/// plugin validate → plugin complete → atomic replace of `running` →
/// plugin commit → plugin end, halting on error through step 5 and
/// tolerating partial plugin-commit failure afterward.
pub async fn run_commit_pipeline(
    storage: &mut DatastoreRegistry,
    schema: &SchemaRegistry,
    plugins: &PluginRegistry,
    candidate_src: &str,
) -> Result<CommitOutcome, EngineError> {
    // 1. Validate.
    let candidate_content = storage.content(candidate_src)?.clone();
    let report = validate_tree(schema, &candidate_content);
    if !report.ok {
        return Err(EngineError::Invalid(report.violations.join("; ")));
    }

    // 2. Transaction begin.
    let running_content = storage.content(DatastoreName::RUNNING)?.clone();
    let txn = TransactionContext::new(running_content, candidate_content);
    plugins.trans_begin(&txn).await?;

    // 3. Plugin validate (abort-in-reverse-on-failure is internal to the
    // registry, §4.6).
    plugins.trans_validate(&txn).await?;

    // 4. Plugin complete — last chance to veto.
    plugins.trans_complete(&txn).await?;

    // 5. Atomically replace running.
    storage.copy(candidate_src, DatastoreName::RUNNING)?;

    // 6. Plugin commit — partial-failure tolerant, already installed.
    let plugin_commit_failures = plugins.trans_commit(&txn).await;

    // 7. Plugin end.
    plugins.trans_end(&txn).await;

    Ok(CommitOutcome { plugin_commit_failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncfd_core::operation::Operation;
    use serde_json::json;

    #[tokio::test]
    async fn commit_installs_candidate_into_running() {
        let mut storage = DatastoreRegistry::bootstrap();
        storage.put("candidate", Operation::Merge, json!({"x": 1})).unwrap();
        let schema = SchemaRegistry::empty();
        let plugins = PluginRegistry::new();

        let outcome = run_commit_pipeline(&mut storage, &schema, &plugins, "candidate").await.unwrap();
        assert!(outcome.plugin_commit_failures.is_empty());
        assert_eq!(*storage.content("running").unwrap(), json!({"x": 1}));
    }

    #[tokio::test]
    async fn commit_aborts_and_leaves_running_untouched_on_schema_violation() {
        let schema = SchemaRegistry::from_str(
            r#"node "x" { kind = "leaf", config = false }"#,
        )
        .unwrap();
        let mut storage = DatastoreRegistry::bootstrap();
        storage.put("candidate", Operation::Merge, json!({"x": 1})).unwrap();
        let plugins = PluginRegistry::new();

        let err = run_commit_pipeline(&mut storage, &schema, &plugins, "candidate").await.unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
        assert_eq!(*storage.content("running").unwrap(), json!({}));
    }
}
