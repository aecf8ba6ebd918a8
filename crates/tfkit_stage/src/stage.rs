//! Stage names and the skip/resume wrapper.

use std::future::Future;

use tracing::info;

use crate::store::StageStore;

/// One named phase of a provisioning test lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    Setup,
    Apply,
    Validate,
    Destroy,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Setup => "setup",
            StageName::Apply => "apply",
            StageName::Validate => "validate",
            StageName::Destroy => "destroy",
        }
    }

    /// All stages in execution order.
    pub fn all() -> [StageName; 4] {
        [
            StageName::Setup,
            StageName::Apply,
            StageName::Validate,
            StageName::Destroy,
        ]
    }

    /// Environment variable that skips this stage when set.
    pub fn skip_env_var(&self) -> String {
        format!("SKIP_{}", self.as_str())
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run `work` as stage `stage` unless the store says to skip it.
///
/// The future is only polled when the stage runs. A stage is marked complete
/// after `work` succeeds, so a later call for the same stage is skipped.
/// Returns whether the stage ran.
pub async fn run_stage<S, Fut, E>(store: &S, stage: StageName, work: Fut) -> Result<bool, E>
where
    S: StageStore + ?Sized,
    Fut: Future<Output = Result<(), E>>,
{
    if store.should_skip(stage) {
        info!("Skipping stage '{}' (requested via {})", stage, stage.skip_env_var());
        return Ok(false);
    }
    if store.is_complete(stage) {
        info!("Skipping stage '{}' (already completed)", stage);
        return Ok(false);
    }

    info!("Running stage '{}'", stage);
    work.await?;
    store.mark_complete(stage);
    info!("Stage '{}' completed", stage);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::settings::StageSettings;
    use crate::store::FsStageStore;

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = StageName::all().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["setup", "apply", "validate", "destroy"]);
        assert_eq!(StageName::Apply.skip_env_var(), "SKIP_apply");
    }

    #[tokio::test]
    async fn test_stage_runs_once() {
        let store = FsStageStore::new(StageSettings::default());
        let mut runs = 0;

        let ran = run_stage(&store, StageName::Apply, async {
            runs += 1;
            Ok::<(), StageError>(())
        })
        .await
        .unwrap();
        assert!(ran);

        let ran = run_stage(&store, StageName::Apply, async {
            runs += 1;
            Ok::<(), StageError>(())
        })
        .await
        .unwrap();
        assert!(!ran);
        assert_eq!(runs, 1);
    }

    #[tokio::test]
    async fn test_failed_stage_is_not_marked_complete() {
        let store = FsStageStore::new(StageSettings::default());

        let result = run_stage(&store, StageName::Setup, async {
            Err::<(), _>(StageError::ConfigNotFound("missing.json".into()))
        })
        .await;

        assert!(result.is_err());
        assert!(!store.is_complete(StageName::Setup));
    }

    #[tokio::test]
    async fn test_skipped_stage_does_not_run() {
        let store = FsStageStore::new(StageSettings::default().skip(StageName::Destroy));
        let mut ran_work = false;

        let ran = run_stage(&store, StageName::Destroy, async {
            ran_work = true;
            Ok::<(), StageError>(())
        })
        .await
        .unwrap();

        assert!(!ran);
        assert!(!ran_work);
    }
}
