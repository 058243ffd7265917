//! Export, restore and import commands.

use super::{print_json, CliError, Environment};
use langsnap_engine::TransferMode;
use langsnap_jobs::{ExportJob, ImportJob};

/// Runs the export command.
pub fn export(env: &Environment, language_id: String, snapshot_id: String) -> Result<(), CliError> {
    let (_, jobs) = env.jobs()?;
    let report = jobs.export(&ExportJob {
        language_id,
        snapshot_id,
    });
    print_json(&report);
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::JobFailed("export"))
    }
}

/// Runs the restore or import command and saves the database.
///
/// The dump is written even when the run fails part-way, since completed
/// resources are not rolled back.
pub fn import(
    env: &Environment,
    mode: TransferMode,
    language_id: String,
    language_code: String,
    snapshot_id: String,
    discard_snapshot: bool,
) -> Result<(), CliError> {
    let (store, jobs) = env.jobs()?;
    let report = jobs.import(&ImportJob {
        language_id,
        language_code,
        snapshot_id,
        mode,
        discard_snapshot,
    });
    env.save_store(&store)?;
    print_json(&report);
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::JobFailed(match mode {
            TransferMode::Restore => "restore",
            TransferMode::Import => "import",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use langsnap_testkit::{seeded_store, shared_store, ENG_CODE, ENG_ID};
    use tempfile::TempDir;

    #[test]
    fn export_then_import_between_dumps() {
        let dir = TempDir::new().unwrap();
        let bucket = dir.path().join("bucket");
        let source = Environment::new(dir.path().join("a.json"), bucket.clone(), 1);
        let dest = Environment::new(dir.path().join("b.json"), bucket, 1);

        source.save_store(&seeded_store().0).unwrap();
        dest.save_store(&shared_store()).unwrap();

        export(&source, ENG_ID.into(), "snap-1".into()).unwrap();
        import(&dest, TransferMode::Import, ENG_ID.into(), ENG_CODE.into(), "snap-1".into(), true).unwrap();

        let imported = dest.load_store().unwrap();
        assert_eq!(imported.count("language"), 1);
        assert_eq!(imported.count("phrase"), 2);
        assert!(matches!(
            import(&dest, TransferMode::Import, ENG_ID.into(), ENG_CODE.into(), "snap-1".into(), false),
            Ok(())
        ));
    }

    #[test]
    fn failed_restore_is_an_error() {
        let dir = TempDir::new().unwrap();
        let env = Environment::new(dir.path().join("db.json"), dir.path().join("bucket"), 1);
        env.save_store(&seeded_store().0).unwrap();
        export(&env, ENG_ID.into(), "snap-1".into()).unwrap();

        let err = import(&env, TransferMode::Restore, ENG_ID.into(), "spa".into(), "snap-1".into(), false).unwrap_err();
        assert!(matches!(err, CliError::JobFailed("restore")));
    }
}
