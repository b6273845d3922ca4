use std::future::Future;

use tracing::{debug, warn};

use super::{Catalog, UnitOfWork};
use crate::error::Result;

/// Run `work` inside a fresh unit of work, then commit or discard it.
///
/// `work` always runs to completion and receives the unit by value, handing
/// it back alongside its result. When `dry_run` is set the tracked entities
/// are detached and the transaction rolled back, so the caller sees exactly
/// what a real run would report while nothing is persisted. An error from
/// `work` rolls the transaction back and is propagated unchanged.
pub async fn run_with_dry_run<T, F, Fut>(catalog: &Catalog, dry_run: bool, work: F) -> Result<T>
where
    F: FnOnce(UnitOfWork) -> Fut,
    Fut: Future<Output = (UnitOfWork, Result<T>)>,
{
    let uow = catalog.begin().await?;
    let (mut uow, result) = work(uow).await;

    match result {
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!("Rollback after failed import also failed: {}", rollback_err);
            }
            Err(err)
        }
        Ok(value) if dry_run => {
            let detached = uow.detach_all();
            uow.rollback().await?;
            debug!("Dry run rolled back, detached {} tracked entities", detached);
            Ok(value)
        }
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
    }
}
