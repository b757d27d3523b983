//! `keysync sync` - run one full reconciliation.

use clap::Args;

use keysync_engine::SyncOptions;

use crate::commands::{build_service, AppContext};
use crate::error::CliResult;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Compute and log every change without writing any of them
    #[arg(long)]
    pub dry_run: bool,

    /// Do not create person records
    #[arg(long)]
    pub skip_person_creates: bool,

    /// Do not update person records
    #[arg(long)]
    pub skip_person_updates: bool,

    /// Do not delete person records
    #[arg(long)]
    pub skip_person_deletes: bool,

    /// Do not deauthorize departed key-holders
    #[arg(long)]
    pub skip_deauthorize: bool,

    /// Do not create phone media
    #[arg(long)]
    pub skip_phone_creates: bool,

    /// Do not update phone media
    #[arg(long)]
    pub skip_phone_updates: bool,

    /// Do not delete phone media
    #[arg(long)]
    pub skip_phone_deletes: bool,

    /// Authorize for this area instead of the configured ones (repeatable)
    #[arg(long = "area", value_name = "AREA_ID")]
    pub areas: Vec<i64>,
}

pub async fn execute(ctx: &AppContext, args: SyncArgs) -> CliResult<()> {
    let service = build_service(ctx)?;

    let area_ids = if args.areas.is_empty() {
        ctx.settings.keyholders.areas.clone()
    } else {
        args.areas
    };

    let options = SyncOptions {
        create_persons: !args.skip_person_creates,
        update_persons: !args.skip_person_updates,
        delete_persons: !args.skip_person_deletes,
        deauthorize: !args.skip_deauthorize,
        create_phones: !args.skip_phone_creates,
        update_phones: !args.skip_phone_updates,
        delete_phones: !args.skip_phone_deletes,
        area_ids,
        dry_run: args.dry_run,
    };

    let report = service.sync(&options).await?;

    if report.dry_run {
        println!("Dry run - nothing was written.");
    }
    println!("Key-holders: {}", report.keyholders);
    println!(
        "Persons: {} created, {} updated, {} deleted",
        report.persons_created, report.persons_updated, report.persons_deleted
    );
    println!(
        "Phones: {} created, {} updated, {} deleted ({} orphans removed)",
        report.phones_created,
        report.phones_updated,
        report.phones_deleted,
        report.orphan_phones_deleted
    );
    println!(
        "Authorizations: {} created, {} deferred, {} members deauthorized",
        report.authorizations_created,
        report.authorizations_deferred,
        report.members_deauthorized
    );
    Ok(())
}
