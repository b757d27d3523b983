//! `keysync send-codes` - dispatch pairing codes to unregistered phones.

use clap::Args;

use crate::commands::{build_service, AppContext};
use crate::error::CliResult;

#[derive(Debug, Args)]
pub struct SendCodesArgs {
    /// Send at most this many codes (overrides the configured limit;
    /// omit both for unbounded)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

pub async fn execute(ctx: &AppContext, args: SendCodesArgs) -> CliResult<()> {
    let service = build_service(ctx)?;
    let limit = args.limit.or(ctx.settings.registration.send_limit);
    let sent = service.send_pending_registration_codes(limit).await?;
    println!("Sent {sent} registration code(s)");
    Ok(())
}
