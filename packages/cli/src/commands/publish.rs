use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use ftext_editor::{AssetSession, DirStorage};
use ftext_workspace::validate_document_id;

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Document whose draft becomes the published text
    pub document: String,
}

/// Apply draft changes to a stored document without a running server.
pub fn publish(args: PublishArgs, cwd: &str) -> Result<()> {
    validate_document_id(&args.document)?;
    let storage = DirStorage::new(Config::load(cwd)?.get_storage_dir(cwd).join(&args.document));

    let mut session = AssetSession::load_from(&storage)?;
    if !session.has_draft() {
        println!(
            "{} {} has no draft changes",
            "•".dimmed(),
            args.document.bright_white()
        );
        return Ok(());
    }

    session.publish_draft();
    session.save_to(&storage)?;

    println!(
        "{} Published {} ({} chars)",
        "✓".green(),
        args.document.bright_white().bold(),
        session.published().chars().count()
    );
    Ok(())
}
