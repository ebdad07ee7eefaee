use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use ftext_editor::{AssetSession, DirStorage};
use ftext_workspace::validate_document_id;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Document to inspect; every document when omitted
    pub document: Option<String>,
}

/// State of one stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub id: String,
    pub published_chars: usize,
    pub draft_chars: usize,
    pub has_draft: bool,
}

pub fn status(args: StatusArgs, cwd: &str) -> Result<()> {
    let storage_dir = Config::load(cwd)?.get_storage_dir(cwd);

    let statuses = match args.document {
        Some(id) => vec![document_status(&storage_dir, &id)?],
        None => all_statuses(&storage_dir)?,
    };

    if statuses.is_empty() {
        println!("No documents in {}", storage_dir.display());
        return Ok(());
    }

    for status in statuses {
        let state = if status.has_draft {
            "draft".yellow()
        } else {
            "published".green()
        };
        println!(
            "{} {} ({} chars published, {} chars draft)",
            status.id.bright_white().bold(),
            state,
            status.published_chars,
            status.draft_chars
        );
    }
    Ok(())
}

pub fn document_status(storage_dir: &Path, id: &str) -> Result<DocumentStatus> {
    validate_document_id(id)?;
    let session = AssetSession::load_from(&DirStorage::new(storage_dir.join(id)))?;
    Ok(DocumentStatus {
        id: id.to_string(),
        published_chars: session.published().chars().count(),
        draft_chars: session.draft().chars().count(),
        has_draft: session.has_draft(),
    })
}

fn all_statuses(storage_dir: &Path) -> Result<Vec<DocumentStatus>> {
    if !storage_dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in fs::read_dir(storage_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if validate_document_id(&name).is_ok() {
            ids.push(name);
        }
    }
    ids.sort();

    ids.iter()
        .map(|id| document_status(storage_dir, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftext_editor::{DRAFT_BLOB, PUBLISHED_BLOB};

    #[test]
    fn test_status_of_each_document() {
        let dir = tempfile::tempdir().unwrap();
        let clean = dir.path().join("clean");
        let dirty = dir.path().join("dirty");
        fs::create_dir_all(&clean).unwrap();
        fs::create_dir_all(&dirty).unwrap();
        fs::write(clean.join(PUBLISHED_BLOB), "done").unwrap();
        fs::write(dirty.join(PUBLISHED_BLOB), "old").unwrap();
        fs::write(dirty.join(DRAFT_BLOB), "newer").unwrap();
        fs::write(dir.path().join("stray.txt"), "ignored").unwrap();

        let statuses = all_statuses(dir.path()).unwrap();
        assert_eq!(
            statuses,
            vec![
                DocumentStatus {
                    id: "clean".to_string(),
                    published_chars: 4,
                    draft_chars: 4,
                    has_draft: false,
                },
                DocumentStatus {
                    id: "dirty".to_string(),
                    published_chars: 3,
                    draft_chars: 5,
                    has_draft: true,
                },
            ]
        );
    }

    #[test]
    fn test_status_rejects_bad_id() {
        let dir = tempfile::tempdir().unwrap();
        assert!(document_status(dir.path(), "../etc").is_err());
    }
}
