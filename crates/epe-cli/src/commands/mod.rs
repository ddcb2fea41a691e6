// crates/epe-cli/src/commands/mod.rs
//
// Command module declarations for the epe CLI, plus the state every command
// receives and the session set-up shared by the file-based commands.

pub mod align;
pub mod annotate;
pub mod export;
pub mod read;
pub mod remote;
pub mod tokenize;

use std::path::PathBuf;

use epe_core::export::ExportOptions;
use epe_core::session::{Command, Session};
use epe_core::witness::load_witnesses;

use crate::config::CliConfig;
use crate::output::OutputFormat;

/// Resolved configuration and global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: CliConfig,
    pub format: OutputFormat,
    /// Remote store URL after `--remote` override.
    pub remote_url: String,
}

/// Import `files` in order and tokenize them with `pattern`, falling back to
/// the configured default pattern.
pub fn load_session(
    ctx: &Context,
    files: &[PathBuf],
    pattern: Option<&str>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = Session::new(ExportOptions {
        title: ctx.config.edition_title.clone(),
    });
    let witnesses = load_witnesses(files)?;
    session.execute(Command::Import(witnesses))?;

    let pattern = pattern.unwrap_or(&ctx.config.default_pattern);
    session.execute(Command::Tokenize(Some(pattern.to_string())))?;
    tracing::debug!(status = ?session.status(), "Session ready");
    Ok(session)
}

/// [`load_session`], then optionally switch the base witness and align.
pub fn aligned_session(
    ctx: &Context,
    files: &[PathBuf],
    pattern: Option<&str>,
    base: Option<&str>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = load_session(ctx, files, pattern)?;
    if let Some(base) = base {
        session.execute(Command::SetBase(base.to_string()))?;
    }
    session.execute(Command::Align)?;
    Ok(session)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn load_session_uses_configured_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "x-y z"), ("b.txt", "x")]);
        let mut ctx = context();
        ctx.config.default_pattern = r"\w+".into();

        let session = load_session(&ctx, &files, None).unwrap();
        assert_eq!(session.witness("a").unwrap().tokens, vec!["x", "y", "z"]);

        let session = load_session(&ctx, &files, Some(r"\S+")).unwrap();
        assert_eq!(session.witness("a").unwrap().tokens, vec!["x-y", "z"]);
    }

    #[test]
    fn aligned_session_honours_base() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_witnesses(dir.path(), &[("a.txt", "x"), ("b.txt", "y")]);
        let session = aligned_session(&context(), &files, None, Some("b")).unwrap();
        assert_eq!(session.base_witness_id(), Some("b"));
        assert_eq!(session.base_column(), Some(1));
    }
}
