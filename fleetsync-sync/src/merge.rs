//! Applying the canonical template to a checked-out tracking branch.
//!
//! [`TemplateMerger`] is the seam between the git plumbing in
//! [`crate::syncer`] and whatever produces the template's current state.
//! [`RenderedTemplate`] is the stock implementation: it renders the template
//! directory for the repository, writes every file atomically and removes
//! files the template no longer contains.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fleetsync_core::PipelineRecord;
use fleetsync_renderer::{TemplateContext, TemplateEngine};

use crate::error::{io_err, SyncError};
use crate::writer::{atomic_write, WriteResult};

/// What a merge did to the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub writes: Vec<WriteResult>,
}

impl MergeSummary {
    pub fn changed(&self) -> usize {
        self.writes.iter().filter(|w| w.is_change()).count()
    }
}

/// Brings a working tree to the template's current state for one repository.
pub trait TemplateMerger: Send + Sync {
    fn merge(
        &self,
        record: &PipelineRecord,
        release_tag: &str,
        worktree: &Path,
    ) -> Result<MergeSummary, SyncError>;
}

impl<F> TemplateMerger for F
where
    F: Fn(&PipelineRecord, &str, &Path) -> Result<MergeSummary, SyncError> + Send + Sync,
{
    fn merge(
        &self,
        record: &PipelineRecord,
        release_tag: &str,
        worktree: &Path,
    ) -> Result<MergeSummary, SyncError> {
        self(record, release_tag, worktree)
    }
}

/// Template directory rendered with Tera.
pub struct RenderedTemplate {
    engine: TemplateEngine,
}

impl RenderedTemplate {
    pub fn new(engine: TemplateEngine) -> Self {
        Self { engine }
    }

    pub fn from_dir(dir: &Path) -> Result<Self, SyncError> {
        Ok(Self::new(TemplateEngine::from_dir(dir)?))
    }
}

impl TemplateMerger for RenderedTemplate {
    fn merge(
        &self,
        record: &PipelineRecord,
        release_tag: &str,
        worktree: &Path,
    ) -> Result<MergeSummary, SyncError> {
        let ctx = TemplateContext::new(record, release_tag);
        let files = self.engine.render(&ctx)?;

        let mut keep = HashSet::with_capacity(files.len());
        let mut writes = Vec::with_capacity(files.len());
        for file in files {
            writes.push(atomic_write(&worktree.join(&file.path), &file.contents)?);
            keep.insert(file.path);
        }

        prune_stale(worktree, Path::new(""), &keep, &mut writes)?;
        Ok(MergeSummary { writes })
    }
}

/// Delete every file under `worktree` that is not in `keep`, skipping `.git`.
/// Directories left empty are removed too.
fn prune_stale(
    worktree: &Path,
    rel: &Path,
    keep: &HashSet<PathBuf>,
    out: &mut Vec<WriteResult>,
) -> Result<(), SyncError> {
    let dir = worktree.join(rel);
    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        if rel.as_os_str().is_empty() && name == ".git" {
            continue;
        }
        let child_rel = rel.join(&name);
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            prune_stale(worktree, &child_rel, keep, out)?;
            let is_empty = std::fs::read_dir(&path)
                .map_err(|e| io_err(&path, e))?
                .next()
                .is_none();
            if is_empty {
                std::fs::remove_dir(&path).map_err(|e| io_err(&path, e))?;
            }
        } else if !keep.contains(&child_rel) {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            tracing::debug!("removed: {}", path.display());
            out.push(WriteResult::Removed { path });
        }
    }
    Ok(())
}
