//! Tera rendering engine over a canonical template directory.
//!
//! # Directory mapping
//!
//! | Template file              | Output (relative to repository root) |
//! |----------------------------|--------------------------------------|
//! | `README.md.tera`           | `README.md` (rendered)               |
//! | `conf/base.config.tera`    | `conf/base.config` (rendered)        |
//! | `_partials/header.tera`    | nothing; includable as a partial     |
//! | `assets/logo.png`          | `assets/logo.png` (copied verbatim)  |
//!
//! A `.tera` file whose name starts with `_` (or that lives under a directory
//! starting with `_`) is a partial: other templates may `{% include %}` it by
//! its relative path, but it is never emitted.

use std::path::{Component, Path, PathBuf};

use tera::Tera;

use crate::context::TemplateContext;
use crate::error::RenderError;

const TEMPLATE_SUFFIX: &str = ".tera";

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn template_name(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

fn is_partial(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(part) => part.to_string_lossy().starts_with('_'),
        _ => false,
    })
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

/// One output file produced for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the repository root.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

#[derive(Debug)]
struct StaticFile {
    rel: PathBuf,
    source: PathBuf,
}

/// Tera engine holding every template of the canonical template directory.
///
/// Load once per run with [`TemplateEngine::from_dir`] and render per repository.
#[derive(Debug)]
pub struct TemplateEngine {
    tera: Tera,
    /// `(template name, output path)` for every non-partial template.
    outputs: Vec<(String, PathBuf)>,
    statics: Vec<StaticFile>,
}

impl TemplateEngine {
    /// Load every file under `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, RenderError> {
        if !dir.is_dir() {
            return Err(RenderError::TemplateDirNotFound(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        collect_template_files(dir, &mut files)?;
        files.sort();

        let mut raw = Vec::new();
        let mut outputs = Vec::new();
        let mut statics = Vec::new();
        for path in files {
            let rel = path.strip_prefix(dir).unwrap_or(path.as_path()).to_path_buf();
            let name = template_name(&rel);
            match name.strip_suffix(TEMPLATE_SUFFIX) {
                Some(output) => {
                    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
                    if !is_partial(&rel) {
                        outputs.push((name.clone(), PathBuf::from(output)));
                    }
                    raw.push((name, contents));
                }
                None => statics.push(StaticFile { rel, source: path }),
            }
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(raw)?;
        Ok(TemplateEngine {
            tera,
            outputs,
            statics,
        })
    }

    /// Number of files [`render`](Self::render) will produce.
    pub fn output_count(&self) -> usize {
        self.outputs.len() + self.statics.len()
    }

    /// Render every template and read every static file, sorted by path.
    ///
    /// Rendered text is normalised to LF line endings.
    pub fn render(&self, ctx: &TemplateContext) -> Result<Vec<RenderedFile>, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let mut files = Vec::with_capacity(self.output_count());

        for (name, path) in &self.outputs {
            let content = self.tera.render(name, &tera_ctx)?;
            files.push(RenderedFile {
                path: path.clone(),
                contents: content.replace("\r\n", "\n").into_bytes(),
            });
        }
        for file in &self.statics {
            let contents = std::fs::read(&file.source).map_err(|e| io_err(&file.source, e))?;
            files.push(RenderedFile {
                path: file.rel.clone(),
                contents,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
