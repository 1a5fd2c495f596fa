//! Page templates compiled from fragment files on first use.
//!
//! Each [`PageTemplate`] owns an ordered list of fragment files: the shared layout first and
//! the page-specific body last. The fragments are compiled together into one [`Tera`]
//! instance at most once per page, guarded by a [`OnceCell`]. A compilation failure is latched
//! as well: the caller that ran the compilation receives the error text, everybody after that
//! receives nothing and compilation is never retried.

use std::{
    error::Error as StdError,
    io::{self, Write},
    path::{Path, PathBuf},
};

use once_cell::sync::OnceCell;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, error};

pub const LAYOUT_FRAGMENT: &str = "main.html";
pub const HOME_FRAGMENT: &str = "home.html";
pub const SLACK_FRAGMENT: &str = "slack.html";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("page `{page}` failed to compile: {message}")]
    Compile { page: &'static str, message: String },
    #[error("page `{page}` failed to render")]
    Render {
        page: &'static str,
        #[source]
        source: tera::Error,
    },
    #[error("failed to write page output: {0}")]
    Io(#[from] io::Error),
}

/// What a call to [`PageTemplate::render`] wrote to its sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The page body was rendered.
    Page,
    /// This call ran the failing compilation and wrote the error text.
    CompileError,
    /// Compilation failed earlier; nothing was written.
    Skipped,
}

enum CompiledState {
    Compiled(Tera),
    Failed(String),
}

pub struct PageTemplate {
    name: &'static str,
    fragments: Vec<PathBuf>,
    entry: String,
    state: OnceCell<CompiledState>,
}

impl PageTemplate {
    /// Build a page from fragment file names resolved against `directory`.
    ///
    /// The last fragment is the entry point that is executed on render.
    pub fn new(name: &'static str, directory: &Path, fragments: &[&str]) -> Self {
        let entry = fragments.last().map(|f| f.to_string()).unwrap_or_default();
        Self {
            name,
            fragments: fragments.iter().map(|f| directory.join(f)).collect(),
            entry,
            state: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state.get(), Some(CompiledState::Compiled(_)))
    }

    /// Run the compilation latch without rendering.
    pub fn compile(&self) -> Result<(), TemplateError> {
        match self.state.get_or_init(|| self.compile_fragments()) {
            CompiledState::Compiled(_) => Ok(()),
            CompiledState::Failed(message) => Err(TemplateError::Compile {
                page: self.name,
                message: message.clone(),
            }),
        }
    }

    /// Render the page into `sink`, compiling the fragments first if nobody has yet.
    pub fn render<W: Write>(
        &self,
        data: Option<&Context>,
        sink: &mut W,
    ) -> Result<RenderOutcome, TemplateError> {
        let mut ran_here = false;
        let state = self.state.get_or_init(|| {
            ran_here = true;
            self.compile_fragments()
        });

        match state {
            CompiledState::Compiled(tera) => {
                let empty = Context::new();
                let context = data.unwrap_or(&empty);
                tera.render_to(&self.entry, context, &mut *sink)
                    .map_err(|source| TemplateError::Render {
                        page: self.name,
                        source,
                    })?;
                Ok(RenderOutcome::Page)
            }
            CompiledState::Failed(message) if ran_here => {
                sink.write_all(message.as_bytes())?;
                Ok(RenderOutcome::CompileError)
            }
            CompiledState::Failed(_) => Ok(RenderOutcome::Skipped),
        }
    }

    fn compile_fragments(&self) -> CompiledState {
        let files: Vec<(&Path, Option<String>)> = self
            .fragments
            .iter()
            .map(|path| (path.as_path(), Some(fragment_name(path))))
            .collect();

        let mut tera = Tera::default();
        match tera.add_template_files(files) {
            Ok(()) => {
                debug!(page = self.name, fragments = self.fragments.len(), "page compiled");
                CompiledState::Compiled(tera)
            }
            Err(err) => {
                let message = error_chain(&err);
                error!(page = self.name, error = %message, "page compilation failed");
                CompiledState::Failed(message)
            }
        }
    }
}

/// The pages served by the site.
pub struct Pages {
    pub home: PageTemplate,
    pub slack: PageTemplate,
}

impl Pages {
    pub fn new(directory: &Path) -> Self {
        Self {
            home: PageTemplate::new("home", directory, &[LAYOUT_FRAGMENT, HOME_FRAGMENT]),
            slack: PageTemplate::new("slack", directory, &[LAYOUT_FRAGMENT, SLACK_FRAGMENT]),
        }
    }

    pub fn all(&self) -> [&PageTemplate; 2] {
        [&self.home, &self.slack]
    }

    /// Compile every page now instead of on first request.
    pub fn compile_all(&self) -> Result<(), TemplateError> {
        self.all().into_iter().try_for_each(PageTemplate::compile)
    }
}

fn fragment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        current = inner.source();
    }
    message
}
