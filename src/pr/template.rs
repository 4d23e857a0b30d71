use clap::ValueEnum;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMPLATE_DIR: &str = ".github";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateKind {
    PullRequest,
    Issue,
}

impl TemplateKind {
    fn file_stem(self) -> &'static str {
        match self {
            TemplateKind::PullRequest => "pull_request_template",
            TemplateKind::Issue => "issue_template",
        }
    }
}

/// Body of the `kind` template under `root`, or an empty string if none exists.
///
/// `.github/` is searched before `root` itself. File names match
/// case-insensitively, with an optional `.md` or `.txt` extension.
pub fn find_template(root: &Path, kind: TemplateKind) -> io::Result<String> {
    let hidden = root.join(TEMPLATE_DIR);
    let mut path = None;
    if hidden.is_dir() {
        path = find_file(&hidden, kind.file_stem())?;
    }
    if path.is_none() {
        path = find_file(root, kind.file_stem())?;
    }

    match path {
        Some(path) => {
            debug!(path = %path.display(), "using template");
            read_contents(&path)
        }
        None => Ok(String::new()),
    }
}

fn find_file(dir: &Path, stem: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let base = name
            .strip_suffix(".md")
            .or_else(|| name.strip_suffix(".txt"))
            .unwrap_or(&name);
        if base == stem && entry.path().is_file() {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

fn read_contents(path: &Path) -> io::Result<String> {
    let content = fs::read_to_string(path)?;
    Ok(content.replace("\r\n", "\n").trim().to_string())
}
