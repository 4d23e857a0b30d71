pub mod exec;

pub use exec::{Exec, SystemExec};

use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use exec::ExecOutput;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("git {args} failed{}", exit_suffix(.code))]
    Failed { args: String, code: Option<i32> },

    #[error("Not a git repository (or any of the parent directories): .git")]
    NotARepo,

    #[error("Can't load git version")]
    Version,

    #[error("Unknown revision or path not in the working tree: {0}")]
    UnknownRevision(String),

    #[error("Can't load rev-list for {0}")]
    RevList(String),

    #[error("Can't load git log {0}")]
    Log(String),

    #[error("Unknown config {0}")]
    UnknownConfig(String),

    #[error("Can't write config {0}")]
    ConfigWrite(String),

    #[error("Failed to read {}: {source}", .path.display())]
    ReadRef {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No branch info in {}: {content}", .path.display())]
    NoBranchInfo { path: PathBuf, content: String },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

const REF_PREFIX: &str = "ref: ";

/// Low-level access to one repository through the git binary.
///
/// Every invocation is prefixed with the registered global flags. The
/// metadata directory is resolved once and then served from the cache for
/// the lifetime of this value, even if the process changes directory.
pub struct Git {
    exec: Box<dyn Exec>,
    global_flags: Vec<String>,
    dir: OnceCell<PathBuf>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("global_flags", &self.global_flags)
            .field("dir", &self.dir.get())
            .finish()
    }
}

impl Git {
    pub fn new(exec: impl Exec + 'static) -> Self {
        Git {
            exec: Box::new(exec),
            global_flags: Vec::new(),
            dir: OnceCell::new(),
        }
    }

    /// Register flags that precede the subcommand on every invocation.
    pub fn register_global_flags<I, S>(&mut self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_flags.extend(flags.into_iter().map(Into::into));
    }

    pub fn global_flags(&self) -> &[String] {
        &self.global_flags
    }

    /// Forget the memoized metadata directory.
    #[cfg(test)]
    pub fn reset_dir_cache(&mut self) {
        self.dir.take();
    }

    fn full_args(&self, args: &[&str]) -> Vec<String> {
        self.global_flags
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string()))
            .collect()
    }

    fn exec_output(&self, args: &[&str]) -> Result<ExecOutput, GitError> {
        let full = self.full_args(args);
        debug!(args = ?full, "running git");
        self.exec.output(&full).map_err(|source| GitError::Spawn {
            args: args.join(" "),
            source,
        })
    }

    /// Run `args` and return the non-blank, trimmed output lines.
    pub fn lines(&self, args: &[&str]) -> Result<Vec<String>, GitError> {
        let output = self.exec_output(args)?;
        if !output.success() {
            debug!(args = ?args, code = ?output.code, "git exited unsuccessfully");
            return Err(GitError::Failed {
                args: args.join(" "),
                code: output.code,
            });
        }
        Ok(split_lines(&output.text))
    }

    /// Run interactively, inheriting stdio.
    pub fn run(&self, args: &[String]) -> Result<(), GitError> {
        let full: Vec<String> = self.global_flags.iter().chain(args).cloned().collect();
        debug!(args = ?full, "spawning git");
        let code = self.exec.status(&full).map_err(|source| GitError::Spawn {
            args: args.join(" "),
            source,
        })?;
        if code == Some(0) {
            Ok(())
        } else {
            Err(GitError::Failed {
                args: args.join(" "),
                code,
            })
        }
    }

    fn first_line(&self, args: &[&str]) -> Result<String, GitError> {
        Ok(self.lines(args)?.into_iter().next().unwrap_or_default())
    }

    #[allow(dead_code)]
    pub fn version(&self) -> Result<String, GitError> {
        self.first_line(&["version"]).map_err(|_| GitError::Version)
    }

    /// Absolute path of the repository's metadata directory.
    #[instrument(skip(self))]
    #[allow(dead_code)]
    pub fn dir(&self) -> Result<PathBuf, GitError> {
        if let Some(dir) = self.dir.get() {
            return Ok(dir.clone());
        }

        let git_dir = self
            .lines(&["rev-parse", "-q", "--git-dir"])
            .ok()
            .and_then(|lines| lines.into_iter().next())
            .ok_or(GitError::NotARepo)?;

        let resolved = self.resolve(Path::new(&git_dir))?;
        debug!(dir = %resolved.display(), "resolved git dir");
        Ok(self.dir.get_or_init(|| resolved).clone())
    }

    /// Base directory accumulated from every `-C` global flag, in order.
    pub fn chdir_base(&self) -> Option<PathBuf> {
        let mut base: Option<PathBuf> = None;
        let mut flags = self.global_flags.iter();
        while let Some(flag) = flags.next() {
            if flag != "-C" {
                continue;
            }
            let Some(dir) = flags.next() else { break };
            let dir = Path::new(dir);
            base = Some(match base {
                Some(prev) if dir.is_relative() => prev.join(dir),
                _ => dir.to_path_buf(),
            });
        }
        base
    }

    /// Make a path printed by git absolute, honouring `-C` overrides.
    fn resolve(&self, path: &Path) -> Result<PathBuf, GitError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let joined = match self.chdir_base() {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        };
        let absolute = if joined.is_absolute() {
            joined
        } else {
            std::env::current_dir()?.join(joined)
        };
        Ok(clean(&absolute))
    }

    #[allow(dead_code)]
    pub fn workdir_name(&self) -> Result<String, GitError> {
        self.first_line(&["rev-parse", "--show-toplevel"])
    }

    /// Whether `segments` exists inside the metadata directory.
    #[allow(dead_code)]
    pub fn has_file(&self, segments: &[&str]) -> bool {
        let relative: PathBuf = segments.iter().collect();
        let relative_str = relative.to_string_lossy();

        // --git-path is understood by git 2.5.0 and later
        if let Ok(lines) = self.lines(&["rev-parse", "-q", "--git-path", relative_str.as_ref()]) {
            if let Some(first) = lines.first().filter(|l| l.as_str() != "--git-path") {
                if let Ok(path) = self.resolve(Path::new(first)) {
                    if path.exists() {
                        return true;
                    }
                }
            }
        }

        match self.dir() {
            Ok(dir) => dir.join(relative).exists(),
            Err(_) => false,
        }
    }

    /// Read a symbolic ref file such as `HEAD` and return the ref it points at.
    #[allow(dead_code)]
    pub fn branch_at_ref(&self, paths: &[&str]) -> Result<String, GitError> {
        let mut path = self.dir()?;
        path.extend(paths);

        let content = fs::read_to_string(&path).map_err(|source| GitError::ReadRef {
            path: path.clone(),
            source,
        })?;

        match content.strip_prefix(REF_PREFIX) {
            Some(name) => Ok(name.trim().to_string()),
            None => Err(GitError::NoBranchInfo { path, content }),
        }
    }

    #[allow(dead_code)]
    pub fn head(&self) -> Result<String, GitError> {
        self.branch_at_ref(&["HEAD"])
    }

    #[allow(dead_code)]
    pub fn symbolic_full_name(&self, name: &str) -> Result<String, GitError> {
        self.first_line(&["rev-parse", "--symbolic-full-name", name])
            .map_err(|_| GitError::UnknownRevision(name.to_string()))
    }

    #[allow(dead_code)]
    pub fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        self.first_line(&["rev-parse", "-q", rev])
            .map_err(|_| GitError::UnknownRevision(rev.to_string()))
    }

    /// Commits on `b` that are not on `a`, skipping merges and cherry-picked
    /// equivalents. An empty list is not an error.
    #[allow(dead_code)]
    pub fn ref_list(&self, a: &str, b: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{}...{}", a, b);
        self.lines(&["rev-list", "--cherry-pick", "--right-only", "--no-merges", range.as_str()])
            .map_err(|_| GitError::RevList(range))
    }

    /// Subject and body of a single commit.
    #[allow(dead_code)]
    pub fn show(&self, sha: &str) -> Result<String, GitError> {
        let output = self.exec_output(&["show", "-s", "--format=%s%n%+b", sha])?;
        if !output.success() {
            return Err(GitError::UnknownRevision(sha.to_string()));
        }
        Ok(output.text.trim().to_string())
    }

    /// Human-readable log of the commits between `a` and `b`.
    #[allow(dead_code)]
    pub fn log(&self, a: &str, b: &str) -> Result<String, GitError> {
        let range = format!("{}...{}", a, b);
        let output = self.exec_output(&[
            "log",
            "--no-color",
            "--format=%h (%aN, %ar)%n%w(78,3,3)%s%n%+b",
            "--cherry",
            range.as_str(),
        ])?;
        if !output.success() {
            return Err(GitError::Log(format!("{}..{}", a, b)));
        }
        Ok(output.text)
    }

    pub fn remotes(&self) -> Result<Vec<String>, GitError> {
        self.lines(&["remote", "-v"])
    }

    pub fn has_remote(&self, name: &str) -> Result<bool, GitError> {
        Ok(self
            .remotes()?
            .iter()
            .any(|line| line.split_whitespace().next() == Some(name)))
    }

    #[allow(dead_code)]
    pub fn config(&self, name: &str) -> Result<String, GitError> {
        self.get_config(&[name])
    }

    #[allow(dead_code)]
    pub fn config_all(&self, name: &str) -> Result<Vec<String>, GitError> {
        self.lines(&["config", "--get-all", name])
            .map_err(|_| GitError::UnknownConfig(name.to_string()))
    }

    #[allow(dead_code)]
    pub fn global_config(&self, name: &str) -> Result<String, GitError> {
        self.get_config(&["--global", name])
    }

    #[allow(dead_code)]
    pub fn set_global_config(&self, name: &str, value: &str) -> Result<(), GitError> {
        self.lines(&["config", "--global", name, value])
            .map(|_| ())
            .map_err(|_| GitError::ConfigWrite(name.to_string()))
    }

    #[allow(dead_code)]
    pub fn comment_char(&self) -> String {
        self.config("core.commentchar")
            .unwrap_or_else(|_| "#".to_string())
    }

    #[allow(dead_code)]
    pub fn alias(&self, name: &str) -> Result<String, GitError> {
        self.config(&format!("alias.{}", name))
    }

    fn get_config(&self, args: &[&str]) -> Result<String, GitError> {
        let key = args.last().copied().unwrap_or_default();
        let mut full = vec!["config"];
        full.extend_from_slice(args);
        self.first_line(&full)
            .map_err(|_| GitError::UnknownConfig(key.to_string()))
    }

    /// Whether `dir` is a git metadata directory. Global flags are not applied.
    #[allow(dead_code)]
    pub fn is_git_dir(&self, dir: &Path) -> bool {
        let args = vec![
            format!("--git-dir={}", dir.display()),
            "rev-parse".to_string(),
            "--git-dir".to_string(),
        ];
        matches!(self.exec.output(&args), Ok(out) if out.success())
    }
}

/// Split command output into trimmed lines, dropping blank ones.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lexically normalize `path`, removing `.` and resolving `..`.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
