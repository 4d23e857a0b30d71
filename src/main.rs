mod args;
mod checkout;
mod config;
mod git;
mod pr;
mod runner;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use args::Invocation;
use checkout::{CheckoutRewriter, Outcome};
use git::{Git, SystemExec};
use pr::template::{self, TemplateKind};
use pr::GitHubClient;
use runner::{Mode, RunError};

const CHECKOUT: &str = "checkout";

/// pr-checkout: check out GitHub pull requests the way you check out branches.
///
/// Anything that is not a pull request URL is passed to `git checkout` unchanged.
#[derive(Parser, Debug)]
#[command(
    name = "pr-checkout",
    version,
    about,
    allow_external_subcommands = true,
    after_help = "Git commands:\n  checkout <PULLREQ-URL> [<BRANCH>]  Check out the head of a pull request as a local branch\n\nExample: pr-checkout checkout https://github.com/jingweno/gh/pull/73"
)]
struct Cli {
    /// Run as if git was started in <DIR>. May be given more than once.
    #[arg(short = 'C', value_name = "DIR")]
    chdir: Vec<String>,

    /// Print the git commands that would run instead of running them
    #[arg(long)]
    noop: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the pull request or issue template of the current directory
    Template {
        #[arg(value_enum)]
        kind: TemplateKind,
    },

    /// A git command and its arguments, exactly as typed
    #[command(external_subcommand)]
    Git(Vec<String>),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match passthrough_code(err.as_ref()) {
            // git has already reported the failure itself
            Some(code) => ExitCode::from(code),
            None => {
                eprintln!("{} {}", "error:".red().bold(), err);
                ExitCode::FAILURE
            }
        },
    }
}

/// Exit status to forward when `err` is a git command that failed on its own.
fn passthrough_code(err: &(dyn Error + 'static)) -> Option<u8> {
    match err.downcast_ref::<RunError>() {
        Some(RunError::Failed { command, code }) => {
            debug!(%command, ?code, "git command failed");
            Some(code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1))
        }
        _ => None,
    }
}

/// Split an external subcommand into the checkout parameters. Only
/// `checkout` is forwarded to git.
fn checkout_params(mut argv: Vec<String>) -> Result<Vec<String>, String> {
    if argv.first().map(String::as_str) != Some(CHECKOUT) {
        let name = argv.first().cloned().unwrap_or_default();
        return Err(format!("unrecognized subcommand '{}'", name));
    }
    argv.remove(0);
    Ok(argv)
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut git = Git::new(SystemExec::new());
    for dir in &cli.chdir {
        git.register_global_flags(["-C", dir.as_str()]);
    }
    // config and templates live in the directory git runs in
    let root = git.chdir_base().unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Command::Template { kind } => {
            let body = template::find_template(&root, kind)?;
            if !body.is_empty() {
                println!("{}", body);
            }
        }
        Command::Git(argv) => {
            let params = checkout_params(argv)?;
            let config = config::Config::load(&root)?;

            let invocation = Invocation::new(CHECKOUT, params);
            let client = GitHubClient::new(&config);
            let rewriter = CheckoutRewriter::new(&git, &client, &config);

            let span = info_span!("checkout", params = ?invocation.params());
            let invocation = match rewriter.rewrite(&invocation).instrument(span).await? {
                Outcome::NotApplicable => invocation,
                Outcome::Rewritten(rewritten) => {
                    info!(queued = rewritten.queued().len(), "checking out pull request");
                    rewritten
                }
            };

            let mode = if cli.noop { Mode::Noop } else { Mode::Execute };
            runner::execute(&git, &invocation, mode, &mut io::stdout().lock())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout_args(argv: &[&str]) -> Vec<String> {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Git(argv) => checkout_params(argv).unwrap(),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_separator_reaches_git() {
        assert_eq!(checkout_args(&["pr-checkout", "checkout", "--", "main"]), ["--", "main"]);
        assert_eq!(
            checkout_args(&["pr-checkout", "checkout", "main", "--", "file.txt"]),
            ["main", "--", "file.txt"]
        );
    }

    #[test]
    fn test_help_and_flags_reach_git() {
        assert_eq!(checkout_args(&["pr-checkout", "checkout", "-h"]), ["-h"]);
        assert_eq!(
            checkout_args(&["pr-checkout", "checkout", "--help", "-q", "-C", "x"]),
            ["--help", "-q", "-C", "x"]
        );
    }

    #[test]
    fn test_empty_checkout() {
        assert!(checkout_args(&["pr-checkout", "checkout"]).is_empty());
    }

    #[test]
    fn test_global_options_before_checkout() {
        let cli = Cli::try_parse_from([
            "pr-checkout", "-C", "/a", "-C", "b", "--noop", "checkout",
            "https://github.com/o/r/pull/1",
        ])
        .unwrap();
        assert_eq!(cli.chdir, ["/a", "b"]);
        assert!(cli.noop);
        assert_eq!(
            cli.command,
            Command::Git(vec!["checkout".to_string(), "https://github.com/o/r/pull/1".to_string()])
        );
    }

    #[test]
    fn test_other_git_commands_are_rejected() {
        let cli = Cli::try_parse_from(["pr-checkout", "push", "origin"]).unwrap();
        let Command::Git(argv) = cli.command else {
            panic!("expected external command");
        };
        assert_eq!(checkout_params(argv).unwrap_err(), "unrecognized subcommand 'push'");
    }

    #[test]
    fn test_template_subcommand() {
        let cli = Cli::try_parse_from(["pr-checkout", "template", "pull-request"]).unwrap();
        assert_eq!(cli.command, Command::Template { kind: TemplateKind::PullRequest });
    }

    #[test]
    fn test_passthrough_code() {
        let failed: Box<dyn Error> = Box::new(RunError::Failed {
            command: "checkout nope".to_string(),
            code: Some(128),
        });
        assert_eq!(passthrough_code(failed.as_ref()), Some(128));

        let signalled: Box<dyn Error> = Box::new(RunError::Failed {
            command: "fetch".to_string(),
            code: None,
        });
        assert_eq!(passthrough_code(signalled.as_ref()), Some(1));

        let other: Box<dyn Error> = "unrecognized subcommand 'push'".into();
        assert_eq!(passthrough_code(other.as_ref()), None);
    }
}
