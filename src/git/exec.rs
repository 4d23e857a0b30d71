use std::io;
use std::process::{Command, Stdio};

/// Captured result of a non-interactive git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub text: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the git binary. `args` never includes the program name.
pub trait Exec {
    /// Run to completion and capture combined output.
    fn output(&self, args: &[String]) -> io::Result<ExecOutput>;

    /// Run with inherited stdio and return the exit code.
    fn status(&self, args: &[String]) -> io::Result<Option<i32>>;
}

/// `Exec` backed by the `git` found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemExec {
    program: String,
}

impl SystemExec {
    pub fn new() -> Self {
        SystemExec {
            program: "git".to_string(),
        }
    }
}

impl Default for SystemExec {
    fn default() -> Self {
        Self::new()
    }
}

impl Exec for SystemExec {
    fn output(&self, args: &[String]) -> io::Result<ExecOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            code: output.status.code(),
            text,
        })
    }

    fn status(&self, args: &[String]) -> io::Result<Option<i32>> {
        let status = Command::new(&self.program).args(args).status()?;
        Ok(status.code())
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    #[derive(Default)]
    struct Script {
        replies: HashMap<String, VecDeque<ExecOutput>>,
        calls: Vec<Vec<String>>,
    }

    /// Test double that answers by exact argv (joined with spaces) and
    /// records every call. Unknown commands exit 1 with no output.
    /// Clones share the same script.
    #[derive(Clone, Default)]
    pub struct ScriptedExec {
        inner: Rc<RefCell<Script>>,
    }

    impl ScriptedExec {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful reply. Replies for one argv are consumed in
        /// order; the last one keeps answering.
        pub fn ok(&self, argv: &str, text: &str) -> &Self {
            self.reply(argv, Some(0), text)
        }

        pub fn fail(&self, argv: &str, code: i32) -> &Self {
            self.reply(argv, Some(code), "")
        }

        fn reply(&self, argv: &str, code: Option<i32>, text: &str) -> &Self {
            self.inner
                .borrow_mut()
                .replies
                .entry(argv.to_string())
                .or_default()
                .push_back(ExecOutput {
                    code,
                    text: text.to_string(),
                });
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.inner
                .borrow()
                .calls
                .iter()
                .map(|c| c.join(" "))
                .collect()
        }

        fn answer(&self, args: &[String]) -> ExecOutput {
            let mut script = self.inner.borrow_mut();
            script.calls.push(args.to_vec());
            let key = args.join(" ");
            match script.replies.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(failure),
                Some(queue) => queue.front().cloned().unwrap_or_else(failure),
                None => failure(),
            }
        }
    }

    fn failure() -> ExecOutput {
        ExecOutput {
            code: Some(1),
            text: String::new(),
        }
    }

    impl Exec for ScriptedExec {
        fn output(&self, args: &[String]) -> io::Result<ExecOutput> {
            Ok(self.answer(args))
        }

        fn status(&self, args: &[String]) -> io::Result<Option<i32>> {
            Ok(self.answer(args).code)
        }
    }
}
