/// One command line to hand to git, without the leading `git`.
pub type Argv = Vec<String>;

/// A git invocation as typed by the user: the subcommand, its parameters,
/// and the auxiliary commands that must run before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    params: Vec<String>,
    before: CommandQueue,
}

impl Invocation {
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            command: command.to_string(),
            params: params.into_iter().map(Into::into).collect(),
            before: CommandQueue::default(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Parameters that are not flags, in their original order.
    pub fn positional(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| !p.starts_with('-'))
            .map(String::as_str)
            .collect()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.params.iter().position(|p| p == token)
    }

    /// Remove the parameter at `index`. The index must come from `index_of`.
    pub fn remove_at(&mut self, index: usize) -> String {
        self.params.remove(index)
    }

    /// Insert `tokens` at `index`, shifting everything at or after it to the right.
    pub fn insert_at<I, S>(&mut self, index: usize, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tail = self.params.split_off(index);
        self.params.extend(tokens.into_iter().map(Into::into));
        self.params.extend(tail);
    }

    /// Queue an auxiliary command to run before this one.
    pub fn queue_before<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before.push(tokens.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn queued(&self) -> &CommandQueue {
        &self.before
    }

    /// The primary command line: subcommand followed by its parameters.
    pub fn argv(&self) -> Argv {
        std::iter::once(self.command.clone())
            .chain(self.params.iter().cloned())
            .collect()
    }
}

/// FIFO of auxiliary commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    commands: Vec<Argv>,
}

impl CommandQueue {
    pub fn push(&mut self, argv: Argv) {
        self.commands.push(argv);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argv> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a CommandQueue {
    type Item = &'a Argv;
    type IntoIter = std::slice::Iter<'a, Argv>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
