use crate::error::Result;
use crate::runner::{CommandOutput, CommandRunner, ToolCommand};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

struct Rule {
    prefix: Vec<String>,
    responses: VecDeque<CommandOutput>,
}

/// Scripted runner for testing without spawning processes.
///
/// Responses are keyed by an argument prefix; the longest matching prefix
/// wins. A rule with several responses hands them out in order and keeps
/// repeating the last one. Unmatched commands succeed with no output.
/// Every command is recorded.
pub struct MockRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<ToolCommand>>,
    consumed: Mutex<Vec<usize>>,
}

impl MockRunner {
    /// Create a runner where every command succeeds silently
    pub fn new() -> Self {
        MockRunner {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
            consumed: Mutex::new(Vec::new()),
        }
    }

    /// Respond to commands whose arguments start with `prefix`
    pub fn on<I, S>(self, prefix: I, output: CommandOutput) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_sequence(prefix, vec![output])
    }

    /// Respond with `outputs` in order, repeating the last one
    pub fn on_sequence<I, S>(mut self, prefix: I, outputs: Vec<CommandOutput>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(Rule {
            prefix: prefix.into_iter().map(Into::into).collect(),
            responses: outputs.into(),
        });
        lock(&self.consumed).push(0);
        self
    }

    /// All commands run so far, in order
    pub fn calls(&self) -> Vec<ToolCommand> {
        lock(&self.calls).clone()
    }

    /// Recorded commands rendered as strings
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Number of recorded commands whose arguments start with `prefix`
    pub fn count(&self, prefix: &[&str]) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|cmd| starts_with(&cmd.args, prefix))
            .count()
    }

    fn respond(&self, command: &ToolCommand) -> CommandOutput {
        let best = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| starts_with(&command.args, &rule.prefix))
            .max_by_key(|(index, rule)| (rule.prefix.len(), *index));

        let Some((index, rule)) = best else {
            return CommandOutput::default();
        };

        let mut consumed = lock(&self.consumed);
        let position = consumed[index].min(rule.responses.len().saturating_sub(1));
        consumed[index] += 1;
        rule.responses.get(position).cloned().unwrap_or_default()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        lock(&self.calls).push(command.clone());
        Ok(self.respond(command))
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    args.len() >= prefix.len()
        && args
            .iter()
            .zip(prefix)
            .all(|(arg, expected)| arg == expected.as_ref())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
