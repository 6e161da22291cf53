//! Test doubles shared across unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::modem::CommandRunner;

/// A [`CommandRunner`] whose answers are scripted per command name, with a
/// fallback default for anything not explicitly queued. Also records how
/// many times each command was invoked, so tests can assert e.g. "`dial`
/// ran exactly once" without inspecting `Modem` internals.
#[derive(Default)]
pub struct ScriptedRunner {
    default: bool,
    sequences: Mutex<HashMap<String, VecDeque<bool>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedRunner {
    /// Every command succeeds (or fails, if `default` is false) unless a
    /// sequence was queued for it.
    pub fn always(default: bool) -> Self {
        Self {
            default,
            sequences: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a sequence of answers for a specific command string. Once the
    /// sequence is exhausted, subsequent calls fall back to `default`.
    pub fn with_sequence(self, command: &str, answers: Vec<bool>) -> Self {
        self.sequences
            .lock()
            .unwrap()
            .insert(command.to_string(), answers.into());
        self
    }

    pub fn calls(&self, command: &str) -> u32 {
        self.calls.lock().unwrap().get(command).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> bool {
        *self.calls.lock().unwrap().entry(command.to_string()).or_insert(0) += 1;

        let mut sequences = self.sequences.lock().unwrap();
        match sequences.get_mut(command).and_then(VecDeque::pop_front) {
            Some(answer) => answer,
            None => self.default,
        }
    }
}
