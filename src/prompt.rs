//! Line-oriented questions to the user on the terminal.

use std::io;

use console::Term;

/// Asks a question and returns the line typed in answer.
pub trait Prompter {
    fn ask(&self, question: &str) -> io::Result<String>;
}

impl Prompter for Term {
    fn ask(&self, question: &str) -> io::Result<String> {
        self.write_str(question)?;
        self.flush()?;
        self.read_line()
    }
}

/// Answers questions from a fixed script; an exhausted script answers "".
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::sync::Mutex<std::collections::VecDeque<String>>,
    asked: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Prompter for &ScriptedPrompter {
    fn ask(&self, question: &str) -> io::Result<String> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}
