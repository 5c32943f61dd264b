//! Scripted stand-in for the external tool.

use std::collections::HashMap;
use std::sync::Mutex;

use dumptruck_core::{DumpError, ExecutionResult, Invocation, Result};

use crate::runner::Runner;

#[derive(Debug, Clone)]
enum Reply {
    Exit(i32, Vec<u8>),
    Timeout,
}

/// Answers invocations by their arguments after the program name.
///
/// Unscripted arguments exit with status 2 and no output, which is how the
/// real tool reacts to unknown names.
#[derive(Default)]
pub struct FakeTool {
    replies: HashMap<Vec<String>, Reply>,
    calls: Mutex<Vec<Vec<String>>>,
}

fn key(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, args: &[&str], stdout: &str) -> Self {
        self.exit(args, 0, stdout)
    }

    pub fn exit(mut self, args: &[&str], code: i32, stdout: &str) -> Self {
        self.replies
            .insert(key(args), Reply::Exit(code, stdout.as_bytes().to_vec()));
        self
    }

    pub fn timeout(mut self, args: &[&str]) -> Self {
        self.replies.insert(key(args), Reply::Timeout);
        self
    }

    pub fn calls_to(&self, args: &[&str]) -> usize {
        let wanted = key(args);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == wanted)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Runner for FakeTool {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let args = invocation.tail().to_vec();
        self.calls.lock().unwrap().push(args.clone());
        match self.replies.get(&args) {
            Some(Reply::Exit(code, stdout)) => Ok(ExecutionResult::new(Some(*code), stdout.clone())),
            Some(Reply::Timeout) => Err(DumpError::Timeout {
                command: invocation.to_string(),
                timeout: invocation.timeout(),
            }),
            None => Ok(ExecutionResult::new(Some(2), Vec::new())),
        }
    }
}

/// Root help with the given services under the services heading.
pub fn root_help(services: &[&str]) -> String {
    let mut doc = String::from("AWS()\n\nN\x08NA\x08AM\x08ME\x08E\n       aws -\n\n");
    doc.push_str("A\x08AV\x08VA\x08AI\x08IL\x08LA\x08AB\x08BL\x08LE\x08E ");
    doc.push_str("S\x08SE\x08ER\x08RV\x08VI\x08IC\x08CE\x08ES\x08S\n");
    for service in services {
        doc.push_str(&format!("       +o {service}\n"));
    }
    doc.push_str("\nS\x08SE\x08EE\x08E A\x08AL\x08LS\x08SO\x08O\n       +o aws help topics\n");
    doc
}

/// Service help with the given subcommands under the commands heading.
pub fn service_help(service: &str, commands: &[&str]) -> String {
    let mut doc = format!(
        "{}()\n\nAVAILABLE C\x08CO\x08OM\x08MM\x08MA\x08AN\x08ND\x08DS\x08S\n",
        service.to_uppercase()
    );
    for command in commands {
        doc.push_str(&format!("       +o {command}\n"));
    }
    doc.push_str("\nS\x08SE\x08EE\x08E A\x08AL\x08LS\x08SO\x08O\n       +o list-after-section\n");
    doc
}
