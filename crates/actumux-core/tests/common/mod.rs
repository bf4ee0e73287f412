//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use actumux_core::link::{LinkError, SerialLink};

#[derive(Default)]
struct ScriptState {
    open: bool,
    fail_next_opens: usize,
    replies: VecDeque<Result<String, String>>,
    log: Vec<String>,
}

/// Handle to a scripted serial link: queue up replies and faults ahead
/// of time, then inspect the log of opens/closes/commands afterwards.
#[derive(Clone, Default)]
pub struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box a link driven by this script, for handing to the broker
    pub fn link(&self) -> Box<dyn SerialLink> {
        Box::new(ScriptedLink(self.clone()))
    }

    /// Queue a successful reply for the next transaction
    pub fn push_reply(&self, reply: &str) {
        self.0.lock().unwrap().replies.push_back(Ok(reply.to_string()));
    }

    /// Queue a link fault for the next transaction
    pub fn push_fault(&self) {
        self.0
            .lock()
            .unwrap()
            .replies
            .push_back(Err("scripted fault".to_string()));
    }

    /// Make the next `open()` fail
    pub fn fail_next_open(&self) {
        self.0.lock().unwrap().fail_next_opens += 1;
    }

    pub fn is_open(&self) -> bool {
        self.0.lock().unwrap().open
    }

    /// Everything the link was asked to do, in order: "open", "close",
    /// "cmd:<line>"
    pub fn log(&self) -> Vec<String> {
        self.0.lock().unwrap().log.clone()
    }
}

struct ScriptedLink(Script);

impl SerialLink for ScriptedLink {
    fn open(&mut self) -> Result<(), LinkError> {
        let mut state = self.0 .0.lock().unwrap();
        state.log.push("open".to_string());
        if state.fail_next_opens > 0 {
            state.fail_next_opens -= 1;
            return Err(LinkError::Unavailable("scripted open failure".to_string()));
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.0 .0.lock().unwrap();
        if state.open {
            state.open = false;
            state.log.push("close".to_string());
        }
    }

    fn is_open(&self) -> bool {
        self.0 .0.lock().unwrap().open
    }

    fn transact(&mut self, command: &str) -> Result<String, LinkError> {
        let mut state = self.0 .0.lock().unwrap();
        if !state.open {
            return Err(LinkError::Fault("link not open".to_string()));
        }
        state.log.push(format!("cmd:{command}"));
        match state.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => {
                // Faults close the link, like the hardware link does
                state.open = false;
                state.log.push("close".to_string());
                Err(LinkError::Fault(message))
            }
            None => Ok("OK".to_string()),
        }
    }
}
