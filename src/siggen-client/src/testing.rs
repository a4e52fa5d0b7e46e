// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use siggen_core::{GenError, GenResult};

use crate::transport::{Transport, TransportFactory, TransportFuture};

/// What the fake device does in response to the next written line.
#[derive(Debug, Clone)]
pub enum Reply {
    Line(String),
    Delayed(Duration, String),
    Silence,
    WriteFault,
    /// The write never completes, like a port held back by flow control.
    WriteStall,
}

impl Reply {
    pub fn line(text: &str) -> Self {
        Reply::Line(text.to_string())
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    written: Vec<u8>,
    ready: VecDeque<(Instant, Vec<u8>)>,
    opens: usize,
    closes: usize,
    fail_open: bool,
}

/// Test-side view of a script shared with one or more transports.
#[derive(Clone)]
pub struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptHandle {
    pub fn new(replies: Vec<Reply>) -> Self {
        ScriptHandle(Arc::new(Mutex::new(Script {
            replies: replies.into(),
            ..Default::default()
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn written_bytes(&self) -> usize {
        self.lock().written.len()
    }

    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.lock().written)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Factory handing out transports bound to this script.
    pub fn factory(&self) -> TransportFactory {
        let handle = self.clone();
        Arc::new(move |port: &str| -> GenResult<Box<dyn Transport>> {
            let mut script = handle.lock();
            if script.fail_open {
                return Err(GenError::PortUnavailable {
                    port: port.to_string(),
                    reason: "scripted open failure".to_string(),
                });
            }
            script.opens += 1;
            drop(script);
            Ok(Box::new(ScriptedTransport {
                port: port.to_string(),
                script: handle.clone(),
                open: true,
            }))
        })
    }
}

pub struct ScriptedTransport {
    port: String,
    script: ScriptHandle,
    open: bool,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> (Self, ScriptHandle) {
        let script = ScriptHandle::new(replies);
        let transport = ScriptedTransport {
            port: "scripted".to_string(),
            script: script.clone(),
            open: true,
        };
        (transport, script)
    }

    fn do_write(&mut self, bytes: &[u8]) -> GenResult<()> {
        if !self.open {
            return Err(GenError::link("scripted transport is closed"));
        }
        let mut script = self.script.lock();
        let lines = bytes.iter().filter(|b| **b == b'\n').count();
        for _ in 0..lines {
            match script.replies.pop_front() {
                Some(Reply::WriteFault) => return Err(GenError::link("write failed: broken pipe")),
                Some(Reply::Line(text)) => {
                    script.ready.push_back((Instant::now(), format!("{text}\n").into_bytes()))
                }
                Some(Reply::Delayed(delay, text)) => script
                    .ready
                    .push_back((Instant::now() + delay, format!("{text}\n").into_bytes())),
                Some(Reply::Silence) | Some(Reply::WriteStall) | None => {}
            }
        }
        script.written.extend_from_slice(bytes);
        Ok(())
    }

    fn do_read_line(&mut self) -> GenResult<Vec<u8>> {
        if !self.open {
            return Err(GenError::link("scripted transport is closed"));
        }
        let mut script = self.script.lock();
        let now = Instant::now();
        match script.ready.front() {
            Some((at, _)) if *at <= now => {}
            _ => return Ok(Vec::new()),
        }
        let Some((at, mut chunk)) = script.ready.pop_front() else {
            return Ok(Vec::new());
        };
        if let Some(pos) = chunk.iter().position(|b| *b == b'\n') {
            let rest = chunk.split_off(pos + 1);
            if !rest.is_empty() {
                script.ready.push_front((at, rest));
            }
        }
        Ok(chunk)
    }
}

impl Transport for ScriptedTransport {
    fn port_name(&self) -> &str {
        &self.port
    }

    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()> {
        if self.open {
            let mut script = self.script.lock();
            if matches!(script.replies.front(), Some(Reply::WriteStall)) {
                script.replies.pop_front();
                return Box::pin(std::future::pending());
            }
        }
        Box::pin(std::future::ready(self.do_write(bytes)))
    }

    fn has_input(&mut self) -> GenResult<bool> {
        if !self.open {
            return Err(GenError::link("scripted transport is closed"));
        }
        let now = Instant::now();
        Ok(self
            .script
            .lock()
            .ready
            .front()
            .is_some_and(|(at, _)| *at <= now))
    }

    fn read_line<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>> {
        Box::pin(std::future::ready(self.do_read_line()))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.script.lock().closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
