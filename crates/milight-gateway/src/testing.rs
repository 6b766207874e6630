//! In-crate recording radio for unit tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use milight_protocol::RadioConfig;

use crate::error::RadioError;
use crate::radio::{Radio, RadioFactory};

#[derive(Default)]
struct Log {
    writes: Vec<(usize, Vec<u8>)>,
    configures: HashMap<usize, usize>,
    fail_begin: HashSet<usize>,
    inbox: HashMap<usize, VecDeque<Vec<u8>>>,
}

#[derive(Clone, Default)]
pub struct RecordingLog(Rc<RefCell<Log>>);

impl RecordingLog {
    pub fn configures(&self, index: usize) -> usize {
        self.0.borrow().configures.get(&index).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(usize, Vec<u8>)> {
        self.0.borrow().writes.clone()
    }

    pub fn fail_begin(&self, index: usize) {
        self.0.borrow_mut().fail_begin.insert(index);
    }

    pub fn inject(&self, index: usize, frame: &[u8]) {
        self.0
            .borrow_mut()
            .inbox
            .entry(index)
            .or_default()
            .push_back(frame.to_vec());
    }
}

pub struct RecordingRadio {
    config: &'static RadioConfig,
    log: RecordingLog,
}

impl Radio for RecordingRadio {
    fn begin(&mut self) -> Result<(), RadioError> {
        if self.log.0.borrow().fail_begin.contains(&self.config.index) {
            return Err(RadioError::Io("begin failed".into()));
        }
        Ok(())
    }

    fn configure(&mut self) -> Result<(), RadioError> {
        *self
            .log
            .0
            .borrow_mut()
            .configures
            .entry(self.config.index)
            .or_default() += 1;
        Ok(())
    }

    fn available(&mut self) -> bool {
        self.log
            .0
            .borrow()
            .inbox
            .get(&self.config.index)
            .is_some_and(|q| !q.is_empty())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        let frame = self
            .log
            .0
            .borrow_mut()
            .inbox
            .get_mut(&self.config.index)
            .and_then(|q| q.pop_front());
        match frame {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        self.log
            .0
            .borrow_mut()
            .writes
            .push((self.config.index, frame.to_vec()));
        Ok(())
    }

    fn config(&self) -> &'static RadioConfig {
        self.config
    }
}

pub struct RecordingFactory {
    log: RecordingLog,
}

impl RecordingFactory {
    pub fn new(log: RecordingLog) -> Self {
        Self { log }
    }
}

impl RadioFactory for RecordingFactory {
    fn create(&self, config: &'static RadioConfig) -> Box<dyn Radio> {
        Box::new(RecordingRadio {
            config,
            log: self.log.clone(),
        })
    }
}
