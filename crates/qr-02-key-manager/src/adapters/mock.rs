//! Simulated secure module for tests.
//!
//! Answers every command deterministically from its input so tests can
//! predict keys, addresses and signatures without scripting each exchange.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::error::{KeyManagerError, KeyManagerResult};
use crate::ports::SerialChannel;

/// Shared view of a [`SimulatedSecureModule`] kept by the test.
#[derive(Debug, Clone, Default)]
pub struct ModuleProbe {
    available: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ModuleProbe {
    /// Unplug or replug the module.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Every request frame written so far.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().clone()
    }

    /// Digests received by Sign commands, in order.
    pub fn signed_digests(&self) -> Vec<Vec<u8>> {
        self.requests
            .lock()
            .iter()
            .filter(|frame| frame.starts_with(&[0x53, 0x48]))
            .map(|frame| frame[3..].to_vec())
            .collect()
    }
}

/// In-process stand-in for the secure module.
#[derive(Debug)]
pub struct SimulatedSecureModule {
    probe: ModuleProbe,
    open: bool,
}

impl SimulatedSecureModule {
    pub fn new() -> (Self, ModuleProbe) {
        let probe = ModuleProbe::default();
        probe.set_available(true);
        (
            Self {
                probe: probe.clone(),
                open: false,
            },
            probe,
        )
    }

    /// Signature the module returns for `digest`.
    pub fn signature_for(digest: &[u8]) -> Vec<u8> {
        let first = Sha256::digest([b"sig".as_slice(), digest].concat());
        let second = Sha256::digest(first);
        [first.as_slice(), second.as_slice()].concat()
    }

    fn respond(request: &[u8]) -> Vec<u8> {
        match request {
            [0x4E, 0x4B, slot] => {
                let mut key = vec![0x02];
                key.extend_from_slice(&Sha256::digest([b'k', *slot]));
                key
            }
            [0x44, 0x50, raw @ ..] => {
                let x = Sha256::digest(raw);
                let y = Sha256::digest(x);
                [x.as_slice(), y.as_slice()].concat()
            }
            [0x53, 0x48, _, digest @ ..] => Self::signature_for(digest),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl SerialChannel for SimulatedSecureModule {
    async fn open(&mut self) -> KeyManagerResult<()> {
        if !self.probe.available.load(Ordering::SeqCst) {
            return Err(KeyManagerError::SerialOpen {
                device: "simulated".to_string(),
                reason: "module unplugged".to_string(),
            });
        }
        if !self.open {
            self.probe.opens.fetch_add(1, Ordering::SeqCst);
            self.open = true;
        }
        Ok(())
    }

    async fn exchange(&mut self, request: &[u8], _timeout: Duration) -> KeyManagerResult<Vec<u8>> {
        if !self.open {
            return Err(KeyManagerError::ChannelClosed);
        }
        self.probe.requests.lock().push(request.to_vec());
        Ok(Self::respond(request))
    }

    async fn close(&mut self) {
        self.open = false;
    }
}
