//! In-process register file
//!
//! A [`MemoryBank`] behaves like a mapped window of ordinary memory and logs
//! every register access, so callers can assert on exactly which registers a
//! batch touched. No hardware required: used by the test suites and by the
//! CLI's `--dry-run` mode.

use crate::bank::{check_access, RegisterBank};
use crate::error::Result;
use std::cell::RefCell;

/// One logged register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Register read
    Read {
        /// Byte offset
        offset: usize,
        /// Access width in bytes
        width: usize,
    },
    /// Register write
    Write {
        /// Byte offset
        offset: usize,
        /// Access width in bytes
        width: usize,
        /// Value written, native byte order
        value: u32,
    },
}

/// Register file backed by a byte vector, recording every access
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    bytes: Vec<u8>,
    log: RefCell<Vec<Access>>,
}

impl MemoryBank {
    /// Zero-filled window of `len` bytes
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::from_bytes(vec![0; len])
    }

    /// Window initialised from raw bytes
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            log: RefCell::new(Vec::new()),
        }
    }

    /// Window initialised from 32-bit words in native byte order
    #[must_use]
    pub fn from_words(words: &[u32]) -> Self {
        Self::from_bytes(words.iter().flat_map(|w| w.to_ne_bytes()).collect())
    }

    /// Raw contents, without logging
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 32-bit word at `offset` in native order, without logging
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the window.
    #[must_use]
    pub fn word(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_ne_bytes(raw)
    }

    /// Store a 32-bit word without logging, to stage hardware state
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the window.
    pub fn poke(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    /// Every access since creation or the last [`clear_log`](Self::clear_log)
    #[must_use]
    pub fn accesses(&self) -> Vec<Access> {
        self.log.borrow().clone()
    }

    /// Logged writes as `(offset, value)` pairs
    #[must_use]
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match *a {
                Access::Write { offset, value, .. } => Some((offset, value)),
                Access::Read { .. } => None,
            })
            .collect()
    }

    /// Number of logged reads
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| matches!(a, Access::Read { .. }))
            .count()
    }

    /// Forget logged accesses
    pub fn clear_log(&mut self) {
        self.log.get_mut().clear();
    }

    fn load<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        check_access(offset, N, self.bytes.len())?;
        self.log.borrow_mut().push(Access::Read { offset, width: N });
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.bytes[offset..offset + N]);
        Ok(raw)
    }

    fn store<const N: usize>(&mut self, offset: usize, raw: [u8; N], value: u32) -> Result<()> {
        check_access(offset, N, self.bytes.len())?;
        self.log.get_mut().push(Access::Write {
            offset,
            width: N,
            value,
        });
        self.bytes[offset..offset + N].copy_from_slice(&raw);
        Ok(())
    }
}

impl RegisterBank for MemoryBank {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read_u8(&self, offset: usize) -> Result<u8> {
        self.load::<1>(offset).map(u8::from_ne_bytes)
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        self.load::<2>(offset).map(u16::from_ne_bytes)
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        self.load::<4>(offset).map(u32::from_ne_bytes)
    }

    fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.store(offset, value.to_ne_bytes(), u32::from(value))
    }

    fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.store(offset, value.to_ne_bytes(), u32::from(value))
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.store(offset, value.to_ne_bytes(), value)
    }
}
