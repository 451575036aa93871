//! Keyset routing.
//!
//! Encryption always uses the primary key and writes its identifier first.
//! Decryption looks at the first [`PREFIX_LEN`] bytes and tries every enabled
//! prefixed key with that identifier on the rest of the ciphertext, then
//! falls back to every enabled raw key on the whole ciphertext. The first
//! key that succeeds wins.
//!
//! FF3-1 has no integrity check, so "succeeds" only means the key accepted
//! the input. A raw key will decrypt any well-formed ciphertext into
//! something; prefixed keys are what make routing exact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::cipher::Fpe;
use crate::error::FpeError;
use crate::keyset::{OutputPrefixType, PREFIX_LEN};
use crate::params::FpeParams;

/// One enabled key as seen by the router.
pub(crate) struct RouterEntry {
    key_id: u32,
    output_prefix_type: OutputPrefixType,
    identifier: Vec<u8>,
    primitive: Box<dyn Fpe>,
}

impl RouterEntry {
    pub(crate) fn new(key_id: u32, output_prefix_type: OutputPrefixType, primitive: Box<dyn Fpe>) -> Self {
        Self {
            key_id,
            output_prefix_type,
            identifier: output_prefix_type.identifier(key_id),
            primitive,
        }
    }

    fn try_decrypt(&self, ciphertext: &[u8], params: &FpeParams) -> Option<Decrypted> {
        match self.primitive.decrypt_with(ciphertext, params) {
            Ok(plaintext) => Some(Decrypted {
                key_id: self.key_id,
                input_len: ciphertext.len(),
                plaintext,
            }),
            Err(err) => {
                debug!(key_id = self.key_id, error = %err, "key failed to decrypt");
                None
            }
        }
    }
}

/// Output of the key that decrypted, and how many bytes it was given.
struct Decrypted {
    key_id: u32,
    input_len: usize,
    plaintext: Vec<u8>,
}

/// [`Fpe`] over a whole keyset.
pub struct KeysetFpe {
    entries: Vec<RouterEntry>,
    primary: usize,
    // Set once the first sink is attached; calls skip the lock until then.
    has_audit_sinks: AtomicBool,
    audit_sinks: Mutex<Vec<Box<dyn AuditSink>>>,
}

impl KeysetFpe {
    pub(crate) fn new(entries: Vec<RouterEntry>, primary: usize) -> Self {
        Self {
            entries,
            primary,
            has_audit_sinks: AtomicBool::new(false),
            audit_sinks: Mutex::new(Vec::new()),
        }
    }

    /// Attach a sink that receives one record per encrypt or decrypt call.
    pub fn add_audit_sink(&self, sink: Box<dyn AuditSink>) {
        match self.audit_sinks.lock() {
            Ok(mut sinks) => {
                sinks.push(sink);
                self.has_audit_sinks.store(true, Ordering::Release);
            }
            Err(_) => warn!("audit sink lock poisoned, sink not added"),
        }
    }

    /// Id of the key used for encryption.
    pub fn primary_key_id(&self) -> u32 {
        self.entries[self.primary].key_id
    }

    fn audit(&self, operation: Operation, key_id: Option<u32>, input_len: usize, success: bool) {
        if !self.has_audit_sinks.load(Ordering::Acquire) {
            return;
        }
        let record = AuditRecord::new(operation, key_id, input_len, success);
        let Ok(mut sinks) = self.audit_sinks.lock() else {
            warn!(?operation, "audit sink lock poisoned, dropping record");
            return;
        };
        for sink in sinks.iter_mut() {
            sink.append(record.clone());
        }
    }

    /// Enabled prefixed keys whose identifier matches, tried on the rest.
    fn decrypt_prefixed(&self, ciphertext: &[u8], params: &FpeParams) -> Option<Decrypted> {
        if ciphertext.len() < PREFIX_LEN {
            return None;
        }
        let (prefix, rest) = ciphertext.split_at(PREFIX_LEN);
        self.entries
            .iter()
            .filter(|e| e.output_prefix_type.is_prefixed() && e.identifier == prefix)
            .find_map(|e| e.try_decrypt(rest, params))
    }

    /// Enabled raw keys, tried on the whole ciphertext.
    fn decrypt_raw(&self, ciphertext: &[u8], params: &FpeParams) -> Option<Decrypted> {
        self.entries
            .iter()
            .filter(|e| !e.output_prefix_type.is_prefixed())
            .find_map(|e| e.try_decrypt(ciphertext, params))
    }
}

impl Fpe for KeysetFpe {
    fn encrypt_with(&self, plaintext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError> {
        let primary = &self.entries[self.primary];
        match primary.primitive.encrypt_with(plaintext, params) {
            Ok(ciphertext) => {
                let mut output = Vec::with_capacity(primary.identifier.len() + ciphertext.len());
                output.extend_from_slice(&primary.identifier);
                output.extend_from_slice(&ciphertext);
                self.audit(Operation::Encrypt, Some(primary.key_id), plaintext.len(), true);
                Ok(output)
            }
            Err(err) => {
                self.audit(Operation::Encrypt, Some(primary.key_id), plaintext.len(), false);
                Err(err)
            }
        }
    }

    fn decrypt_with(&self, ciphertext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError> {
        let result = self
            .decrypt_prefixed(ciphertext, params)
            .or_else(|| self.decrypt_raw(ciphertext, params));

        match result {
            Some(decrypted) => {
                self.audit(Operation::Decrypt, Some(decrypted.key_id), decrypted.input_len, true);
                Ok(decrypted.plaintext)
            }
            None => {
                self.audit(Operation::Decrypt, None, ciphertext.len(), false);
                Err(FpeError::DecryptionFailed)
            }
        }
    }
}

impl std::fmt::Debug for KeysetFpe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<u32> = self.entries.iter().map(|e| e.key_id).collect();
        f.debug_struct("KeysetFpe")
            .field("primary_key_id", &self.primary_key_id())
            .field("key_ids", &ids)
            .finish_non_exhaustive()
    }
}
