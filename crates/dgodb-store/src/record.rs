//! Object identities and stored object data

use std::fmt;
use std::sync::Arc;

/// Separator between an object's name and its version in unique names
pub const VERSION_SEPARATOR: &str = "-v";

/// Identity of one distinct object file
///
/// Records are cheap to clone: the name is shared, never copied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRecord {
    /// Name from the object header
    pub name: Arc<str>,
    /// Index of this variant among all variants with the same name
    pub version: u32,
    /// CRC-32 of the object bytes
    pub hash: u32,
}

impl ObjectRecord {
    /// Globally unique name, `<name>-v<version>`
    pub fn unique_name(&self) -> String {
        format!("{}{VERSION_SEPARATOR}{}", self.name, self.version)
    }
}

impl fmt::Display for ObjectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{VERSION_SEPARATOR}{}", self.name, self.version)
    }
}

/// One distinct object file owned by the store
///
/// The record and bytes are fixed at creation. Only the reference count and
/// the enrichment slot change afterwards.
#[derive(Debug, Clone)]
pub struct ObjectEntry<E = ()> {
    record: ObjectRecord,
    data: Vec<u8>,
    reference_count: u32,
    /// Analysis state attached by later processing stages
    pub enrichment: E,
}

impl<E: Default> ObjectEntry<E> {
    pub(crate) fn new(record: ObjectRecord, data: Vec<u8>) -> Self {
        Self {
            record,
            data,
            reference_count: 1,
            enrichment: E::default(),
        }
    }
}

impl<E> ObjectEntry<E> {
    /// Identity of this object
    pub const fn record(&self) -> &ObjectRecord {
        &self.record
    }

    /// Object bytes exactly as stored in the archive
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of archive occurrences seen, including the first
    pub const fn reference_count(&self) -> u32 {
        self.reference_count
    }

    /// Borrow the immutable parts and the enrichment slot at once
    pub fn split_mut(&mut self) -> (&ObjectRecord, &[u8], &mut E) {
        (&self.record, &self.data, &mut self.enrichment)
    }

    pub(crate) fn add_reference(&mut self) {
        self.reference_count += 1;
    }
}
