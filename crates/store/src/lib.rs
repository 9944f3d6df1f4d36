//! Per-object metrics stores.
//!
//! Objects are encoded on write. A scrape clones the ordered `Arc` handles
//! under the store lock and writes after releasing it, so a slow client never
//! holds up the reflector. Each store keeps UIDs in insertion order so scrape
//! output is stable across scrapes.

#![forbid(unsafe_code)]

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use ksm_core::{Encoded, Encoder, ObjectIdentity, Uid};
use ksm_kubehub::ObjectSink;
use metrics::counter;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    entries: FxHashMap<Uid, Arc<Encoded>>,
    order: Vec<Uid>,
}

impl Inner {
    fn insert(&mut self, uid: Uid, encoded: Encoded) {
        if self.entries.insert(uid, Arc::new(encoded)).is_none() {
            self.order.push(uid);
        }
    }

    fn remove(&mut self, uid: &Uid) -> bool {
        if self.entries.remove(uid).is_none() {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|u| u == uid) {
            self.order.remove(pos);
        }
        true
    }

    fn snapshot(&self) -> Vec<Arc<Encoded>> {
        self.order.iter().filter_map(|uid| self.entries.get(uid).cloned()).collect()
    }
}

fn write_family(entries: &[Arc<Encoded>], i: usize, w: &mut dyn io::Write) -> io::Result<()> {
    for e in entries {
        w.write_all(e.family(i))?;
    }
    Ok(())
}

/// UID → encoded lines for one (kind, namespace) scope.
pub struct MetricsStore<K> {
    encoder: Encoder<K>,
    headers: Vec<String>,
    resource: &'static str,
    inner: Mutex<Inner>,
}

impl<K: ObjectIdentity> MetricsStore<K> {
    pub fn new(resource: &'static str, encoder: Encoder<K>) -> Self {
        let headers = encoder.headers();
        Self { encoder, headers, resource, inner: Mutex::new(Inner::default()) }
    }

    pub fn resource(&self) -> &'static str { self.resource }
    pub fn headers(&self) -> &[String] { &self.headers }

    /// Encode and insert. A re-added UID keeps its original position.
    pub fn add(&self, uid: Uid, obj: &K) {
        match catch_unwind(AssertUnwindSafe(|| self.encoder.encode(obj))) {
            Ok(encoded) => self.inner.lock().insert(uid, encoded),
            Err(_) => {
                warn!(resource = self.resource, namespace = obj.namespace(), name = obj.name(), "metric generator panicked, dropping object");
                counter!("kruise_state_metrics_encode_panics_total", 1u64, "resource" => self.resource);
                self.inner.lock().remove(&uid);
            }
        }
    }

    pub fn update(&self, uid: Uid, obj: &K) { self.add(uid, obj) }

    pub fn delete(&self, uid: &Uid) {
        if self.inner.lock().remove(uid) {
            debug!(resource = self.resource, "object removed");
        }
    }

    pub fn len(&self) -> usize { self.inner.lock().entries.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn uids(&self) -> Vec<Uid> { self.inner.lock().order.clone() }

    /// Encoded entries in insertion order, as of one instant.
    pub fn snapshot(&self) -> Vec<Arc<Encoded>> { self.inner.lock().snapshot() }
}

impl<K: ObjectIdentity + Send + Sync> ObjectSink<K> for MetricsStore<K> {
    fn upsert(&self, uid: Uid, obj: &K) { self.add(uid, obj) }
    fn remove(&self, uid: &Uid) { self.delete(uid) }
    fn uids(&self) -> Vec<Uid> { MetricsStore::uids(self) }
}

/// Anything that can write a complete, grouped section of the exposition.
pub trait MetricsWriter: Send + Sync {
    fn write_all(&self, w: &mut dyn io::Write) -> io::Result<()>;
}

fn write_header(w: &mut dyn io::Write, header: &str) -> io::Result<()> {
    w.write_all(header.as_bytes())?;
    w.write_all(b"\n")
}

impl<K: ObjectIdentity + Send + Sync> MetricsWriter for MetricsStore<K> {
    fn write_all(&self, w: &mut dyn io::Write) -> io::Result<()> {
        let entries = self.snapshot();
        for (i, header) in self.headers.iter().enumerate() {
            write_header(w, header)?;
            write_family(&entries, i, w)?;
        }
        Ok(())
    }
}

/// The stores of one kind across namespaces, written as one section so each
/// family header appears once.
pub struct MultiStoreWriter<K> {
    stores: Vec<Arc<MetricsStore<K>>>,
}

impl<K> MultiStoreWriter<K> {
    pub fn new(stores: Vec<Arc<MetricsStore<K>>>) -> Self { Self { stores } }
    pub fn stores(&self) -> &[Arc<MetricsStore<K>>] { &self.stores }
}

impl<K: ObjectIdentity + Send + Sync> MetricsWriter for MultiStoreWriter<K> {
    fn write_all(&self, w: &mut dyn io::Write) -> io::Result<()> {
        let Some(first) = self.stores.first() else { return Ok(()) };
        let snapshots: Vec<_> = self.stores.iter().map(|s| s.snapshot()).collect();
        for (i, header) in first.headers().iter().enumerate() {
            write_header(w, header)?;
            for entries in &snapshots {
                write_family(entries, i, w)?;
            }
        }
        Ok(())
    }
}

/// Write every section in order, stopping at the first I/O error.
pub fn write_all_writers(writers: &[Arc<dyn MetricsWriter>], w: &mut dyn io::Write) -> io::Result<()> {
    for writer in writers {
        writer.write_all(w)?;
    }
    Ok(())
}
