//! Per-object text exposition encoder.
//!
//! An object is encoded once, on write, into a single contiguous buffer. The
//! buffer keeps the end offset of every family so a store can later emit the
//! lines of one family across all objects without re-encoding or allocating.

use std::io::Write as _;
use std::sync::Arc;

use crate::family::{FamilyGenerator, Metric};
use crate::ObjectIdentity;

/// Encoded lines of one object, grouped by family in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    bytes: Box<[u8]>,
    ends: Box<[u32]>,
}

impl Encoded {
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn len(&self) -> usize { self.bytes.len() }
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    /// Number of families this entry was encoded against.
    pub fn families(&self) -> usize { self.ends.len() }

    /// Lines belonging to family `i`; empty when out of range.
    pub fn family(&self, i: usize) -> &[u8] {
        let Some(end) = self.ends.get(i) else { return &[] };
        let start = if i == 0 { 0 } else { self.ends[i - 1] as usize };
        &self.bytes[start..*end as usize]
    }

    pub fn lines(&self) -> usize { self.bytes.iter().filter(|b| **b == b'\n').count() }
}

/// Encoder for one resource kind: identity label key plus the frozen family set.
pub struct Encoder<K> {
    identity_key: String,
    families: Arc<[FamilyGenerator<K>]>,
}

impl<K> Clone for Encoder<K> {
    fn clone(&self) -> Self {
        Self { identity_key: self.identity_key.clone(), families: Arc::clone(&self.families) }
    }
}

impl<K: ObjectIdentity> Encoder<K> {
    pub fn new(identity_key: &str, families: Vec<FamilyGenerator<K>>) -> Self {
        Self { identity_key: identity_key.to_string(), families: families.into() }
    }

    pub fn identity_key(&self) -> &str { &self.identity_key }

    pub fn families(&self) -> &[FamilyGenerator<K>] { &self.families }

    pub fn headers(&self) -> Vec<String> { self.families.iter().map(|f| f.header()).collect() }

    pub fn encode(&self, obj: &K) -> Encoded {
        let mut bytes = Vec::with_capacity(64 * self.families.len());
        let mut ends = Vec::with_capacity(self.families.len());
        let identity = [("namespace", obj.namespace()), (self.identity_key.as_str(), obj.name())];
        for family in self.families.iter() {
            for metric in family.generate(obj) {
                write_line(&mut bytes, family.name(), &identity, &metric);
            }
            ends.push(bytes.len() as u32);
        }
        Encoded { bytes: bytes.into_boxed_slice(), ends: ends.into_boxed_slice() }
    }
}

/// Append `name{identity..,extra..} value\n` to `buf`.
///
/// Labels are not sorted by key: identity labels come first, then the
/// generator's labels in the order it produced them.
pub fn write_line(buf: &mut Vec<u8>, name: &str, identity: &[(&str, &str)], metric: &Metric) {
    buf.extend_from_slice(name.as_bytes());
    let extra = metric.label_keys.iter().map(String::as_str).zip(metric.label_values.iter().map(String::as_str));
    let mut first = true;
    for (k, v) in identity.iter().copied().chain(extra) {
        buf.push(if first { b'{' } else { b',' });
        first = false;
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b"=\"");
        escape_label_value(buf, v);
        buf.push(b'"');
    }
    if !first {
        buf.push(b'}');
    }
    buf.push(b' ');
    write_value(buf, metric.value);
    buf.push(b'\n');
}

fn escape_label_value(buf: &mut Vec<u8>, v: &str) {
    for b in v.bytes() {
        match b {
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\n' => buf.extend_from_slice(b"\\n"),
            _ => buf.push(b),
        }
    }
}

/// Shortest round-trip decimal; integral values carry no decimal point.
pub fn write_value(buf: &mut Vec<u8>, v: f64) {
    if v.is_nan() {
        buf.extend_from_slice(b"NaN");
    } else if v.is_infinite() {
        buf.extend_from_slice(if v > 0.0 { b"+Inf" } else { b"-Inf" });
    } else {
        // Writing into a Vec cannot fail.
        let _ = write!(buf, "{}", v);
    }
}
