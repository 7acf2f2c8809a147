//! Entry storage: a generational arena of entries threaded into per-bucket
//! doubly linked chains.
//!
//! Links are arena keys rather than pointers. An entry keeps its arena key
//! for its whole life; resizing only rewrites `next`/`prev` and the bucket
//! heads, so no key or value bytes move.

use crate::error::TableError;
use slotmap::{DefaultKey, SlotMap};

#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: Box<[u8]>,
    // Digest as computed on insert; folded against the capacity on rehash.
    pub(crate) digest: u64,
    next: Option<DefaultKey>,
    prev: Option<DefaultKey>,
}

impl Entry {
    /// Copy `key` and `value` into owned buffers.
    pub(crate) fn try_new(key: &[u8], value: &[u8], digest: u64) -> Result<Self, TableError> {
        Ok(Self {
            key: try_copy(key)?,
            value: try_copy(value)?,
            digest,
            next: None,
            prev: None,
        })
    }
}

/// Copy `bytes` into a fresh exact-size buffer, reporting allocation failure.
pub(crate) fn try_copy(bytes: &[u8]) -> Result<Box<[u8]>, TableError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(buf.into_boxed_slice())
}

/// Allocate `n` empty chain heads.
pub(crate) fn try_heads(n: usize) -> Result<Vec<Option<DefaultKey>>, TableError> {
    let mut heads = Vec::new();
    heads.try_reserve_exact(n)?;
    heads.resize(n, None);
    Ok(heads)
}

#[derive(Clone, Debug)]
pub(crate) struct Chains {
    entries: SlotMap<DefaultKey, Entry>,
    heads: Vec<Option<DefaultKey>>,
}

impl Chains {
    pub(crate) fn with_buckets(n: usize) -> Result<Self, TableError> {
        Ok(Self::from_heads(try_heads(n)?))
    }

    pub(crate) fn from_heads(heads: Vec<Option<DefaultKey>>) -> Self {
        debug_assert!(!heads.is_empty());
        Self {
            entries: SlotMap::with_key(),
            heads,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    #[inline]
    pub(crate) fn slot_of(&self, digest: u64) -> usize {
        (digest % self.heads.len() as u64) as usize
    }

    /// Scan the chain at `slot` for an entry whose key equals `key` in both
    /// length and content.
    pub(crate) fn find(&self, slot: usize, digest: u64, key: &[u8]) -> Option<DefaultKey> {
        let mut cursor = self.heads[slot];
        while let Some(k) = cursor {
            let e = &self.entries[k];
            if e.digest == digest && *e.key == *key {
                return Some(k);
            }
            cursor = e.next;
        }
        None
    }

    pub(crate) fn get(&self, k: DefaultKey) -> Option<&Entry> {
        self.entries.get(k)
    }

    pub(crate) fn get_mut(&mut self, k: DefaultKey) -> Option<&mut Entry> {
        self.entries.get_mut(k)
    }

    /// Link `entry` in as the new head of the chain at `slot`.
    ///
    /// Arena growth here is infallible: `SlotMap` has no `try_reserve`, so
    /// out of memory aborts instead of returning `Err`.
    pub(crate) fn push_front(&mut self, slot: usize, mut entry: Entry) -> DefaultKey {
        let old_head = self.heads[slot];
        entry.prev = None;
        entry.next = old_head;
        let k = self.entries.insert(entry);
        if let Some(h) = old_head {
            self.entries[h].prev = Some(k);
        }
        self.heads[slot] = Some(k);
        k
    }

    /// Unlink `k` from the chain at `slot` and hand back the owned entry.
    /// Both neighbours are repaired; the head moves when `k` was the head.
    pub(crate) fn unlink(&mut self, slot: usize, k: DefaultKey) -> Option<Entry> {
        let entry = self.entries.remove(k)?;
        match entry.prev {
            Some(p) => self.entries[p].next = entry.next,
            None => {
                debug_assert_eq!(self.heads[slot], Some(k));
                self.heads[slot] = entry.next;
            }
        }
        if let Some(n) = entry.next {
            self.entries[n].prev = entry.prev;
        }
        Some(entry)
    }

    /// Move every entry onto `heads`, prepending each to the chain its
    /// cached digest selects. `on_link` sees the destination slot of each
    /// relinked entry. Old chains are walked in bucket order, so rebuilt
    /// chains come out reversed.
    pub(crate) fn relink(&mut self, heads: Vec<Option<DefaultKey>>, mut on_link: impl FnMut(usize)) {
        debug_assert!(heads.iter().all(Option::is_none));
        let old = std::mem::replace(&mut self.heads, heads);
        let n = self.heads.len() as u64;
        for head in old {
            let mut cursor = head;
            while let Some(k) = cursor {
                let e = &mut self.entries[k];
                cursor = e.next;
                let slot = (e.digest % n) as usize;
                let new_next = self.heads[slot];
                e.prev = None;
                e.next = new_next;
                if let Some(h) = new_next {
                    self.entries[h].prev = Some(k);
                }
                self.heads[slot] = Some(k);
                on_link(slot);
            }
        }
    }

    /// Drop every entry, keeping the bucket count.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.heads.iter_mut().for_each(|h| *h = None);
    }

    pub(crate) fn chain(&self, slot: usize) -> ChainIter<'_> {
        ChainIter {
            entries: &self.entries,
            cursor: self.heads[slot],
        }
    }

    /// Walk every bucket in order and check the structural invariants:
    /// back links mirror forward links, each entry sits in the bucket its
    /// digest selects, and every arena entry is reachable exactly once.
    #[cfg(test)]
    pub(crate) fn check_links(&self) -> Result<(), String> {
        let n = self.heads.len() as u64;
        let mut reached = 0usize;
        for (slot, head) in self.heads.iter().enumerate() {
            let mut prev = None;
            let mut cursor = *head;
            while let Some(k) = cursor {
                let e = self
                    .entries
                    .get(k)
                    .ok_or_else(|| format!("bucket {slot} links to a dead entry"))?;
                if e.prev != prev {
                    return Err(format!("bucket {slot}: back link does not match"));
                }
                if (e.digest % n) as usize != slot {
                    return Err(format!("bucket {slot}: entry belongs elsewhere"));
                }
                reached += 1;
                if reached > self.entries.len() {
                    return Err("cycle in chain".to_string());
                }
                prev = cursor;
                cursor = e.next;
            }
        }
        if reached != self.entries.len() {
            return Err(format!(
                "{} entries reachable, {} stored",
                reached,
                self.entries.len()
            ));
        }
        Ok(())
    }
}

/// Entries of one chain, head first.
pub(crate) struct ChainIter<'a> {
    entries: &'a SlotMap<DefaultKey, Entry>,
    cursor: Option<DefaultKey>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Entry;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.entries.get(self.cursor?)?;
        self.cursor = e.next;
        Some(e)
    }
}
