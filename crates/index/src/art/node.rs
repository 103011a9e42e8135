//! The four ART inner-node variants and the child slot they hold (spec
//! §4.2). Growth is one-directional — `grow()` always moves to strictly
//! wider fan-out — because nothing in this engine ever erases an index
//! entry (I7: an ART leaf pointer is set on first install and never
//! rebound while the chain is alive), so the shrink thresholds the
//! original algorithm defines have no caller here.

use std::sync::Arc;

use babydb_core::types::Key;

use crate::chain::VersionChain;

/// A child slot in the tree: either another fan-out node, or a leaf
/// carrying the full key (needed to detect lazy-expansion collisions) and
/// the version chain that owns that key's history.
///
/// The original packs this distinction into the low bit of a raw pointer;
/// a two-variant enum gets the same one-word-ish representation without
/// the unsafety (spec §9 design notes).
pub(crate) enum Child {
    Leaf(Key, Arc<VersionChain>),
    Inner(InnerNode),
}

/// An inner node: a compressed prefix shared by every key below it, plus
/// the fan-out body holding its children.
pub(crate) struct InnerNode {
    pub prefix: Vec<u8>,
    pub body: NodeBody,
}

impl InnerNode {
    pub fn new(prefix: Vec<u8>) -> Self {
        InnerNode {
            prefix,
            body: NodeBody::empty(),
        }
    }
}

/// Small fixed-capacity node used for fan-out 4 and 16: keys and children
/// kept in parallel arrays, sorted ascending by key byte, scanned linearly.
/// `N` being a const generic means Node4 and Node16 share one
/// implementation instead of two near-identical copies.
pub(crate) struct SmallNode<const N: usize> {
    keys: [u8; N],
    children: [Option<Box<Child>>; N],
    len: usize,
}

impl<const N: usize> SmallNode<N> {
    fn empty() -> Self {
        SmallNode {
            keys: [0; N],
            children: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.len == N
    }

    fn get(&self, byte: u8) -> Option<&Child> {
        self.keys[..self.len]
            .iter()
            .position(|&k| k == byte)
            .map(|i| self.children[i].as_deref().expect("slot within len is occupied"))
    }

    fn get_mut(&mut self, byte: u8) -> Option<&mut Child> {
        let idx = self.keys[..self.len].iter().position(|&k| k == byte)?;
        self.children[idx].as_deref_mut()
    }

    fn insert(&mut self, byte: u8, child: Child) {
        debug_assert!(!self.is_full(), "caller must grow before inserting");
        let pos = self.keys[..self.len]
            .iter()
            .position(|&k| k > byte)
            .unwrap_or(self.len);
        for i in (pos..self.len).rev() {
            self.keys[i + 1] = self.keys[i];
            self.children.swap(i + 1, i);
        }
        self.keys[pos] = byte;
        self.children[pos] = Some(Box::new(child));
        self.len += 1;
    }

    fn iter(&self) -> impl Iterator<Item = (u8, &Child)> {
        self.keys[..self.len]
            .iter()
            .zip(self.children[..self.len].iter())
            .map(|(&k, c)| (k, c.as_deref().expect("slot within len is occupied")))
    }

    fn drain(self) -> Vec<(u8, Child)> {
        let SmallNode { keys, children, len } = self;
        keys.into_iter()
            .zip(children.into_iter())
            .take(len)
            .map(|(k, c)| (k, *c.expect("slot within len is occupied")))
            .collect()
    }
}

/// Fan-out 48: a 256-entry byte index into a 48-slot child array.
pub(crate) struct Node48Body {
    child_index: [Option<u8>; 256],
    children: [Option<Box<Child>>; 48],
    len: usize,
}

impl Node48Body {
    fn empty() -> Self {
        Node48Body {
            child_index: [None; 256],
            children: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.len == 48
    }

    fn get(&self, byte: u8) -> Option<&Child> {
        let slot = self.child_index[byte as usize]?;
        self.children[slot as usize].as_deref()
    }

    fn get_mut(&mut self, byte: u8) -> Option<&mut Child> {
        let slot = self.child_index[byte as usize]?;
        self.children[slot as usize].as_deref_mut()
    }

    fn insert(&mut self, byte: u8, child: Child) {
        debug_assert!(!self.is_full(), "caller must grow before inserting");
        let slot = self
            .children
            .iter()
            .position(|c| c.is_none())
            .expect("node48 below capacity has a free slot");
        self.children[slot] = Some(Box::new(child));
        self.child_index[byte as usize] = Some(slot as u8);
        self.len += 1;
    }

    fn iter(&self) -> impl Iterator<Item = (u8, &Child)> + '_ {
        (0u16..256).filter_map(move |b| {
            let byte = b as u8;
            self.child_index[byte as usize]
                .map(|slot| (byte, self.children[slot as usize].as_deref().expect("indexed slot is occupied")))
        })
    }

    fn drain(mut self) -> Vec<(u8, Child)> {
        let mut out = Vec::with_capacity(self.len);
        for b in 0u16..256 {
            let byte = b as u8;
            if let Some(slot) = self.child_index[byte as usize] {
                if let Some(child) = self.children[slot as usize].take() {
                    out.push((byte, *child));
                }
            }
        }
        out
    }
}

/// Fan-out 256: direct array indexed by key byte.
pub(crate) struct Node256Body {
    children: [Option<Box<Child>>; 256],
    len: usize,
}

impl Node256Body {
    fn empty() -> Self {
        Node256Body {
            children: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.len == 256
    }

    fn get(&self, byte: u8) -> Option<&Child> {
        self.children[byte as usize].as_deref()
    }

    fn get_mut(&mut self, byte: u8) -> Option<&mut Child> {
        self.children[byte as usize].as_deref_mut()
    }

    fn insert(&mut self, byte: u8, child: Child) {
        if self.children[byte as usize].is_none() {
            self.len += 1;
        }
        self.children[byte as usize] = Some(Box::new(child));
    }

    fn iter(&self) -> impl Iterator<Item = (u8, &Child)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_deref().map(|c| (i as u8, c)))
    }
}

/// The fan-out body of an [`InnerNode`], growing from 4 to 16 to 48 to 256
/// as children accumulate.
pub(crate) enum NodeBody {
    N4(SmallNode<4>),
    N16(SmallNode<16>),
    N48(Node48Body),
    N256(Node256Body),
}

impl NodeBody {
    pub fn empty() -> Self {
        NodeBody::N4(SmallNode::empty())
    }

    pub fn is_full(&self) -> bool {
        match self {
            NodeBody::N4(n) => n.is_full(),
            NodeBody::N16(n) => n.is_full(),
            NodeBody::N48(n) => n.is_full(),
            NodeBody::N256(n) => n.is_full(),
        }
    }

    pub fn get(&self, byte: u8) -> Option<&Child> {
        match self {
            NodeBody::N4(n) => n.get(byte),
            NodeBody::N16(n) => n.get(byte),
            NodeBody::N48(n) => n.get(byte),
            NodeBody::N256(n) => n.get(byte),
        }
    }

    pub fn get_mut(&mut self, byte: u8) -> Option<&mut Child> {
        match self {
            NodeBody::N4(n) => n.get_mut(byte),
            NodeBody::N16(n) => n.get_mut(byte),
            NodeBody::N48(n) => n.get_mut(byte),
            NodeBody::N256(n) => n.get_mut(byte),
        }
    }

    fn grow(self) -> NodeBody {
        match self {
            NodeBody::N4(n) => {
                let mut wider = SmallNode::<16>::empty();
                for (byte, child) in n.drain() {
                    wider.insert(byte, child);
                }
                NodeBody::N16(wider)
            }
            NodeBody::N16(n) => {
                let mut wider = Node48Body::empty();
                for (byte, child) in n.drain() {
                    wider.insert(byte, child);
                }
                NodeBody::N48(wider)
            }
            NodeBody::N48(n) => {
                let mut wider = Node256Body::empty();
                for (byte, child) in n.drain() {
                    wider.insert(byte, child);
                }
                NodeBody::N256(wider)
            }
            // Node256 is already the widest variant; nothing to grow into.
            wide @ NodeBody::N256(_) => wide,
        }
    }

    /// Insert a brand-new child, growing the node first if it's full.
    pub fn insert(&mut self, byte: u8, child: Child) {
        if self.is_full() {
            let grown = std::mem::replace(self, NodeBody::empty()).grow();
            *self = grown;
        }
        match self {
            NodeBody::N4(n) => n.insert(byte, child),
            NodeBody::N16(n) => n.insert(byte, child),
            NodeBody::N48(n) => n.insert(byte, child),
            NodeBody::N256(n) => n.insert(byte, child),
        }
    }

    /// Children in ascending byte order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (u8, &Child)> + '_> {
        match self {
            NodeBody::N4(n) => Box::new(n.iter()),
            NodeBody::N16(n) => Box::new(n.iter()),
            NodeBody::N48(n) => Box::new(n.iter()),
            NodeBody::N256(n) => Box::new(n.iter()),
        }
    }
}
