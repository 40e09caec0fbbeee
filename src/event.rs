//! Flattened event fields.

/// One array ancestor of a leaf value: which array, and the index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayPos {
    pub array: u32,
    pub pos: u32,
}

impl ArrayPos {
    pub fn new(array: u32, pos: u32) -> Self {
        Self { array, pos }
    }
}

/// A leaf value of a flattened event.
///
/// Matching expects a slice of these sorted by `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventField {
    pub path: String,
    pub value: Vec<u8>,
    pub array_trail: Vec<ArrayPos>,
}

impl EventField {
    pub fn new(path: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        Self {
            path: path.into(),
            value: value.as_ref().to_vec(),
            array_trail: Vec::new(),
        }
    }

    pub fn with_trail(mut self, array_trail: Vec<ArrayPos>) -> Self {
        self.array_trail = array_trail;
        self
    }
}

/// Two sets of array positions can belong to one match only if they agree
/// on the index of every array they share.
pub(crate) fn trails_compatible(from: &[ArrayPos], to: &[ArrayPos]) -> bool {
    from.iter().all(|f| {
        to.iter()
            .all(|t| f.array != t.array || f.pos == t.pos)
    })
}
