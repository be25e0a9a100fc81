//! Keys on the keyboard
//!
//! The Kyria (with Halcyon modules) is scanned as a 10 row by 7 column
//! matrix.  Rows 0-4 are the left half, rows 5-9 the right half, and the
//! split link merges both into a single event stream.  Each position is
//! given a flat index, `row * COLS + col`, which is the key id carried on
//! events.
//!
//! Keymaps are easier to write in the visual order of the keys, so
//! [`LAYOUT`] gives the matrix position of each of the 60 visual positions,
//! following the board's `LAYOUT_split_3x6_5_hlc` ordering: three rows of
//! twelve finger keys (well, sixteen on the bottom row with the inner
//! thumb-cluster keys), the thumb row, and the five encoder/module positions
//! for each half.

pub const ROWS: usize = 10;
pub const COLS: usize = 7;

/// All of the physical key ids fit within this.
pub const NKEYS: usize = ROWS * COLS;

/// Number of positions in the visual layout.
pub const LAYOUT_KEYS: usize = 60;

/// A physical key, identified by its flat matrix index.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalKey(u16);

impl PhysicalKey {
    /// A key from its raw id.  Ids past [`NKEYS`] can be constructed (they
    /// come from the outside world), but are never matched by anything.
    pub const fn new(id: u16) -> PhysicalKey {
        PhysicalKey(id)
    }

    /// The key at a matrix position.
    pub const fn at(row: usize, col: usize) -> PhysicalKey {
        PhysicalKey((row * COLS + col) as u16)
    }

    pub const fn id(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < NKEYS
    }

    pub const fn row(self) -> usize {
        self.index() / COLS
    }

    pub const fn col(self) -> usize {
        self.index() % COLS
    }
}

/// A set of physical keys, one bit per key.
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySet(u128);

impl KeySet {
    pub const fn empty() -> KeySet {
        KeySet(0)
    }

    pub fn from_keys(keys: &[PhysicalKey]) -> KeySet {
        let mut set = KeySet::empty();
        for &key in keys {
            set.insert(key);
        }
        set
    }

    /// Add a key.  Invalid keys are ignored.
    pub fn insert(&mut self, key: PhysicalKey) {
        if key.is_valid() {
            self.0 |= 1u128 << key.index();
        }
    }

    pub fn remove(&mut self, key: PhysicalKey) {
        if key.is_valid() {
            self.0 &= !(1u128 << key.index());
        }
    }

    pub fn contains(&self, key: PhysicalKey) -> bool {
        key.is_valid() && self.0 & (1u128 << key.index()) != 0
    }

    pub fn with(mut self, key: PhysicalKey) -> KeySet {
        self.insert(key);
        self
    }

    pub fn union(self, other: KeySet) -> KeySet {
        KeySet(self.0 | other.0)
    }

    pub fn intersects(&self, other: KeySet) -> bool {
        self.0 & other.0 != 0
    }

    /// Is every key of `self` also in `other`.
    pub fn is_subset(&self, other: KeySet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

const fn m(row: usize, col: usize) -> PhysicalKey {
    PhysicalKey::at(row, col)
}

// Columns are lettered A-G on the board.
const A: usize = 0;
const B: usize = 1;
const C: usize = 2;
const D: usize = 3;
const E: usize = 4;
const F: usize = 5;
const G: usize = 6;

/// Matrix position of each visual layout position.
#[rustfmt::skip]
pub const LAYOUT: [PhysicalKey; LAYOUT_KEYS] = [
    // Top row.
    m(0, G), m(0, F), m(0, E), m(0, D), m(0, C), m(0, B),
    m(5, B), m(5, C), m(5, D), m(5, E), m(5, F), m(5, G),
    // Home row.
    m(1, G), m(1, F), m(1, E), m(1, D), m(1, C), m(1, B),
    m(6, B), m(6, C), m(6, D), m(6, E), m(6, F), m(6, G),
    // Bottom row, including the two inner keys of each half.
    m(2, G), m(2, F), m(2, E), m(2, D), m(2, C), m(2, B), m(3, D), m(2, A),
    m(7, A), m(8, D), m(7, B), m(7, C), m(7, D), m(7, E), m(7, F), m(7, G),
    // Thumb row.
    m(3, E), m(3, C), m(3, B), m(3, F), m(3, A),
    m(8, A), m(8, F), m(8, B), m(8, C), m(8, E),
    // Encoders and module positions.
    m(4, A), m(4, B), m(4, C), m(4, D), m(4, E),
    m(9, A), m(9, B), m(9, C), m(9, D), m(9, E),
];

/// The physical key at a visual layout position.
pub const fn layout_key(pos: usize) -> PhysicalKey {
    LAYOUT[pos]
}
