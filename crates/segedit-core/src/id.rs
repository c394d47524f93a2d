#![forbid(unsafe_code)]

//! Segment identifiers.
//!
//! A [`SegmentId`] is an opaque 64-bit value. By convention two flavours
//! coexist: *base* ids (leaves of a merge history, e.g. supervoxels) and
//! *root* ids (the current representative of a merged group). Which flavour
//! an id belongs to is decided by a [`SegmentIdLayout`]: chunked graphs keep
//! a layer number in the high bits of the id and base ids live on layer 1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque segment identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

/// Placeholder root for the excluded side of a previewed split.
///
/// It is the largest representable id so that it always represents the
/// group it joins under [`RepresentativePolicy::Max`](crate::RepresentativePolicy::Max).
pub const UNKNOWN_NEW_SEGMENT_ID: SegmentId = SegmentId(u64::MAX);

impl SegmentId {
    /// Wrap a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the split-preview sentinel.
    #[must_use]
    pub const fn is_unknown_new(self) -> bool {
        self.0 == UNKNOWN_NEW_SEGMENT_ID.0
    }
}

impl From<u64> for SegmentId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SegmentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Bit layout used to tell base ids from graph roots.
///
/// With `layer_bits == 0` (the [`FLAT`](Self::FLAT) layout) there is no
/// layer field and every id counts as a base id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentIdLayout {
    layer_bits: u32,
}

impl SegmentIdLayout {
    /// Layout without a layer field.
    pub const FLAT: Self = Self { layer_bits: 0 };

    /// Layer number of base segments in a chunked graph.
    pub const BASE_LAYER: u64 = 1;

    /// Layout storing a layer number in the top `layer_bits` bits.
    ///
    /// `layer_bits` is clamped to `0..=63`.
    #[must_use]
    pub const fn chunked_graph(layer_bits: u32) -> Self {
        let layer_bits = if layer_bits > 63 { 63 } else { layer_bits };
        Self { layer_bits }
    }

    /// Number of bits used for the layer field.
    #[must_use]
    pub const fn layer_bits(&self) -> u32 {
        self.layer_bits
    }

    /// Layer encoded in `id`, or `None` for the flat layout.
    #[must_use]
    pub const fn layer(&self, id: SegmentId) -> Option<u64> {
        if self.layer_bits == 0 {
            None
        } else {
            Some(id.0 >> (64 - self.layer_bits))
        }
    }

    /// Whether `id` is a base (leaf) segment id.
    #[must_use]
    pub const fn is_base(&self, id: SegmentId) -> bool {
        match self.layer(id) {
            None => true,
            Some(layer) => layer == Self::BASE_LAYER,
        }
    }
}
