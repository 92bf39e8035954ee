//! Pure derivation from (snapshot, selected class) to the displayable list.
//!
//! No network, no mutation: the same snapshot and filter always produce the
//! same sequence, in snapshot order (server-defined, reverse-chronological).
//! Recomputed by the UI whenever either input changes.

use std::str::FromStr;

use visionguard_api::model::{DetectionEvent, Snapshot};

use crate::error::CoreError;

/// Display label for detector output outside the fixed enumeration.
pub const UNKNOWN_CLASS_LABEL: &str = "Неизвестный объект";

// ── ObjectClass ──────────────────────────────────────────────────────

/// The fixed class enumeration the detector is trained on.
///
/// Wire labels stay open-ended strings ([`DetectionEvent::object_class`]);
/// this enum only exists for filtering and localization. Labels that don't
/// parse are visible under the "all" filter only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Person,
    Bicycle,
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl ObjectClass {
    pub const ALL: [Self; 6] = [
        Self::Person,
        Self::Bicycle,
        Self::Car,
        Self::Motorcycle,
        Self::Bus,
        Self::Truck,
    ];

    /// Parse a wire label, case-insensitively.
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "person" => Some(Self::Person),
            "bicycle" => Some(Self::Bicycle),
            "car" => Some(Self::Car),
            "motorcycle" => Some(Self::Motorcycle),
            "bus" => Some(Self::Bus),
            "truck" => Some(Self::Truck),
            _ => None,
        }
    }

    /// Canonical wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Bicycle => "bicycle",
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Bus => "bus",
            Self::Truck => "truck",
        }
    }

    /// Localized display name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Person => "Человек",
            Self::Bicycle => "Велосипед",
            Self::Car => "Машина",
            Self::Motorcycle => "Мотоцикл",
            Self::Bus => "Автобус",
            Self::Truck => "Грузовик",
        }
    }
}

/// Localized display name for a raw wire label.
pub fn class_label(raw: &str) -> &'static str {
    ObjectClass::parse(raw).map_or(UNKNOWN_CLASS_LABEL, ObjectClass::label)
}

// ── ClassFilter ──────────────────────────────────────────────────────

/// User-selected class filter: everything, or one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassFilter {
    #[default]
    All,
    Only(ObjectClass),
}

impl ClassFilter {
    /// Whether an event passes the filter.
    ///
    /// Events whose class falls outside the enumeration pass under
    /// [`All`](Self::All) only.
    pub fn matches(&self, event: &DetectionEvent) -> bool {
        match self {
            Self::All => true,
            Self::Only(class) => ObjectClass::parse(&event.object_class) == Some(*class),
        }
    }
}

impl FromStr for ClassFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        ObjectClass::parse(s)
            .map(Self::Only)
            .ok_or_else(|| CoreError::UnknownClass(s.to_owned()))
    }
}

// ── Filtering ────────────────────────────────────────────────────────

/// Derive the displayable subsequence of a snapshot.
///
/// Order-preserving; an empty result is an ordinary empty sequence.
pub fn filter<'a>(snapshot: &'a Snapshot, class_filter: &ClassFilter) -> Vec<&'a DetectionEvent> {
    snapshot
        .iter()
        .filter(|event| class_filter.matches(event))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────
