//! Capability families a backend may or may not support.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A family of contract operations that a backend supports as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Capability {
    Airports = 0,
    Amenities = 1,
    Flights = 2,
    Tickets = 3,
    Policies = 4,
}

impl Capability {
    /// Returns a static slice of all capability families.
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Airports,
            Capability::Amenities,
            Capability::Flights,
            Capability::Tickets,
            Capability::Policies,
        ]
    }

    /// Families that make up a bulk-loaded dataset, in load order.
    pub fn bulk_families() -> &'static [Capability] {
        &[
            Capability::Airports,
            Capability::Amenities,
            Capability::Flights,
            Capability::Policies,
        ]
    }

    /// Returns the lowercase family name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Airports => "airports",
            Capability::Amenities => "amenities",
            Capability::Flights => "flights",
            Capability::Tickets => "tickets",
            Capability::Policies => "policies",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`Capability`] families.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// The empty set.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Every family.
    pub fn all() -> Self {
        Capability::all().iter().copied().collect()
    }

    /// Returns a copy of the set with `capability` added.
    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Iterates over contained families in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::all()
            .iter()
            .copied()
            .filter(move |c| self.contains(*c))
    }

    /// Families of `Capability::all()` not in the set.
    pub fn missing(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::all()
            .iter()
            .copied()
            .filter(move |c| !self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let caps = Capabilities::none()
            .with(Capability::Airports)
            .with(Capability::Policies);

        assert!(caps.contains(Capability::Airports));
        assert!(caps.contains(Capability::Policies));
        assert!(!caps.contains(Capability::Flights));
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::Airports, Capability::Policies]
        );
        assert_eq!(
            caps.missing().collect::<Vec<_>>(),
            vec![
                Capability::Amenities,
                Capability::Flights,
                Capability::Tickets
            ]
        );
    }

    #[test]
    fn test_all_contains_everything() {
        let caps = Capabilities::all();
        assert!(Capability::all().iter().all(|c| caps.contains(*c)));
        assert_eq!(caps.missing().count(), 0);
        assert_eq!(format!("{:?}", Capabilities::none()), "{}");
    }

    #[test]
    fn test_display() {
        assert_eq!(Capability::Tickets.to_string(), "tickets");
    }
}
