//! Basic draft vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two competing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a connection takes part in a room.
///
/// Observers receive every broadcast but may not mutate the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    Left,
    Right,
    Observer,
}

impl Seat {
    /// The competing side behind this seat, if any.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Seat::Left => Some(Side::Left),
            Seat::Right => Some(Side::Right),
            Seat::Observer => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Seat::Left => "left",
            Seat::Right => "right",
            Seat::Observer => "observer",
        }
    }
}

impl From<Side> for Seat {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => Seat::Left,
            Side::Right => Seat::Right,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Seat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Seat::Left),
            "right" => Ok(Seat::Right),
            "observer" | "spectator" => Ok(Seat::Observer),
            other => Err(format!("unknown seat: {other}")),
        }
    }
}

/// What an action does to its target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Ban,
    Pick,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::Ban => "ban",
            ActionKind::Pick => "pick",
        }
    }
}

/// Roster entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A value held once per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidePair<T> {
    pub left: T,
    pub right: T,
}

impl<T: Copy> SidePair<T> {
    #[must_use]
    pub const fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    #[must_use]
    pub fn get(&self, side: Side) -> T {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn set(&mut self, side: Side, value: T) {
        match side {
            Side::Left => self.left = value,
            Side::Right => self.right = value,
        }
    }
}

impl SidePair<bool> {
    /// True when both sides hold the flag.
    #[must_use]
    pub const fn both(&self) -> bool {
        self.left && self.right
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_side() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
    }

    #[test]
    fn test_seat_parsing() {
        assert_eq!("left".parse::<Seat>().unwrap(), Seat::Left);
        assert_eq!("right".parse::<Seat>().unwrap(), Seat::Right);
        assert_eq!("observer".parse::<Seat>().unwrap(), Seat::Observer);
        assert_eq!("spectator".parse::<Seat>().unwrap(), Seat::Observer);
        assert!("referee".parse::<Seat>().is_err());
        assert_eq!(Seat::Observer.side(), None);
        assert_eq!(Seat::from(Side::Right).side(), Some(Side::Right));
    }

    #[test]
    fn test_side_pair() {
        let mut ready = SidePair::<bool>::default();
        assert!(!ready.both());

        ready.set(Side::Left, true);
        assert!(ready.get(Side::Left));
        assert!(!ready.both());

        ready.set(Side::Right, true);
        assert!(ready.both());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Side::Left).unwrap(), "\"left\"");
        assert_eq!(serde_json::to_string(&ActionKind::Pick).unwrap(), "\"pick\"");
        assert_eq!(serde_json::to_string(&EntityId(17)).unwrap(), "17");
    }
}
