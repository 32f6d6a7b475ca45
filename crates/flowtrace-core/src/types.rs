use derive_more::{Add, AddAssign, Sub, SubAssign};
use std::fmt::{Display, Formatter};

/// `TimeToLive` (ttl) newtype.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    Add,
    AddAssign,
    Sub,
    SubAssign,
)]
pub struct TimeToLive(pub u8);

impl Display for TimeToLive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
