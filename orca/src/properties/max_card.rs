use std::fmt::{Display, Formatter};
use std::ops::Mul;

/// Upper bound of the number of rows an expression can produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxCard(u64);

impl MaxCard {
    pub const UNBOUNDED: MaxCard = MaxCard(u64::MAX);
    pub const ZERO: MaxCard = MaxCard(0);
    pub const ONE: MaxCard = MaxCard(1);

    pub fn new(rows: u64) -> Self {
        MaxCard(rows)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_unbounded(&self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for MaxCard {
    fn default() -> Self {
        MaxCard::UNBOUNDED
    }
}

/// Saturates at [`MaxCard::UNBOUNDED`].
impl Mul for MaxCard {
    type Output = MaxCard;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.0 == 0 || rhs.0 == 0 {
            return MaxCard::ZERO;
        }
        MaxCard(self.0.checked_mul(rhs.0).unwrap_or(u64::MAX))
    }
}

impl Display for MaxCard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
