use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Amount in paise, the unit the marketplace API stores and transmits.
///
/// Converted to rupees only for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paise(pub i64);

impl Paise {
    pub fn rupees(self) -> i64 {
        self.0 / 100
    }
}

impl Add for Paise {
    type Output = Paise;

    fn add(self, rhs: Paise) -> Paise {
        Paise(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Paise {
    fn sum<I: Iterator<Item = Paise>>(iter: I) -> Paise {
        iter.fold(Paise(0), Add::add)
    }
}

/// `₹12,34,567.50` (Indian digit grouping).
impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = (abs / 100).to_string();
        let minor = abs % 100;

        let grouped = if major.len() <= 3 {
            major
        } else {
            let (head, last3) = major.split_at(major.len() - 3);
            let mut parts: Vec<&str> = Vec::new();
            let mut end = head.len();
            while end > 2 {
                parts.push(&head[end - 2..end]);
                end -= 2;
            }
            parts.push(&head[..end]);
            parts.reverse();
            format!("{},{}", parts.join(","), last3)
        };

        write!(f, "{}₹{}.{:02}", sign, grouped, minor)
    }
}
