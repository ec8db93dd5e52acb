use strum::{Display, EnumString};

/// Page size used when a caller asks for `limit = 0`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Where a stored message sits in its chat.
///
/// Messages are ordered by `sent_at`, and equal stamps by `seq`, the store's
/// arrival counter. The derived `Ord` is the forward reading order and is
/// total, so a position names exactly one row even when stamps repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Microseconds since the Unix epoch.
    pub sent_at: u64,
    /// Strictly increasing per store; later appends get larger values.
    pub seq: u64,
}

impl Position {
    pub fn new(sent_at: u64, seq: u64) -> Self {
        Self { sent_at, seq }
    }
}

/// Reading order over a chat's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Oldest first (ascending `sent_at`).
    Forward,
    /// Newest first (descending `sent_at`).
    Reverse,
}

impl Direction {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// Value of the `reverse` storage column.
    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }

    pub(crate) fn sql_order(self) -> &'static str {
        match self {
            Direction::Forward => "ASC",
            Direction::Reverse => "DESC",
        }
    }

    /// Comparison that keeps rows at or after a bound in this direction.
    pub(crate) fn sql_bound(self) -> &'static str {
        match self {
            Direction::Forward => ">=",
            Direction::Reverse => "<=",
        }
    }

    /// Comparison that keeps rows strictly before a bound in this direction.
    pub(crate) fn sql_before(self) -> &'static str {
        match self {
            Direction::Forward => "<",
            Direction::Reverse => ">",
        }
    }

    /// Whether `pos` lies at or after `bound` when reading this way.
    pub(crate) fn reaches(self, pos: Position, bound: Position) -> bool {
        match self {
            Direction::Forward => pos >= bound,
            Direction::Reverse => pos <= bound,
        }
    }

    /// Whether `pos` is read before `other` this way.
    pub(crate) fn precedes(self, pos: Position, other: Position) -> bool {
        !self.reaches(pos, other)
    }
}

/// Which cursor-cache entries an append drops for its chat.
///
/// An append shifts an entry when it lands before the entry's row in the
/// entry's direction. `Reverse` drops every reverse entry, plus the forward
/// entries a backdated message lands in front of; an in-order append drops no
/// forward entry. `All` drops every entry of the chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InvalidationScope {
    #[default]
    Reverse,
    All,
}

impl InvalidationScope {
    /// Whether appending a message stamped `appended` drops an entry of
    /// `direction` whose row is stamped `cached`.
    pub(crate) fn drops(self, direction: Direction, cached: u64, appended: u64) -> bool {
        match self {
            InvalidationScope::All => true,
            // The new row has the largest `seq`, so on a stamp tie it sorts
            // after the cached row.
            InvalidationScope::Reverse => direction.is_reverse() || cached > appended,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direction_parses_and_prints_snake_case() {
        assert_eq!("reverse".parse::<Direction>().unwrap(), Direction::Reverse);
        assert_eq!(Direction::Forward.to_string(), "forward");
        assert!(Direction::from_reverse(true).is_reverse());
    }

    #[test]
    fn invalidation_scope_from_config_text() {
        assert_eq!("ALL".parse::<InvalidationScope>().unwrap(), InvalidationScope::All);
        assert_eq!(
            "reverse".parse::<InvalidationScope>().unwrap(),
            InvalidationScope::Reverse
        );
        assert!("both".parse::<InvalidationScope>().is_err());
    }

    #[test]
    fn reverse_scope_keeps_forward_entries_older_than_the_append() {
        let scope = InvalidationScope::Reverse;
        assert!(scope.drops(Direction::Reverse, 1, 100));
        assert!(!scope.drops(Direction::Forward, 100, 100));
        assert!(!scope.drops(Direction::Forward, 50, 100));
        // Backdated: the new row lands in front of the cached one.
        assert!(scope.drops(Direction::Forward, 101, 100));
        assert!(InvalidationScope::All.drops(Direction::Forward, 1, 100));
    }

    #[test]
    fn positions_break_stamp_ties_by_seq() {
        let first = Position::new(5, 1);
        let second = Position::new(5, 2);
        assert!(Direction::Forward.precedes(first, second));
        assert!(Direction::Reverse.precedes(second, first));
        assert!(Direction::Forward.reaches(second, second));
        assert!(Direction::Reverse.reaches(first, second));
        assert!(!Direction::Forward.reaches(first, second));
    }
}
