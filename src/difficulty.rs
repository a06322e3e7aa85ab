use std::{fmt, str::FromStr, time::Duration};

use crate::error::LevelError;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

const MIN_THINK_SECS: f64 = 0.1;
const MAX_THINK_SECS: f64 = 5.0;

/// Bot strength chosen by the user, from 1 (easy) to 10 (hard).
///
/// The level only controls how long the engine may think per move:
/// level 1 gets 0.1s, level 10 gets 5.0s, linearly in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u8);

impl Difficulty {
    pub fn new(level: u8) -> Result<Self, LevelError> {
        if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            Ok(Self(level))
        } else {
            Err(LevelError::OutOfRange(level.into()))
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn think_time(self) -> Duration {
        let steps = f64::from(self.0 - MIN_LEVEL);
        let span = f64::from(MAX_LEVEL - MIN_LEVEL);
        Duration::from_secs_f64(MIN_THINK_SECS + steps * (MAX_THINK_SECS - MIN_THINK_SECS) / span)
    }
}

impl FromStr for Difficulty {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let level: i64 = s.parse().map_err(|_| LevelError::NotANumber(s.to_string()))?;
        u8::try_from(level)
            .map_err(|_| LevelError::OutOfRange(level))
            .and_then(Self::new)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Budget for a single engine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimit {
    pub time: Duration,
    /// Optional ply ceiling; the engine stops at whichever bound it hits first.
    pub depth: Option<u32>,
}

impl SearchLimit {
    pub fn time(time: Duration) -> Self {
        Self { time, depth: None }
    }

    /// `movetime` in whole milliseconds, never zero.
    pub fn movetime_millis(&self) -> u64 {
        (self.time.as_millis() as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(level: u8) -> f64 {
        Difficulty::new(level).unwrap().think_time().as_secs_f64()
    }

    #[test]
    fn endpoints_map_to_bounds() {
        assert!((secs(1) - 0.1).abs() < 1e-6);
        assert!((secs(10) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn think_time_strictly_increases() {
        for level in MIN_LEVEL..MAX_LEVEL {
            assert!(secs(level) < secs(level + 1), "level {level}");
        }
    }

    #[test]
    fn parse_rejects_garbage_and_out_of_range() {
        assert_eq!("7".parse::<Difficulty>().unwrap().level(), 7);
        assert_eq!(" 3 ".parse::<Difficulty>().unwrap().level(), 3);
        assert_eq!(
            "abc".parse::<Difficulty>(),
            Err(LevelError::NotANumber("abc".into()))
        );
        assert_eq!("0".parse::<Difficulty>(), Err(LevelError::OutOfRange(0)));
        assert_eq!("11".parse::<Difficulty>(), Err(LevelError::OutOfRange(11)));
        assert_eq!("-4".parse::<Difficulty>(), Err(LevelError::OutOfRange(-4)));
        assert_eq!("300".parse::<Difficulty>(), Err(LevelError::OutOfRange(300)));
    }

    #[test]
    fn movetime_is_never_zero() {
        assert_eq!(SearchLimit::time(Duration::from_micros(10)).movetime_millis(), 1);
        assert_eq!(
            SearchLimit::time(Difficulty::new(1).unwrap().think_time()).movetime_millis(),
            100
        );
    }
}
