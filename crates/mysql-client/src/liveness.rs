//! Connection liveness probing.

use std::fmt;
use std::str::FromStr;

/// How [`Session::is_valid`](crate::Session::is_valid) checks that the
/// server is still answering.
///
/// Chosen once per session through [`Config::liveness`](crate::Config::liveness).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LivenessStrategy {
    /// `COM_PING`: one frame each way, no result set.
    #[default]
    NativePing,
    /// `SELECT 1`: exercises the full query path, for proxies that answer
    /// pings themselves.
    SelectOne,
}

impl LivenessStrategy {
    /// SQL text issued by the `SelectOne` strategy.
    pub const CHECK_QUERY: &'static str = "SELECT 1";
}

impl FromStr for LivenessStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ping") || s.eq_ignore_ascii_case("nativeping") {
            Ok(Self::NativePing)
        } else if s.eq_ignore_ascii_case("select1") || s.eq_ignore_ascii_case("selectone") {
            Ok(Self::SelectOne)
        } else {
            Err(format!("unknown liveness strategy: {s}"))
        }
    }
}

impl fmt::Display for LivenessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativePing => f.write_str("ping"),
            Self::SelectOne => f.write_str("select1"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("PING".parse::<LivenessStrategy>().unwrap(), LivenessStrategy::NativePing);
        assert_eq!("select1".parse::<LivenessStrategy>().unwrap(), LivenessStrategy::SelectOne);
        assert!("heartbeat".parse::<LivenessStrategy>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for strategy in [LivenessStrategy::NativePing, LivenessStrategy::SelectOne] {
            assert_eq!(strategy.to_string().parse::<LivenessStrategy>().unwrap(), strategy);
        }
    }
}
