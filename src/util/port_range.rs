//! Configuration helper type - the range of TCP ports handed out for file transfers
use rand::Rng;
use serde::{
    de::{self, Error, Unexpected},
    Serialize,
};
use std::{fmt::Display, str::FromStr};

/// An inclusive range of TCP port numbers from which transfer listeners are drawn.
///
/// A single `0` means "let the OS pick"; 0 may not otherwise appear in a range.
///
/// In a configuration file a range is written as a number or a pair:
/// ```text
/// transfer_ports = "0"             # OS-assigned
/// transfer_ports = "20000-30000"   # random draw from the range
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct PortRange {
    /// Lowest port number in the range
    pub begin: u16,
    /// Highest port number in the range, inclusive
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            begin: 20000,
            end: 30000,
        }
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.begin == self.end {
            write!(f, "{}", self.begin)
        } else {
            write!(f, "{}-{}", self.begin, self.end)
        }
    }
}

impl From<PortRange> for String {
    fn from(value: PortRange) -> Self {
        value.to_string()
    }
}

static EXPECTED: &str = "a port number [0..65535] or an increasing range `a-b`";

impl FromStr for PortRange {
    type Err = figment::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use figment::error::Error as FigmentError;
        let s = s.trim();
        if let Ok(n) = s.parse::<u16>() {
            return Ok(Self { begin: n, end: n });
        }
        if let Ok(n) = s.parse::<u64>() {
            return Err(FigmentError::invalid_value(
                Unexpected::Unsigned(n),
                &EXPECTED,
            ));
        }
        let Some((a, b)) = s.split_once('-') else {
            return Err(FigmentError::invalid_value(Unexpected::Str(s), &EXPECTED));
        };
        let (Ok(begin), Ok(end)) = (a.trim().parse::<u16>(), b.trim().parse::<u16>()) else {
            return Err(FigmentError::invalid_value(Unexpected::Str(s), &EXPECTED));
        };
        if begin > end {
            return Err(FigmentError::custom(format!(
                "invalid port range `{s}` (must be increasing)"
            )));
        }
        if begin == 0 {
            return Err(FigmentError::custom(format!(
                "invalid port range `{s}` (port 0 means \"any\" so cannot be part of a range)"
            )));
        }
        Ok(Self { begin, end })
    }
}

impl PortRange {
    /// Does this range ask the OS to choose?
    #[must_use]
    pub fn is_any(self) -> bool {
        self.begin == 0 && self.end == 0
    }

    /// Number of distinct ports in the range
    #[must_use]
    pub fn len(self) -> u32 {
        u32::from(self.end) - u32::from(self.begin) + 1
    }

    /// Ranges always hold at least one port.
    #[must_use]
    pub fn is_empty(self) -> bool {
        false
    }

    /// Uniformly draws a port from the range. For the "any" range this is always 0.
    pub fn random_port<R: Rng + ?Sized>(self, rng: &mut R) -> u16 {
        rng.gen_range(self.begin..=self.end)
    }
}

impl<'de> serde::Deserialize<'de> for PortRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Accept either `transfer_ports = 0` or `transfer_ports = "20000-30000"`
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        let s = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        FromStr::from_str(&s).map_err(|e: figment::Error| {
            if let figment::error::Kind::InvalidValue(_, _) = e.kind {
                de::Error::invalid_value(Unexpected::Str(&s), &EXPECTED)
            } else {
                de::Error::custom(e)
            }
        })
    }
}

impl From<PortRange> for figment::value::Value {
    fn from(value: PortRange) -> Self {
        value.to_string().into()
    }
}

#[cfg(test)]
mod tests {
    use super::PortRange;
    use std::str::FromStr;

    #[test]
    fn display() {
        assert_eq!(PortRange { begin: 0, end: 0 }.to_string(), "0");
        assert_eq!(PortRange::default().to_string(), "20000-30000");
    }

    #[test]
    fn parse_single() {
        let uut = PortRange::from_str("1234").unwrap();
        assert_eq!((uut.begin, uut.end), (1234, 1234));
        assert!(!uut.is_any());
        assert!(PortRange::from_str("0").unwrap().is_any());
    }

    #[test]
    fn parse_range() {
        let uut = PortRange::from_str("20000-20009").unwrap();
        assert_eq!((uut.begin, uut.end), (20000, 20009));
        assert_eq!(uut.len(), 10);
        let v = figment::value::Value::from(uut);
        assert_eq!(v.as_str(), Some("20000-20009"));
    }

    #[test]
    fn rejects() {
        for bad in ["1000-999", "-500", "65536", "nonsense", "0-1000", ""] {
            let _ = PortRange::from_str(bad).expect_err(bad);
        }
    }

    #[test]
    fn draws_stay_in_range() {
        let uut = PortRange {
            begin: 20000,
            end: 20003,
        };
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let p = uut.random_port(&mut rng);
            assert!((20000..=20003).contains(&p));
        }
        let any = PortRange { begin: 0, end: 0 };
        assert_eq!(any.random_port(&mut rng), 0);
    }

    #[test]
    fn deserialize_number_or_string() {
        #[derive(Debug, serde::Deserialize)]
        struct Holder {
            p: PortRange,
        }
        let h: Holder = serde_json::from_str(r#"{"p": 0}"#).unwrap();
        assert!(h.p.is_any());
        let h: Holder = serde_json::from_str(r#"{"p": "100-200"}"#).unwrap();
        assert_eq!(h.p, PortRange { begin: 100, end: 200 });
        let _ = serde_json::from_str::<Holder>(r#"{"p": "200-100"}"#).unwrap_err();
    }
}
