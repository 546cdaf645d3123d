//! Boundary components: Ground and Port.

use std::fmt;
use std::str::FromStr;

use super::terminals;
use crate::analysis::Stamp;
use crate::circuit::Terminal;
use crate::error::{Error, Result};

/// Reference node marker. Every node a ground terminal touches has voltage 0.
#[derive(Debug, Clone)]
pub struct Ground {
    pub name: String,
    pub(crate) terminals: [Terminal; 1],
}

impl Ground {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminals: terminals(["g"]),
        }
    }

    pub(crate) fn stamp(&self, _s: &mut Stamp<'_>) -> Result<()> {
        Ok(())
    }
}

/// Signal direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
    Bidirectional,
}

impl FromStr for PortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "input" | "in" => Ok(PortDirection::Input),
            "output" | "out" => Ok(PortDirection::Output),
            "bidirectional" | "inout" => Ok(PortDirection::Bidirectional),
            other => Err(Error::invalid_parameter(
                "port",
                "direction",
                format!("unknown direction '{other}'"),
            )),
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
            PortDirection::Bidirectional => f.write_str("bidirectional"),
        }
    }
}

/// A numbered boundary terminal.
///
/// At the top level an input port is driven by an audio input channel and an
/// output port's node voltage becomes an audio output channel. Inside a
/// subcircuit a port is tied to the parent node bound to the subcircuit
/// terminal of the same name, whatever its direction.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    /// Orders ports among a circuit's external terminals and audio channels
    pub number: usize,
    pub direction: PortDirection,
    pub(crate) terminals: [Terminal; 1],
}

impl Port {
    pub fn new(name: impl Into<String>, number: usize, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            number,
            direction,
            terminals: terminals(["int"]),
        }
    }

    pub(crate) fn stamp(&self, s: &mut Stamp<'_>) -> Result<()> {
        if s.is_nested() {
            return s.link_to_parent(&self.name);
        }
        match self.direction {
            PortDirection::Input => s.audio_input(self.number, &self.name),
            PortDirection::Output => {
                s.audio_output(self.number, &self.name);
                Ok(())
            }
            PortDirection::Bidirectional => {
                s.warn(format!(
                    "bidirectional port '{}' has no audio role at the top level",
                    self.name
                ));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trips_through_text() {
        for d in [
            PortDirection::Input,
            PortDirection::Output,
            PortDirection::Bidirectional,
        ] {
            assert_eq!(d.to_string().parse::<PortDirection>().unwrap(), d);
        }
        assert!("sideways".parse::<PortDirection>().is_err());
    }
}
