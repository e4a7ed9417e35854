//! Simulator console on stdin.
//!
//! One command per line:
//!
//! ```text
//! 12AB34CD          present a card
//! link up|down      move the simulated radio
//! fix LAT LON       publish a good fix at the given position
//! fix lost          drop the fix
//! status            log the device state
//! quit              stop the unit
//! ```

use tracklink_core::CardUid;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Present(CardUid),
    Link(bool),
    Fix { latitude: f64, longitude: f64 },
    FixLost,
    Status,
    Quit,
}

/// Parse one console line.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (first.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("link", ["up"]) => ConsoleCommand::Link(true),
        ("link", ["down"]) => ConsoleCommand::Link(false),
        ("fix", ["lost"]) => ConsoleCommand::FixLost,
        ("fix", [latitude, longitude]) => ConsoleCommand::Fix {
            latitude: parse_coordinate(latitude, 90.0)?,
            longitude: parse_coordinate(longitude, 180.0)?,
        },
        ("status", []) => ConsoleCommand::Status,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        (_, []) => ConsoleCommand::Present(CardUid::new(first).map_err(|e| e.to_string())?),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };

    Ok(Some(command))
}

fn parse_coordinate(value: &str, limit: f64) -> Result<f64, String> {
    let coordinate: f64 = value
        .parse()
        .map_err(|_| format!("not a coordinate: {value}"))?;
    if !coordinate.is_finite() || coordinate.abs() > limit {
        return Err(format!("coordinate out of range: {value}"));
    }
    Ok(coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("link up", ConsoleCommand::Link(true))]
    #[case("LINK down", ConsoleCommand::Link(false))]
    #[case("fix lost", ConsoleCommand::FixLost)]
    #[case("fix 41.0082 28.9784", ConsoleCommand::Fix { latitude: 41.0082, longitude: 28.9784 })]
    #[case("  status ", ConsoleCommand::Status)]
    #[case("quit", ConsoleCommand::Quit)]
    fn test_parse_commands(#[case] line: &str, #[case] expected: ConsoleCommand) {
        assert_eq!(parse(line).unwrap(), Some(expected));
    }

    #[test]
    fn test_parse_card() {
        let command = parse("12ab34cd").unwrap().unwrap();
        let ConsoleCommand::Present(uid) = command else {
            panic!("expected a card, got {command:?}");
        };
        assert_eq!(uid.as_str(), "12AB34CD");
    }

    #[rstest]
    #[case("link sideways")]
    #[case("fix 91 0")]
    #[case("fix north east")]
    #[case("XYZ")]
    fn test_parse_rejects(#[case] line: &str) {
        assert!(parse(line).is_err());
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
    }
}
