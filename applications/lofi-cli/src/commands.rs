/// Interactive transport commands read from stdin
use crate::error::{CliError, Result};
use lofi_core::EffectName;

pub const HELP: &str = "\
commands:
  p            play / pause
  s <percent>  seek (0-100)
  t <effect>   toggle lofi | jazz | reverb | vinyl | slowed
  r <rate>     base rate (0.5-1.0)
  l            list saved tracks
  o <n>        open saved track n
  i            status
  h            help
  q            quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlay,
    Seek(f64),
    Toggle(EffectName),
    Rate(f64),
    ListSaved,
    OpenSaved(usize),
    Status,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        return Err(CliError::InvalidCommand(format!("too many arguments: {line}")));
    }

    let command = match (verb, arg) {
        ("p" | "play" | "pause", None) => Command::TogglePlay,
        ("s" | "seek", Some(value)) => Command::Seek(number(value)?),
        ("t" | "toggle", Some(name)) => Command::Toggle(
            name.parse()
                .map_err(|e: lofi_core::LofiError| CliError::InvalidCommand(e.to_string()))?,
        ),
        ("r" | "rate", Some(value)) => Command::Rate(number(value)?),
        ("l" | "saved", None) => Command::ListSaved,
        ("o" | "open", Some(index)) => Command::OpenSaved(
            index
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| CliError::InvalidCommand(format!("not a track number: {index}")))?,
        ),
        ("i" | "status", None) => Command::Status,
        ("h" | "help" | "?", None) => Command::Help,
        ("q" | "quit" | "exit", None) => Command::Quit,
        _ => return Err(CliError::InvalidCommand(line.trim().to_string())),
    };
    Ok(Some(command))
}

fn number(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CliError::InvalidCommand(format!("not a number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_commands() {
        assert_eq!(parse("p").unwrap(), Some(Command::TogglePlay));
        assert_eq!(parse("  s 42.5 ").unwrap(), Some(Command::Seek(42.5)));
        assert_eq!(parse("r 0.7").unwrap(), Some(Command::Rate(0.7)));
        assert_eq!(parse("o 3").unwrap(), Some(Command::OpenSaved(3)));
        assert_eq!(parse("q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn parses_effect_aliases() {
        assert_eq!(
            parse("t vinyl").unwrap(),
            Some(Command::Toggle(EffectName::VinylCrackle))
        );
        assert_eq!(
            parse("toggle slowed").unwrap(),
            Some(Command::Toggle(EffectName::SlowedDown))
        );
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("s").is_err());
        assert!(parse("s abc").is_err());
        assert!(parse("s NaN").is_err());
        assert!(parse("t wobble").is_err());
        assert!(parse("o 0").is_err());
        assert!(parse("p now").is_err());
        assert!(parse("dance").is_err());
    }
}
