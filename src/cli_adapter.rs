use crate::types::Rating;
use anyhow::{Context, Result, anyhow, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text; may be blank, which the session ignores.
    Ask(String),
    NewChat,
    ToggleLanguage,
    ToggleTheme,
    Rate { index: usize, rating: Rating },
    ListCommon,
    AskCommon(usize),
    Home,
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> Result<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let command = match name {
        "new" => Command::NewChat,
        "lang" => Command::ToggleLanguage,
        "theme" => Command::ToggleTheme,
        "up" => Command::Rate {
            index: parse_index(arg, "/up")?,
            rating: Rating::Up,
        },
        "down" => Command::Rate {
            index: parse_index(arg, "/down")?,
            rating: Rating::Down,
        },
        "faq" => match arg {
            Some(_) => Command::AskCommon(parse_index(arg, "/faq")?),
            None => Command::ListCommon,
        },
        "home" => Command::Home,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command: /{other}"),
    };
    Ok(command)
}

fn parse_index(arg: Option<&str>, command: &str) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("{command} requires a message number"))?;
    arg.parse()
        .with_context(|| format!("invalid message number for {command}: {arg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_input("What is the probation period?\n").unwrap(),
            Command::Ask("What is the probation period?".to_string())
        );
    }

    #[test]
    fn blank_line_is_an_empty_question() {
        assert_eq!(parse_input("\n").unwrap(), Command::Ask(String::new()));
        assert_eq!(parse_input("   ").unwrap(), Command::Ask("   ".to_string()));
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("/new").unwrap(), Command::NewChat);
        assert_eq!(parse_input(" /lang ").unwrap(), Command::ToggleLanguage);
        assert_eq!(parse_input("/theme").unwrap(), Command::ToggleTheme);
        assert_eq!(parse_input("/faq").unwrap(), Command::ListCommon);
        assert_eq!(parse_input("/faq 2").unwrap(), Command::AskCommon(2));
        assert_eq!(parse_input("/home").unwrap(), Command::Home);
        assert_eq!(parse_input("/q").unwrap(), Command::Quit);
    }

    #[test]
    fn parses_ratings() {
        assert_eq!(
            parse_input("/up 3").unwrap(),
            Command::Rate {
                index: 3,
                rating: Rating::Up
            }
        );
        assert_eq!(
            parse_input("/down   5").unwrap(),
            Command::Rate {
                index: 5,
                rating: Rating::Down
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_input("/up").is_err());
        assert!(parse_input("/down x").is_err());
        assert!(parse_input("/frobnicate").is_err());
    }
}
