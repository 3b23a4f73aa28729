#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Copy,  // /copy
    Clear, // /clear
    Help,  // /help or /?
    Quit,  // /quit or /exit
}

/// Recognise one of the UI commands. Only the verb counts; anything after it
/// is ignored. Any other input, including unknown `/words` such as
/// `/usr/bin`, is a prompt and yields `None`.
pub fn parse_command(input: &str) -> Option<Command> {
    let verb = input.split_whitespace().next()?;
    match verb {
        "/copy" => Some(Command::Copy),
        "/clear" => Some(Command::Clear),
        "/help" | "/?" => Some(Command::Help),
        "/quit" | "/exit" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_verbs() {
        assert_eq!(parse_command("/copy"), Some(Command::Copy));
        assert_eq!(parse_command("  /clear  "), Some(Command::Clear));
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command("/?"), Some(Command::Help));
        assert_eq!(parse_command("/quit"), Some(Command::Quit));
        assert_eq!(parse_command("/exit now"), Some(Command::Quit));
    }

    #[test]
    fn everything_else_is_a_prompt() {
        assert_eq!(parse_command("/usr/bin contains what?"), None);
        assert_eq!(parse_command("/copyright law basics"), None);
        assert_eq!(parse_command("hello /quit"), None);
        assert_eq!(parse_command("   "), None);
    }
}
