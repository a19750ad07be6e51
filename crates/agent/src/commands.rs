//! Colon commands typed at the agent (`:introspect`, `:status`, ...).

/// A parsed command. The marker has already been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Introspect,
    Status,
    Help,
    Stop,
    Unknown(String),
}

impl Command {
    /// Parse the text after the command marker. Only the first word counts.
    pub fn parse(text: &str) -> Self {
        let name = text.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
        match name.as_str() {
            "introspect" => Command::Introspect,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "stop" | "quit" | "exit" => Command::Stop,
            _ => Command::Unknown(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Introspect => "introspect",
            Command::Status => "status",
            Command::Help => "help",
            Command::Stop => "stop",
            Command::Unknown(name) => name,
        }
    }
}

pub fn help_text(prefix: &str) -> String {
    format!(
        "Available commands:\n  \
         {prefix}introspect  show the full internal state as JSON\n  \
         {prefix}status      show energy, mood, confidence and the provider policy\n  \
         {prefix}help        show this help\n  \
         {prefix}stop        stop the agent"
    )
}

pub fn unknown_text(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        format!("Missing command name. Type {prefix}help for available commands.")
    } else {
        format!("Unknown command: {name}. Type {prefix}help for available commands.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_commands() {
        assert_eq!(Command::parse("introspect"), Command::Introspect);
        assert_eq!(Command::parse(" STATUS "), Command::Status);
        assert_eq!(Command::parse("help me"), Command::Help);
        assert_eq!(Command::parse("quit"), Command::Stop);
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(Command::parse("dance now"), Command::Unknown("dance".into()));
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }

    #[test]
    fn texts_use_prefix() {
        assert!(help_text("/").contains("/introspect"));
        assert_eq!(
            unknown_text(":", "dance"),
            "Unknown command: dance. Type :help for available commands."
        );
    }
}
