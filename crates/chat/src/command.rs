pub const SAVE_USAGE: &str = "Invalid format. Use: save user email@example.com, John Doe, +123456789, 123 Main St";
pub const GET_USAGE: &str = "Please provide an email. Use: get user email@example.com";
pub const DELETE_USAGE: &str = "Please provide an email. Use: delete user email@example.com";

/// One line typed at the chat prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Quit,
    Empty,
    SaveUser { email: String, name: String, phone: Option<String>, address: Option<String> },
    GetUser(String),
    ListUsers,
    DeleteUser(String),
    /// Recognised command with missing parts
    Usage(&'static str),
    Chat(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let lower = line.to_ascii_lowercase();
        if matches!(lower.as_str(), "quit" | "exit" | "bye") {
            return Self::Quit;
        }
        if matches!(lower.as_str(), "show users" | "list users" | "get all users") {
            return Self::ListUsers;
        }
        if let Some(rest) = strip_command(line, "save user") {
            return parse_save(rest);
        }
        if let Some(rest) = strip_command(line, "get user") {
            return if rest.is_empty() { Self::Usage(GET_USAGE) } else { Self::GetUser(rest.to_string()) };
        }
        if let Some(rest) = strip_command(line, "delete user") {
            return if rest.is_empty() { Self::Usage(DELETE_USAGE) } else { Self::DeleteUser(rest.to_string()) };
        }
        Self::Chat(line.to_string())
    }
}

/// Case-insensitive prefix match that must end at a word boundary.
fn strip_command<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &line[prefix.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn parse_save(rest: &str) -> ChatCommand {
    let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
    let optional = |i: usize| parts.get(i).filter(|s| !s.is_empty()).map(|s| s.to_string());
    match (parts.first(), parts.get(1)) {
        (Some(email), Some(name)) if !email.is_empty() && !name.is_empty() => ChatCommand::SaveUser {
            email: email.to_string(),
            name: name.to_string(),
            phone: optional(2),
            address: optional(3),
        },
        _ => ChatCommand::Usage(SAVE_USAGE),
    }
}
