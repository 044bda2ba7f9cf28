/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "notes",
    aliases: &["n", "note", "home"],
    description: "List notes",
  },
  Command {
    name: "add",
    aliases: &["a", "new", "create"],
    description: "Write a new note",
  },
  Command {
    name: "skills",
    aliases: &["s", "skill"],
    description: "Browse skills page by page",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit jot",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut ranked: Vec<(&Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (cmd, r)))
    .collect();

  // Stable, so equal ranks keep declaration order
  ranked.sort_by_key(|(_, r)| *r);
  ranked.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match at all
fn rank(cmd: &Command, input: &str) -> Option<u8> {
  let aliases = || cmd.aliases.iter();

  if cmd.name == input {
    Some(0)
  } else if aliases().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) || aliases().any(|a| a.contains(input)) {
    Some(4)
  } else {
    None
  }
}
