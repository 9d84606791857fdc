use anyhow::{anyhow, Result};
use tutor_core::modes::{ComplexityLevel, Mode, ProjectType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    Mode(Mode),
    Level(Option<ComplexityLevel>),
    Project(Option<ProjectType>),
    Context(Option<String>),
    Session,
    Help,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(SlashCommand),
    Message(String),
}

pub fn parse_input(line: &str) -> Result<Input> {
    let s = line.trim();
    if s.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(rest) = s.strip_prefix('/') else {
        return Ok(Input::Message(s.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((n, a)) => (n, a.trim()),
        None => (rest, ""),
    };
    let cmd = match name {
        "mode" => SlashCommand::Mode(required(name, arg)?.parse()?),
        "level" => SlashCommand::Level(optional(name, arg)?.map(str::parse).transpose()?),
        "project" => SlashCommand::Project(optional(name, arg)?.map(str::parse).transpose()?),
        "context" => SlashCommand::Context(optional(name, arg)?.map(str::to_string)),
        "session" => SlashCommand::Session,
        "help" | "?" => SlashCommand::Help,
        "quit" | "exit" | "q" => SlashCommand::Quit,
        other => return Err(anyhow!("unknown command /{} (try /help)", other)),
    };
    Ok(Input::Command(cmd))
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        return Err(anyhow!("/{} needs a value", name));
    }
    Ok(arg)
}

// "off" clears the setting.
fn optional<'a>(name: &str, arg: &'a str) -> Result<Option<&'a str>> {
    let arg = required(name, arg)?;
    Ok(if arg.eq_ignore_ascii_case("off") {
        None
    } else {
        Some(arg)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_input("  what is a monad?  ").unwrap(),
            Input::Message("what is a monad?".into())
        );
        assert_eq!(parse_input("   ").unwrap(), Input::Empty);
    }

    #[test]
    fn mode_switch() {
        assert_eq!(
            parse_input("/mode Inventor").unwrap(),
            Input::Command(SlashCommand::Mode(Mode::Inventor))
        );
        assert!(parse_input("/mode").is_err());
        assert!(parse_input("/mode wizard").is_err());
    }

    #[test]
    fn level_and_project_can_be_cleared() {
        assert_eq!(
            parse_input("/level beginner").unwrap(),
            Input::Command(SlashCommand::Level(Some(ComplexityLevel::Beginner)))
        );
        assert_eq!(
            parse_input("/level off").unwrap(),
            Input::Command(SlashCommand::Level(None))
        );
        assert_eq!(
            parse_input("/project ai_ml").unwrap(),
            Input::Command(SlashCommand::Project(Some(ProjectType::AiMl)))
        );
        assert!(parse_input("/project spaceship").is_err());
    }

    #[test]
    fn context_keeps_spaces() {
        assert_eq!(
            parse_input("/context first-year physics student").unwrap(),
            Input::Command(SlashCommand::Context(Some(
                "first-year physics student".into()
            )))
        );
    }

    #[test]
    fn misc_commands() {
        assert_eq!(
            parse_input("/quit").unwrap(),
            Input::Command(SlashCommand::Quit)
        );
        assert_eq!(
            parse_input("/session").unwrap(),
            Input::Command(SlashCommand::Session)
        );
        assert!(parse_input("/dance").is_err());
    }
}
