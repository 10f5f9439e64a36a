//! Text commands, read line by line from stdin.

use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::color::{Color, ParseColorError};
use crate::light::LightStep;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    /// Make `color` current and paint `part` with it.
    Paint { part: String, color: Color },
    /// Make `color` current without painting.
    SelectColor(Color),
    SelectPart(String),
    Light(LightStep),
    Frame,
    ListParts,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Color(#[from] ParseColorError),
}

impl FromStr for ViewerCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("paint", [part, color]) => ViewerCommand::Paint {
                part: part.to_string(),
                color: color.parse()?,
            },
            ("paint", _) => return Err(CommandError::Usage("paint <part> <color>")),
            ("color", [color]) => ViewerCommand::SelectColor(color.parse()?),
            ("color", _) => return Err(CommandError::Usage("color <color>")),
            ("select", [part]) => ViewerCommand::SelectPart(part.to_string()),
            ("select", _) => return Err(CommandError::Usage("select <part>")),
            ("light", [direction]) => ViewerCommand::Light(match *direction {
                "up" => LightStep::Up,
                "down" => LightStep::Down,
                "left" => LightStep::Left,
                "right" => LightStep::Right,
                _ => return Err(CommandError::Usage("light <up|down|left|right>")),
            }),
            ("light", _) => return Err(CommandError::Usage("light <up|down|left|right>")),
            ("frame", []) => ViewerCommand::Frame,
            ("parts", []) => ViewerCommand::ListParts,
            ("quit" | "exit", []) => ViewerCommand::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

/// Forward parsed stdin lines to `deliver` until stdin closes or `deliver`
/// returns `false`.
pub fn spawn_stdin_reader<F>(mut deliver: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut(ViewerCommand) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<ViewerCommand>() {
                    Ok(command) => {
                        if !deliver(command) {
                            break;
                        }
                    }
                    Err(e) => warn!("{e}"),
                },
                Ok(None) => {
                    debug!("stdin closed, command reader stopping");
                    break;
                }
                Err(e) => {
                    warn!("failed to read command: {e}");
                    break;
                }
            }
        }
    })
}
