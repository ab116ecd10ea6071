use std::io::{Error, ErrorKind, Result};
use std::sync::Arc;

use pack_engine::PackPlan;

#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Pack { quantity: u64 },
    Sizes,
    SetSizes { sizes: Vec<u64> },
    Quit,
}

impl Command {
    /// Parses a command line with the trailing CRLF already removed.
    pub(crate) fn parse(line: &[u8]) -> Result<Command> {
        let mut parts = line.split(|&b| b == b' ').filter(|part| !part.is_empty());

        let command = parts.next().ok_or_else(|| invalid("missing command"))?;
        let command = match command {
            b"pack" => {
                let quantity = parts.next().ok_or_else(|| invalid("missing quantity"))?;
                Command::Pack {
                    quantity: read_int(quantity, "quantity")?,
                }
            }
            b"sizes" => Command::Sizes,
            b"set_sizes" => {
                let sizes = parts
                    .by_ref()
                    .map(|part| read_int(part, "pack size"))
                    .collect::<Result<Vec<_>>>()?;
                Command::SetSizes { sizes }
            }
            b"quit" => Command::Quit,
            _ => return Err(invalid("unrecognised command")),
        };

        if parts.next().is_some() {
            return Err(invalid("unexpected trailing arguments"));
        }
        Ok(command)
    }
}

fn read_int(value: &[u8], field: &str) -> Result<u64> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| invalid(format!("invalid {}", field)))
}

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, message.into())
}

#[derive(Debug, PartialEq)]
pub(crate) enum Response {
    Plan(Arc<PackPlan>),
    Sizes(Vec<u64>),
    Stored,
    ClientError(String),
    ServerError(String),
}

impl Response {
    /// The response line without its CRLF terminator.
    pub(crate) fn to_line(&self) -> Result<Vec<u8>> {
        let line = match self {
            Response::Plan(plan) => {
                let mut line = b"PLAN ".to_vec();
                serde_json::to_writer(&mut line, plan.as_ref())?;
                line
            }
            Response::Sizes(sizes) => {
                let mut line = b"SIZES".to_vec();
                for size in sizes {
                    line.extend_from_slice(format!(" {}", size).as_bytes());
                }
                line
            }
            Response::Stored => b"STORED".to_vec(),
            Response::ClientError(message) => format!("CLIENT_ERROR {}", message).into_bytes(),
            Response::ServerError(message) => format!("SERVER_ERROR {}", message).into_bytes(),
        };
        Ok(line)
    }
}
