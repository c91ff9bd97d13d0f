//! `decode` and `encode` subcommands.

use std::io::Read;

use buggy_core::codec::MAX_DIGITS;
use buggy_core::{Command, Commander, FrameParser, TextAssembler};
use buggy_hardware::MemoryTransport;
use buggy_traits::TextMode;
use eyre::WrapErr;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Decoded {
    Frame { code: char, value: u32 },
    Text { text: String },
}

/// Parse every frame in `bytes`; runs of `'p'` frames come back as one text item.
pub fn decode(bytes: &[u8]) -> Vec<Decoded> {
    let mut parser = FrameParser::new();
    let mut text = TextAssembler::new();
    let mut out = Vec::new();
    parser.feed(bytes, |cmd| {
        if cmd.code == TextAssembler::CODE {
            if let Some(line) = text.push(cmd.value) {
                out.push(Decoded::Text {
                    text: line.to_owned(),
                });
            }
        } else {
            out.push(Decoded::Frame {
                code: cmd.code,
                value: cmd.value,
            });
        }
    });
    out
}

pub fn run_decode(input: Option<&str>, json: bool) -> eyre::Result<()> {
    let bytes = match input {
        Some(s) => s.as_bytes().to_vec(),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .wrap_err("read stdin")?;
            buf
        }
    };
    for item in decode(&bytes) {
        if json {
            println!("{}", serde_json::to_string(&item)?);
        } else {
            match item {
                Decoded::Frame { code, value } => println!("{code} {value}"),
                Decoded::Text { text } => println!("text {text:?}"),
            }
        }
    }
    Ok(())
}

/// Parse `CODE[VALUE]`, e.g. `y200` or `Q`.
pub fn parse_command(s: &str) -> eyre::Result<Command> {
    let mut chars = s.chars();
    let code = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c,
        _ => eyre::bail!("invalid command {s:?}: must start with a letter"),
    };
    let digits = chars.as_str();
    if digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        eyre::bail!("invalid command {s:?}: value must be at most {MAX_DIGITS} digits");
    }
    let value = if digits.is_empty() {
        0
    } else {
        digits
            .parse::<u32>()
            .wrap_err_with(|| format!("invalid command {s:?}: value must fit in 32 bits"))?
    };
    Ok(Command::new(code, value))
}

/// Encode commands and an optional text line exactly as a vehicle would send them.
pub fn encode(commands: &[String], text: Option<&str>, chained: bool) -> eyre::Result<Vec<u8>> {
    let mode = if chained {
        TextMode::Chained
    } else {
        TextMode::Ui
    };
    let (transport, remote) = MemoryTransport::new("encode");
    let mut commander = Commander::<MemoryTransport>::new(transport.with_text_mode(mode));
    for s in commands {
        let cmd = parse_command(s)?;
        if !commander.send(cmd.code, cmd.value) {
            commander.flush()?;
            commander.send(cmd.code, cmd.value);
        }
    }
    if let Some(t) = text {
        commander.flush()?;
        commander.print_line(t);
    }
    commander.flush()?;
    Ok(remote.take_output())
}

pub fn run_encode(commands: &[String], text: Option<&str>, chained: bool) -> eyre::Result<()> {
    let bytes = encode(commands, text, chained)?;
    let out = String::from_utf8_lossy(&bytes);
    if out.ends_with('\n') {
        print!("{out}");
    } else {
        println!("{out}");
    }
    Ok(())
}
