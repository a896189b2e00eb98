//! exokv CLI Client
//!
//! Sends one command to an exokv server and prints the reply.

use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use exokv::protocol::{read_reply, Reply};

/// exokv CLI
#[derive(Parser, Debug)]
#[command(name = "exokv-cli")]
#[command(about = "CLI for the exokv key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:15000")]
    server: String,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Command and arguments, e.g. `SET greeting hello EX 60`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(reply) => {
            println!("{}", reply);
            if matches!(reply, Reply::Error(_)) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Could not talk to {}: {}", args.server, e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> exokv::Result<Reply> {
    let mut stream = TcpStream::connect(&args.server)?;
    if args.timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(args.timeout_ms)))?;
    }

    let line = format!("{}\r\n", args.command.join(" "));
    stream.write_all(line.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    read_reply(&mut reader)
}
