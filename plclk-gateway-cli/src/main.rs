use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use plclk_gateway_models::{
    constants::DEFAULT_SOCKET_PATH, proto::WireDecode, read_frame, write_frame, ControlRequest,
    ControlResponse, FrameRead, READ_TEXT_CAP,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tokio::net::UnixStream;

/// Control client for the PL clock gateway
///
/// Each invocation opens the control endpoint, issues exactly one request
/// and exits. Failures map to a non-zero exit code derived from the
/// gateway's wire error code.
#[derive(Parser)]
#[command(name = "plclkctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Control client for the PL clock gateway", long_about = None)]
struct Cli {
    /// Control endpoint of the gateway daemon
    #[arg(short, long, env = "PLCLK_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Print the current clock rate in Hz
    Get,
    /// Request a new clock rate in Hz
    Set { rate: u64 },
    /// Enable the clock output
    Enable,
    /// Disable the clock output
    Disable,
    /// Print the legacy text view of the rate
    Read,
}

fn request_for(command: Command) -> ControlRequest {
    match command {
        Command::Get => ControlRequest::GetRate,
        Command::Set { rate } => ControlRequest::SetRate(rate),
        Command::Enable => ControlRequest::SetEnabled(true),
        Command::Disable => ControlRequest::SetEnabled(false),
        Command::Read => ControlRequest::Read {
            offset: 0,
            len: READ_TEXT_CAP as u32,
        },
    }
}

/// Exit status derived from a negative wire code, saturated to the 8-bit
/// range the process can actually report.
fn exit_code_for(status: i32) -> u8 {
    (-status).clamp(1, 255) as u8
}

async fn call(socket: &Path, request: &ControlRequest) -> Result<ControlResponse> {
    let mut stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("failed to open {}", socket.display()))?;
    write_frame(&mut stream, request).await?;
    match read_frame(&mut stream).await? {
        FrameRead::Frame(body) => Ok(ControlResponse::parse(&body)?),
        FrameRead::Eof => bail!("connection closed before a response arrived"),
        FrameRead::Oversized { len } => bail!("oversized response frame ({len} bytes)"),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let response = call(&cli.socket, &request_for(cli.command)).await?;
    if !response.is_ok() {
        eprintln!("plclkctl: request failed with code {}", response.status);
        return Ok(ExitCode::from(exit_code_for(response.status)));
    }
    match cli.command {
        Command::Get => {
            let rate = response.rate().context("response carried no rate")?;
            println!("{rate}");
        }
        Command::Read => {
            std::io::stdout().write_all(&response.payload)?;
        }
        Command::Set { .. } | Command::Enable | Command::Disable => {}
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("plclkctl: {e:#}");
            ExitCode::FAILURE
        }
    }
}
