use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use modbus_reader::catalog::RegisterCatalog;
use modbus_reader::report::{JsonRecord, Painter};
use modbus_reader::scan::{run_until, RegisterReport};
use modbus_reader::transport::ModbusTransport;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "modbus-reader",
    version,
    about = "Read and decode inverter holding registers over Modbus"
)]
struct Cli {
    /// Register catalog (JSON array of register entries)
    #[arg(short, long, default_value = "inverter.json")]
    config: PathBuf,

    /// Device IP address
    #[arg(long, default_value = "10.0.0.111")]
    host: IpAddr,

    /// Modbus TCP port
    #[arg(long, default_value_t = 502)]
    port: u16,

    /// Modbus unit (slave) id
    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// Serial device for Modbus RTU instead of TCP (needs the `serial` feature)
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    baud_rate: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Repeat the scan every N milliseconds until interrupted
    #[arg(long)]
    interval: Option<u64>,

    /// Milliseconds the device gets to answer a connect or read request
    #[arg(long, default_value_t = 10_000)]
    timeout: u64,

    /// Suppress the banner
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let painter = Painter::new(!cli.no_color);

    if !cli.quiet && cli.format == Format::Text {
        println!("{}", painter.banner());
    }

    let catalog = RegisterCatalog::load(&cli.config)
        .with_context(|| format!("loading register catalog {}", cli.config.display()))?;
    info!(registers = catalog.len(), "catalog loaded");

    let mut transport = connect(&cli).await?;

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let passes = run_until(
        &catalog,
        &mut transport,
        cli.interval.map(Duration::from_millis),
        shutdown,
        |report| emit(&cli, &painter, &report),
    )
    .await;
    info!(passes, "scan finished");

    transport.disconnect().await;
    Ok(())
}

async fn connect(cli: &Cli) -> Result<ModbusTransport> {
    let timeout = Duration::from_millis(cli.timeout);
    if let Some(path) = &cli.serial {
        #[cfg(feature = "serial")]
        return ModbusTransport::connect_rtu(path, cli.baud_rate, cli.unit_id, timeout)
            .with_context(|| format!("opening serial port {path}"));
        #[cfg(not(feature = "serial"))]
        anyhow::bail!(
            "cannot open {path} at {} baud: built without the `serial` feature",
            cli.baud_rate
        );
    }

    let socket_addr = SocketAddr::new(cli.host, cli.port);
    ModbusTransport::connect_tcp(socket_addr, cli.unit_id, timeout)
        .await
        .with_context(|| format!("connecting to {socket_addr}"))
}

fn emit(cli: &Cli, painter: &Painter, report: &RegisterReport<'_>) {
    match cli.format {
        Format::Text => println!("{}", painter.line(report)),
        Format::Json => match serde_json::to_string(&JsonRecord::new(report)) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(%err, name = %report.descriptor.name, "cannot encode report"),
        },
    }
}
