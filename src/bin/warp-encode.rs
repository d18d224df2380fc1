use std::{
    io::{self, Read},
    str::FromStr,
};

use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warp_router::execution::{
    evm::{adapters::adapter_registry::AdapterRegistry, address_table::AddressTable},
    models::Chain,
};

mod lib {
    pub mod cli;
    pub mod parse;
}

use lib::{cli::Cli, parse};

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warp_router=info,warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    // Read from stdin until EOF
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("Failed to read from stdin: {}", e))?;

    if buffer.trim().is_empty() {
        return Err("No input provided, see --help for the expected format".into());
    }

    let chain = Chain::from_str(&cli.chain)?;
    let table = AddressTable::load(cli.addresses_file_path.as_deref(), chain)?;
    let registry = AdapterRegistry::new(&table)?;

    let encoded = encode_instructions(&buffer, &registry, cli.deadline_window)?;

    // Output the encoded result as JSON to stdout
    println!(
        "{}",
        serde_json::to_string(&encoded)
            .map_err(|e| format!("Failed to serialize output: {}", e))?
    );

    Ok(())
}

fn encode_instructions(
    input: &str,
    registry: &AdapterRegistry,
    deadline_window: u64,
) -> Result<Value, Box<dyn std::error::Error>> {
    let instructions = parse::parse_instructions(input)?;
    let count = instructions.len();
    let mut commands = Vec::with_capacity(count);
    let mut payloads = Vec::with_capacity(count);

    for (position, instruction) in instructions.into_iter().enumerate() {
        let (command, payload) = parse::encode_instruction(instruction, deadline_window)?;
        if command.chained && position + 1 == count {
            return Err("The last instruction cannot be chained".into());
        }
        // Decoding with the adapter checks the routing indices against the address table.
        let decoded = registry
            .get(command.selector)?
            .decode(&command, &payload, None)?;
        debug!(position, adapter = %decoded.adapter(), len = payload.len(), "Encoded instruction");
        commands.push(format!("0x{}", hex::encode(command.encode())));
        payloads.push(format!("0x{}", hex::encode(&payload)));
    }
    info!(instructions = count, "Encoded instructions");

    Ok(serde_json::json!({
        "commands": commands,
        "payloads": payloads,
    }))
}
