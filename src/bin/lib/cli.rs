pub use clap::Parser;
pub const DEFAULT_CHAIN: &str = "ethereum";

#[derive(Parser)]
/// Encode swap and bridge instructions for the warp router
///
/// Reads a JSON array from stdin, one object per instruction:
/// ```json
/// [{
///     "adapter": "generic_amm",
///     "chained": false,
///     "routing": [0, 0],
///     "payload": {
///         "amount_in": "1000000",
///         "amount_out_min": "0x0de0b6b3a7640000",
///         "path": ["0x...", "0x..."],
///         "recipient": "0x..."
///     }
/// }]
/// ```
/// and prints `{"commands": ["0x..."], "payloads": ["0x..."]}`. Amounts may be decimal strings,
/// `0x` hex strings or JSON numbers. Bridge payloads take their protocol from `adapter`; a missing
/// Across quote timestamp, Celer nonce or Hop deadline is derived from the current time.
pub struct Cli {
    /// Chain whose address table the routing indices are checked against
    #[arg(short, long, default_value = DEFAULT_CHAIN)]
    pub chain: String,

    /// Address table to use instead of the bundled one
    #[arg(short, long)]
    pub addresses_file_path: Option<String>,

    /// Seconds from now used for bridge deadlines left out of the input
    #[arg(long, default_value_t = 1_800)]
    pub deadline_window: u64,
}
