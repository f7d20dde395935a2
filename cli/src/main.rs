mod commands;

use std::env;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let (config, rest) = split_config_flag(&args[2..]);
    let cmd = &args[1];

    match cmd.as_str() {
        "tally" => {
            let json = rest.iter().any(|a| a == "--json");
            if let Err(e) = commands::tally(config.as_deref(), json).await {
                eprintln!("❌ Error reading tallies: {:#}", e);
                std::process::exit(1);
            }
        }
        "vote" => {
            let Some(index) = rest.first() else {
                println!("Usage: vote <index> [--config <path>]");
                println!("  index - Option position as listed by `shadowvote tally`");
                return;
            };

            let index: usize = match index.parse() {
                Ok(i) => i,
                Err(_) => {
                    eprintln!("❌ Error: index must be a non-negative number");
                    std::process::exit(1);
                }
            };

            if let Err(e) = commands::vote(config.as_deref(), index).await {
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
        "nullifier" => {
            let Some(address) = rest.first() else {
                println!("Usage: nullifier <address>");
                return;
            };
            if let Err(e) = commands::nullifier(address) {
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
        "config" => commands::print_sample_config(),
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Pull `--config <path>` out of the argument list
fn split_config_flag(args: &[String]) -> (Option<String>, Vec<String>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().cloned();
        } else {
            rest.push(arg.clone());
        }
    }
    (config, rest)
}

fn print_usage() {
    println!("ShadowVote CLI - Anonymous On-Chain Voting");
    println!();
    println!("USAGE:");
    println!("  shadowvote <command> [args] [--config <path>]");
    println!();
    println!("COMMANDS:");
    println!("  tally [--json]             Show current tallies");
    println!("  vote <index>               Prove and cast a vote for an option");
    println!("  nullifier <address>        Show the nullifier an address would publish");
    println!("  config                     Print a sample shadowvote.toml");
    println!("  help                       Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  shadowvote tally                     # Current standings");
    println!("  shadowvote vote 1                    # Vote for the second option");
    println!("  shadowvote config > shadowvote.toml  # Start a config file");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  SV_CONFIG              Config file path");
    println!("  SV_RPC_URL             Ledger JSON-RPC endpoint");
    println!("  SV_WALLET_URL          Wallet JSON-RPC endpoint (default: SV_RPC_URL)");
    println!("  SV_CONTRACT_ADDRESS    Voting contract address");
    println!("  SV_ABI_PATH            Voting contract ABI");
    println!("  SV_CIRCUIT_WASM        Circuit WASM artifact");
    println!("  SV_PROVING_KEY         Circuit proving key (.zkey)");
    println!("  RUST_LOG               Log level (debug/info/warn/error)");
}
