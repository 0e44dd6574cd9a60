// CLI modules
mod args;
mod op;
mod ops;

// Mount runtime
mod config;
mod fuse;
mod logging;
mod session;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Mount, Unmount, Version};

command_enum! {
    (Mount, Mount),
    (Unmount, Unmount),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
