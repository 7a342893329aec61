use clap::{Parser, Subcommand};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "blackjack-rooms")]
#[command(about = "Blackjack rooms - server and client launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server and a scripted demo player against it
    Both {
        /// Port for the server
        #[arg(short, long, default_value = "5000")]
        port: u16,
        /// Rounds the demo player plays
        #[arg(short, long, default_value = "3")]
        rounds: u32,
    },
    /// Run only the server
    Server {
        /// Port for the server
        #[arg(short, long, default_value = "5000")]
        port: u16,
        /// Deck source: remote or local
        #[arg(short, long, default_value = "remote")]
        deck: String,
    },
    /// Run the interactive CLI client
    Client {
        #[arg(short, long, default_value = "http://127.0.0.1:5000")]
        url: String,
    },
    /// Run the scripted demo client
    Demo {
        #[arg(short, long, default_value = "http://127.0.0.1:5000")]
        url: String,
        #[arg(short, long, default_value = "3")]
        rounds: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Both { port, rounds } => {
            run_both(port, rounds);
        }
        Commands::Server { port, deck } => {
            run_server(port, &deck);
        }
        Commands::Client { url } => {
            run_bin("cli_client", &url, &[]);
        }
        Commands::Demo { url, rounds } => {
            run_bin("demo_cli", &url, &[rounds.to_string()]);
        }
    }
}

fn run_both(port: u16, rounds: u32) {
    println!("🚀 Starting blackjack server on port {} + demo player", port);

    // The demo needs no network beyond localhost, so deal from local decks
    let server_handle = thread::spawn(move || {
        run_server(port, "local");
    });

    // Wait a moment for server to start
    thread::sleep(Duration::from_millis(1500));

    let url = format!("http://127.0.0.1:{}", port);
    println!("🎮 Starting demo player against {}...", url);
    run_bin("demo_cli", &url, &[rounds.to_string()]);

    println!("✅ Demo finished. Server still running, press Ctrl+C to stop.");
    let _ = server_handle.join();
}

fn run_server(port: u16, deck: &str) {
    let status = Command::new("cargo")
        .args(["run", "-p", "blackjack-server", "--", "--deck", deck])
        .env("PORT", port.to_string())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(exit_status) => {
            if !exit_status.success() {
                eprintln!("❌ Server exited with error: {}", exit_status);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start server: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_bin(bin: &str, url: &str, extra: &[String]) {
    let status = Command::new("cargo")
        .args(["run", "--bin", bin, "--"])
        .args(extra)
        .env("BLACKJACK_URL", url)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(exit_status) => {
            if !exit_status.success() {
                eprintln!("❌ {} exited with error: {}", bin, exit_status);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start {}: {}", bin, e);
            std::process::exit(1);
        }
    }
}
