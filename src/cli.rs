// CLI commands

use clap::{Parser, Subcommand};
use crate::config::{NodeConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, MAX_FRAME_LEN};
use crate::ledger::Bank;
use crate::network::{Client, Server};
use crate::wallet::{user_public_key, Address, KeyPair, TransactionBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Name of the bank's own identity
const BANK_IDENTITY: &str = "bank";

#[derive(Parser)]
#[command(name = "banknetcoin")]
#[command(about = "Minimal UTXO bank over TCP", long_about = None)]
pub struct Cli {
    /// Host clients connect to
    #[arg(long, global = true, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port the bank listens on
    #[arg(long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Timeout for connecting and for each frame read/write
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Largest accepted frame in bytes
    #[arg(long, global = true, default_value_t = MAX_FRAME_LEN)]
    pub max_frame: usize,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config(&self) -> NodeConfig {
        NodeConfig {
            host: self.host.clone(),
            port: self.port,
            max_frame_len: self.max_frame,
            io_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bank server
    Serve {
        /// Identity that receives the demonstration issuance
        #[arg(long, default_value = "alice")]
        seed_to: String,
        /// Amount of the demonstration issuance
        #[arg(long, default_value_t = 1000)]
        seed_amount: u64,
    },

    /// Check that the bank is reachable
    Ping,

    /// Get balance for a named identity
    Balance {
        name: String,
    },

    /// List unspent outputs of a named identity
    Utxo {
        name: String,
    },

    /// Send coins between named identities
    Tx {
        from: String,
        to: String,
        amount: u64,
    },

    /// Show the address and public key of a named identity
    Whois {
        name: String,
    },
}

/// CLI handler
pub struct CliHandler {
    config: NodeConfig,
}

impl CliHandler {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Handle CLI command
    pub async fn handle(&self, command: Commands) -> Result<(), String> {
        match command {
            Commands::Serve { seed_to, seed_amount } => self.serve(&seed_to, seed_amount).await,
            Commands::Ping => self.ping().await,
            Commands::Balance { name } => self.balance(&name).await,
            Commands::Utxo { name } => self.utxo(&name).await,
            Commands::Tx { from, to, amount } => self.tx(&from, &to, amount).await,
            Commands::Whois { name } => {
                let kp = KeyPair::from_name(&name);
                println!("{}:", name);
                println!("  Address: {}", kp.address);
                println!("  Public key: {}", hex::encode(kp.pubkey_bytes()));
                Ok(())
            }
        }
    }

    fn client(&self) -> Client {
        Client::new(self.config.clone())
    }

    /// Seed one issuance so the system can be played with, then serve
    async fn serve(&self, seed_to: &str, seed_amount: u64) -> Result<(), String> {
        let bank = Arc::new(Bank::new(KeyPair::from_name(BANK_IDENTITY)));
        log::info!("Bank identity {}", bank.address());

        let seed = bank
            .issue(seed_amount, user_public_key(seed_to))
            .await
            .map_err(|e| format!("Failed to seed {}: {}", seed_to, e))?;
        println!("Issued {} to {} ({})", seed_amount, seed_to, seed.id);
        log::info!(
            "Ledger holds {} unspent outputs, supply {}",
            bank.utxo_count().await,
            bank.total_supply().await
        );

        Server::new(bank, self.config.clone())
            .listen()
            .await
            .map_err(|e| format!("Server failed: {}", e))
    }

    async fn ping(&self) -> Result<(), String> {
        self.client().ping().await.map_err(|e| e.to_string())?;
        println!("pong from {}", self.config.server_addr());
        Ok(())
    }

    async fn balance(&self, name: &str) -> Result<(), String> {
        let public_key = user_public_key(name);
        let balance = self.client().balance(&public_key).await.map_err(|e| e.to_string())?;

        println!("Balance for {} ({}):", name, Address::from_public_key(&public_key));
        println!("  {}", balance);
        Ok(())
    }

    async fn utxo(&self, name: &str) -> Result<(), String> {
        let utxos = self
            .client()
            .utxo(&user_public_key(name))
            .await
            .map_err(|e| e.to_string())?;

        println!("Unspent outputs for {} ({}):", name, utxos.len());
        for output in utxos {
            println!("  {} {}", output.outpoint(), output.amount);
        }
        Ok(())
    }

    /// Fetch the sender's outputs, build and sign a payment, submit it
    async fn tx(&self, from: &str, to: &str, amount: u64) -> Result<(), String> {
        let sender = KeyPair::from_name(from);
        let recipient = user_public_key(to);
        let client = self.client();

        let utxos = client.utxo(&sender.public_key).await.map_err(|e| e.to_string())?;
        let tx = TransactionBuilder::new(&sender)
            .build(&utxos, &recipient, amount)
            .map_err(|e| e.to_string())?;

        println!("Transaction created:");
        println!("  TXID: {}", tx.id);
        println!("  Inputs: {}", tx.inputs.len());
        println!("  Outputs: {}", tx.outputs.len());

        if client.submit(&tx).await.map_err(|e| e.to_string())? {
            println!("accepted");
            Ok(())
        } else {
            Err(format!("Transaction {} rejected", tx.id))
        }
    }
}
