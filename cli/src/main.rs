use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use common::encryption::{EnvelopeCodec, KeyPairProvider, KeyWrapping};
use common::{Config, HospitalProfile, KeyLocation, Result, ShipmentRecord, TrackError};
use custody::{FileCredentialStore, KeyCustodyManager, Role, Session, SessionStore};
use distribution::{KeyDistributor, KeyStore, LedgerClient, RedisKeyStore, RetryPolicy};
use env_logger::fmt::Color;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use securetrack::{new_shipment_id, open_shipment, seal_shipment};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BANNER: &str = r#"
╔═══════════════════════════════════════════════════════════════════╗
║                                                                   ║
║   SecureTrack                                                     ║
║   Confidential vaccine shipment envelopes v0.1.0                  ║
║                                                                   ║
╚═══════════════════════════════════════════════════════════════════╝
"#;

#[derive(Parser)]
#[command(name = "securetrack", version, about = "Seal and open confidential shipment details")]
struct Args {
    /// Where externally placed keys live
    #[arg(long, value_enum, default_value_t = StoreKind::Ledger, global = true)]
    key_store: StoreKind,

    /// Emit the 32-byte key only, for peers that do not check the bound digest
    #[arg(long, global = true)]
    legacy_wrapping: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Ledger,
    Redis,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a key pair, keep the private half and print the public half
    Keygen {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
    /// Encrypt shipment details for a hospital and print the shipment record
    Encrypt {
        #[arg(long)]
        hospital: String,
        #[arg(long)]
        public_key: PathBuf,
        /// JSON details, or @path to read them from a file
        #[arg(long)]
        details: String,
        #[arg(long)]
        shipment_id: Option<String>,
        #[arg(long, default_value = "external")]
        location: KeyLocation,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decrypt a shipment record with the key held on this device
    Decrypt {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        record: PathBuf,
    },
    /// Write the private key to a file for offline safekeeping
    ExportBackup {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        out: PathBuf,
    },
    RestoreBackup {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        from: PathBuf,
        /// Published public key to check the restored key against
        #[arg(long)]
        public_key: Option<PathBuf>,
    },
    /// Place an inline key into the external store
    Publish {
        #[arg(long)]
        record: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the encapsulated key of a shipment
    Resolve {
        #[arg(long)]
        shipment_id: String,
    },
    Login {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "hospital")]
        role: RoleArg,
    },
    /// Clear the session. Keys held on this device are kept
    Logout,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Manufacturer,
    Hospital,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Manufacturer => Role::Manufacturer,
            RoleArg::Hospital => Role::Hospital,
            RoleArg::Admin => Role::Admin,
        }
    }
}

fn setup_logger() {
    let mut builder = Builder::from_default_env();

    builder.format(|buf, record| {
        let mut timestamp_style = buf.style();
        let mut level_style = buf.style();
        let mut target_style = buf.style();
        let mut message_style = buf.style();

        let level_color = match record.level() {
            log::Level::Error => Color::Red,
            log::Level::Warn => Color::Yellow,
            log::Level::Info => Color::Green,
            log::Level::Debug => Color::Cyan,
            log::Level::Trace => Color::White,
        };

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(
            buf,
            "{} {} [{}] {}",
            timestamp_style.set_color(Color::Rgb(100, 100, 100)).value(timestamp),
            level_style.set_color(level_color).value(record.level()),
            target_style.set_color(Color::Blue).value(record.target()),
            message_style.set_color(Color::White).value(record.args())
        )
    });

    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter(None, LevelFilter::Info);
    }
    builder.init();
}

fn key_store(kind: StoreKind, config: &Config) -> Result<Arc<dyn KeyStore>> {
    Ok(match kind {
        StoreKind::Ledger => Arc::new(LedgerClient::from_config(config)?),
        StoreKind::Redis => Arc::new(RedisKeyStore::open(&config.redis_url)?),
    })
}

fn read_text(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn read_record(path: &Path) -> Result<ShipmentRecord> {
    Ok(serde_json::from_str(&read_text(path)?)?)
}

fn emit(json: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run(args: Args, config: Config) -> Result<()> {
    let custody = KeyCustodyManager::new(FileCredentialStore::new(&config.custody_dir)?);
    let codec = EnvelopeCodec::new(if args.legacy_wrapping {
        KeyWrapping::Legacy
    } else {
        KeyWrapping::Bound
    });
    if codec.wrapping() == KeyWrapping::Legacy {
        warn!("Legacy key wrapping: envelopes written now carry no ciphertext digest and tampering may go undetected");
    }
    let distributor = || -> Result<KeyDistributor> {
        Ok(KeyDistributor::new(
            key_store(args.key_store, &config)?,
            RetryPolicy::from_config(&config.key_store),
        ))
    };

    match args.command {
        Command::Keygen { principal, public_out } => {
            let provider = KeyPairProvider::new(config.rsa_key_bits)?;
            let pair = custody.register(&principal, &provider)?;
            emit(&pair.public_key, public_out.as_deref())?;
        }
        Command::Encrypt { hospital, public_key, details, shipment_id, location, out } => {
            let details = match details.strip_prefix('@') {
                Some(path) => read_text(Path::new(path))?,
                None => details,
            };
            let payload: serde_json::Value = serde_json::from_str(&details)?;
            let profile = HospitalProfile {
                name: hospital,
                public_key: read_text(&public_key)?,
                wallet_address: None,
            };
            let shipment_id = shipment_id.unwrap_or_else(new_shipment_id);
            let record = seal_shipment(&payload, &profile, &shipment_id, location, &codec, &distributor()?).await?;
            emit(&serde_json::to_string_pretty(&record)?, out.as_deref())?;
        }
        Command::Decrypt { principal, record } => {
            let record = read_record(&record)?;
            let plaintext = open_shipment(&record, &principal, &custody, &codec, &distributor()?).await?;
            println!("{}", plaintext);
        }
        Command::ExportBackup { principal, out } => {
            custody.export_backup_to(&principal, &out)?;
        }
        Command::RestoreBackup { principal, from, public_key } => {
            custody.restore_backup(&principal, &std::fs::read(&from)?)?;
            if let Some(public_key) = public_key {
                custody.verify_pairing(&principal, &read_text(&public_key)?)?;
                info!("Restored key matches the published public key");
            }
        }
        Command::Publish { record, out } => {
            let record = read_record(&record)?;
            let encrypted_key = record
                .encrypted_key
                .clone()
                .ok_or_else(|| TrackError::KeyNotFoundError(record.shipment_id.clone()))?;
            let envelope = common::EncryptedEnvelope {
                encrypted_data: record.encrypted_details,
                encrypted_key,
            };
            let published = distributor()?
                .publish(envelope, &record.shipment_id, KeyLocation::External)
                .await?;
            emit(&serde_json::to_string_pretty(&published)?, out.as_deref())?;
        }
        Command::Resolve { shipment_id } => {
            println!("{}", distributor()?.resolve_external(&shipment_id).await?);
        }
        Command::Login { principal, token, role } => {
            let sessions = SessionStore::new(&config.session_dir)?;
            sessions.begin(&Session::new(&principal, &token, role.into()))?;
            if custody.retrieve(&principal)?.is_none() {
                info!("No private key on this device for {}; run keygen or restore-backup", principal);
            }
        }
        Command::Logout => {
            SessionStore::new(&config.session_dir)?.logout()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    setup_logger();
    let args = Args::parse();
    if !args.quiet {
        eprintln!("{}", BANNER);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args, config).await {
        error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
