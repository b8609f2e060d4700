//! Records Registry CLI — `srr` command.
//!
//! Manage institution keys, create a ledger, issue record fingerprints,
//! and let anyone look up or verify them.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use records_registry::service::replay;
use records_registry::storage::{load_key, read_public_info, save_key};
use records_registry::time::micros_to_rfc3339;
use records_registry::{
    record_id_for, Fingerprint, Identity, InstitutionKey, IssueRequest, Journal, LedgerEvent,
    LedgerService, RecordId, SystemClock, TransferRequest,
};

use crate::config::Config;

const PASSPHRASE_ENV: &str = "SRR_PASSPHRASE";

// ── Passphrase helpers ────────────────────────────────────────────────────────

fn read_passphrase(prompt: &str) -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    eprint!("{prompt}");
    let mut passphrase = String::new();
    std::io::stdin()
        .read_line(&mut passphrase)
        .context("failed to read passphrase")?;
    Ok(passphrase.trim().to_string())
}

fn new_passphrase() -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        if passphrase.is_empty() {
            bail!("{PASSPHRASE_ENV} is set but empty");
        }
        return Ok(passphrase);
    }
    let passphrase = read_passphrase("Enter passphrase for new key: ")?;
    if passphrase.is_empty() {
        bail!("passphrase cannot be empty");
    }
    let confirm = read_passphrase("Confirm passphrase: ")?;
    if passphrase != confirm {
        bail!("passphrases do not match");
    }
    Ok(passphrase)
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Records Registry CLI — issue, look up and verify student record
/// fingerprints on a write-once ledger.
#[derive(Parser, Debug)]
#[command(
    name = "srr",
    about = "Records Registry CLI",
    version,
    long_about = "srr — Records Registry CLI\n\nIssue student record fingerprints to a write-once ledger,\nlook them up, and verify documents against them."
)]
struct Cli {
    /// Registry home directory (default: $SRR_HOME or ~/.srms)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage institution keys
    Key {
        #[command(subcommand)]
        subcommand: KeyCommands,
    },

    /// Create a new ledger
    Init {
        /// Name of the key whose identity becomes the owner
        #[arg(long, conflicts_with = "owner", required_unless_present = "owner")]
        key: Option<String>,

        /// Owner identity (idn_...)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Issue a record fingerprint (owner only)
    Issue {
        /// Name of the signing key
        #[arg(long)]
        key: String,

        #[command(flatten)]
        record: RecordSelector,

        #[command(flatten)]
        content: ContentSelector,
    },

    /// Look up a record fingerprint
    Get {
        #[command(flatten)]
        record: RecordSelector,
    },

    /// Verify a document or fingerprint against the ledger
    Verify {
        #[command(flatten)]
        record: RecordSelector,

        #[command(flatten)]
        content: ContentSelector,
    },

    /// Show the current owner
    Owner,

    /// Transfer ownership to another identity (owner only)
    Transfer {
        /// Name of the current owner's key
        #[arg(long)]
        key: String,

        /// New owner identity (idn_...)
        #[arg(long)]
        to: String,
    },

    /// Print journal events
    Log {
        /// Show only the last N events
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Check journal integrity and ledger invariants
    Audit,

    /// Compute a fingerprint
    Fingerprint {
        /// Text to fingerprint
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// File to fingerprint
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum KeyCommands {
    /// Generate a new encrypted key
    New {
        /// Key name
        #[arg(long)]
        name: String,
    },
    /// Show a key's identity
    Show {
        /// Key name
        #[arg(long)]
        name: String,
    },
    /// List keys
    List,
}

/// Which record: an explicit id, or the parts it is derived from.
#[derive(Args, Debug)]
struct RecordSelector {
    /// Record identifier (0x + 64 hex)
    #[arg(long, conflicts_with_all = ["institution", "student", "period"])]
    record_id: Option<String>,

    /// Institution name, used with --student and --period
    #[arg(long, requires_all = ["student", "period"])]
    institution: Option<String>,

    /// Student identifier
    #[arg(long)]
    student: Option<String>,

    /// Academic period
    #[arg(long)]
    period: Option<String>,
}

impl RecordSelector {
    fn resolve(&self) -> Result<RecordId> {
        if let Some(raw) = &self.record_id {
            return raw
                .parse()
                .with_context(|| format!("invalid record id '{raw}'"));
        }
        match (&self.institution, &self.student, &self.period) {
            (Some(i), Some(s), Some(p)) => Ok(RecordId(record_id_for(i, s, p))),
            _ => bail!("pass --record-id or all of --institution, --student and --period"),
        }
    }
}

/// Which content: an explicit fingerprint, or a file to hash.
#[derive(Args, Debug)]
struct ContentSelector {
    /// Record content fingerprint (0x + 64 hex)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    record_hash: Option<String>,

    /// Document whose SHA-256 is the content fingerprint
    #[arg(long)]
    file: Option<PathBuf>,
}

impl ContentSelector {
    fn resolve(&self) -> Result<Fingerprint> {
        match (&self.record_hash, &self.file) {
            (Some(raw), _) => raw
                .parse()
                .with_context(|| format!("invalid record hash '{raw}'")),
            (None, Some(path)) => Fingerprint::digest_file(path)
                .with_context(|| format!("failed to hash {}", path.display())),
            (None, None) => bail!("pass --record-hash or --file"),
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = Config::load(cli.home.as_deref()).and_then(|config| match cli.command {
        Commands::Key { subcommand } => match subcommand {
            KeyCommands::New { name } => cmd_key_new(&config, &name, verbose),
            KeyCommands::Show { name } => cmd_key_show(&config, &name),
            KeyCommands::List => cmd_key_list(&config),
        },
        Commands::Init { key, owner } => cmd_init(&config, key.as_deref(), owner.as_deref()),
        Commands::Issue {
            key,
            record,
            content,
        } => cmd_issue(&config, &key, &record, &content, verbose),
        Commands::Get { record } => cmd_get(&config, &record),
        Commands::Verify { record, content } => cmd_verify(&config, &record, &content),
        Commands::Owner => cmd_owner(&config),
        Commands::Transfer { key, to } => cmd_transfer(&config, &key, &to),
        Commands::Log { limit } => cmd_log(&config, limit),
        Commands::Audit => cmd_audit(&config),
        Commands::Fingerprint { text, file } => cmd_fingerprint(text.as_deref(), file.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_ledger(config: &Config) -> Result<()> {
    if !config.ledger_file.exists() {
        bail!(
            "no ledger at {} (run `srr init` first)",
            config.ledger_file.display()
        );
    }
    Ok(())
}

/// Open the ledger for a command that writes to it.
fn open_service(config: &Config) -> Result<LedgerService> {
    require_ledger(config)?;
    LedgerService::open(&config.ledger_file, Arc::new(SystemClock), config.journal)
        .with_context(|| format!("failed to open ledger {}", config.ledger_file.display()))
}

/// Load a snapshot for queries. Needs only read access to the journal.
fn open_snapshot(config: &Config) -> Result<LedgerService> {
    require_ledger(config)?;
    LedgerService::open_read_only(&config.ledger_file)
        .with_context(|| format!("failed to read ledger {}", config.ledger_file.display()))
}

fn load_named_key(config: &Config, name: &str) -> Result<InstitutionKey> {
    let path = config.key_path(name);
    if !path.exists() {
        bail!("key '{name}' not found (expected at {})", path.display());
    }
    let passphrase = read_passphrase(&format!("Passphrase for key '{name}': "))?;
    load_key(&path, &passphrase).with_context(|| format!("failed to unlock key '{name}'"))
}

fn describe(event: &LedgerEvent) -> String {
    match event {
        LedgerEvent::LedgerCreated { owner, .. } => format!("owner={owner}"),
        LedgerEvent::RecordIssued {
            record_id,
            issuer,
            record_hash,
            ..
        } => format!("record={record_id} hash={record_hash} issuer={issuer}"),
        LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
            ..
        } => format!("from={previous_owner} to={new_owner}"),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// `srr key new --name NAME`
fn cmd_key_new(config: &Config, name: &str, verbose: bool) -> Result<()> {
    let path = config.key_path(name);
    if path.exists() {
        bail!("key '{name}' already exists at {}", path.display());
    }

    let passphrase = new_passphrase()?;
    let key = InstitutionKey::new(Some(name.to_string()));
    save_key(&key, &path, &passphrase).context("failed to save key")?;

    println!("Created key '{name}'");
    println!("  Identity: {}", key.id());
    println!("  File:     {}", path.display());
    if verbose {
        println!("  Public key: {}", key.public_key_base64());
        println!("  Created:    {}", micros_to_rfc3339(key.created_at));
    }
    Ok(())
}

/// `srr key show --name NAME`
fn cmd_key_show(config: &Config, name: &str) -> Result<()> {
    let path = config.key_path(name);
    let info = read_public_info(&path)
        .with_context(|| format!("failed to read key '{name}' at {}", path.display()))?;

    println!("Key: {name}");
    println!("  Identity:   {}", info.identity);
    println!("  Public key: {}", info.public_key);
    println!("  Created:    {}", micros_to_rfc3339(info.created_at));
    Ok(())
}

/// `srr key list`
fn cmd_key_list(config: &Config) -> Result<()> {
    if !config.key_dir.exists() {
        println!("No keys found.");
        return Ok(());
    }

    let mut names: Vec<String> = std::fs::read_dir(&config.key_dir)
        .with_context(|| format!("failed to read {}", config.key_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .strip_suffix(".srk")
                .map(str::to_string)
        })
        .collect();
    names.sort();

    if names.is_empty() {
        println!("No keys found.");
        return Ok(());
    }
    for name in names {
        match read_public_info(&config.key_path(&name)) {
            Ok(info) => println!("{name}  {}", info.identity),
            Err(e) => println!("{name}  (unreadable: {e})"),
        }
    }
    Ok(())
}

/// `srr init (--key NAME | --owner IDENTITY)`
fn cmd_init(config: &Config, key: Option<&str>, owner: Option<&str>) -> Result<()> {
    let owner: Identity = match (key, owner) {
        (Some(name), _) => {
            read_public_info(&config.key_path(name))
                .with_context(|| format!("failed to read key '{name}'"))?
                .identity
        }
        (None, Some(raw)) => raw
            .parse()
            .with_context(|| format!("invalid owner identity '{raw}'"))?,
        (None, None) => bail!("pass --key or --owner"),
    };

    LedgerService::create(
        &config.ledger_file,
        owner,
        Arc::new(SystemClock),
        config.journal,
    )
    .context("failed to create ledger")?;

    println!("Created ledger {}", config.ledger_file.display());
    println!("  Owner: {owner}");
    Ok(())
}

/// `srr issue --key NAME <record> <content>`
fn cmd_issue(
    config: &Config,
    key_name: &str,
    record: &RecordSelector,
    content: &ContentSelector,
    verbose: bool,
) -> Result<()> {
    let record_id = record.resolve()?;
    let record_hash = content.resolve()?;
    // Unlock the key first so the journal lock is not held across a prompt.
    let key = load_named_key(config, key_name)?;
    let service = open_service(config)?;

    let request = IssueRequest::sign(&key, service.ledger_id()?, record_id, record_hash);
    let event = service.submit_issue(&request)?;

    println!("Issued record {record_id}");
    println!("  Hash:      {record_hash}");
    println!("  Issued at: {}", micros_to_rfc3339(event.timestamp()));
    if verbose {
        println!("  Issuer:    {}", key.id());
        println!("  Sequence:  {}", service.sequence()? - 1);
    }
    Ok(())
}

/// `srr get <record>`
fn cmd_get(config: &Config, record: &RecordSelector) -> Result<()> {
    let record_id = record.resolve()?;
    let entry = open_snapshot(config)?.get_record(&record_id)?;

    println!("Record {record_id}");
    println!("  Hash:      {}", entry.record_hash);
    println!("  Issued at: {}", micros_to_rfc3339(entry.issued_at));
    Ok(())
}

/// `srr verify <record> <content>`
fn cmd_verify(config: &Config, record: &RecordSelector, content: &ContentSelector) -> Result<()> {
    let record_id = record.resolve()?;
    let candidate = content.resolve()?;
    let verification = open_snapshot(config)?.verify_document(&record_id, candidate)?;

    if verification.matches {
        println!("MATCH");
        println!("  Record:    {record_id}");
        println!("  Issued at: {}", micros_to_rfc3339(verification.issued_at));
        Ok(())
    } else {
        println!("MISMATCH");
        println!("  Record:    {record_id}");
        println!("  Stored:    {}", verification.stored_hash);
        println!("  Presented: {}", verification.candidate);
        Err(anyhow!("document does not match the issued record"))
    }
}

/// `srr owner`
fn cmd_owner(config: &Config) -> Result<()> {
    println!("{}", open_snapshot(config)?.owner()?);
    Ok(())
}

/// `srr transfer --key NAME --to IDENTITY`
fn cmd_transfer(config: &Config, key_name: &str, to: &str) -> Result<()> {
    let new_owner: Identity = to
        .parse()
        .with_context(|| format!("invalid identity '{to}'"))?;
    let key = load_named_key(config, key_name)?;
    let service = open_service(config)?;

    let request = TransferRequest::sign(&key, service.ledger_id()?, new_owner, service.sequence()?);
    service.submit_transfer(&request)?;

    println!("Ownership transferred");
    println!("  From: {}", key.id());
    println!("  To:   {new_owner}");
    Ok(())
}

/// `srr log [--limit N]`
fn cmd_log(config: &Config, limit: Option<usize>) -> Result<()> {
    let entries = Journal::read_entries(&config.ledger_file)
        .with_context(|| format!("failed to read {}", config.ledger_file.display()))?;
    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));

    for entry in entries.iter().skip(skip) {
        println!(
            "#{:<6} {}  {:<20} {}",
            entry.seq,
            micros_to_rfc3339(entry.event.timestamp()),
            entry.event.name(),
            describe(&entry.event)
        );
    }
    Ok(())
}

/// `srr audit`
fn cmd_audit(config: &Config) -> Result<()> {
    let entries = Journal::read_entries(&config.ledger_file).with_context(|| {
        format!(
            "journal {} failed integrity check",
            config.ledger_file.display()
        )
    })?;
    let ledger = replay(&entries).context("journal violates ledger invariants")?;
    let head = entries.last().map(|e| e.checksum.as_str()).unwrap_or("");

    println!("Journal OK: {}", config.ledger_file.display());
    println!("  Entries: {}", entries.len());
    println!("  Records: {}", ledger.len());
    println!("  Owner:   {}", ledger.owner());
    println!("  Head:    {head}");
    Ok(())
}

/// `srr fingerprint (--text T | --file PATH)`
fn cmd_fingerprint(text: Option<&str>, file: Option<&Path>) -> Result<()> {
    let fingerprint = match (text, file) {
        (Some(text), _) => Fingerprint::digest(text),
        (None, Some(path)) => Fingerprint::digest_file(path)
            .with_context(|| format!("failed to hash {}", path.display()))?,
        (None, None) => bail!("pass --text or --file"),
    };
    println!("{fingerprint}");
    Ok(())
}
