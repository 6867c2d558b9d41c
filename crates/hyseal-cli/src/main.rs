//! hyseal: hybrid RSA + AES-EAX file encryption
//!
//! Commands:
//!   keygen                       - generate an RSA key pair and write it as PEM
//!   encrypt [<input>] [-o out]   - seal a file (or stdin) for a public key
//!   decrypt [<input>] [-o out]   - open a container with the private key
//!   fingerprint                  - print the SHA-256 fingerprint of a key
//!   config show                  - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use hyseal_core::config::expand_tilde;
use hyseal_core::HysealConfig;
use hyseal_crypto::{
    fingerprint, generate_key_pair, save_key_pair, CryptoError, Decryptor, Encryptor, RsaKey,
    Settings, StreamStats,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hyseal",
    version,
    about = "Hybrid RSA-OAEP / AES-EAX streaming encryption",
    long_about = "hyseal: encrypt files for an RSA public key and decrypt them with the private key, \
                  streaming in bounded memory"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(
        long,
        short = 'c',
        env = "HYSEAL_CONFIG",
        default_value = "~/.config/hyseal/config.toml",
        global = true
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log].level
    #[arg(long, env = "HYSEAL_LOG", global = true)]
    log: Option<String>,

    /// Log format; overrides [log].format
    #[arg(long, env = "HYSEAL_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA key pair
    Keygen {
        /// Private key output (default: [keys].private_key, else ./private.pem)
        #[arg(long)]
        private: Option<PathBuf>,
        /// Public key output (default: [keys].public_key, else ./public.pem)
        #[arg(long)]
        public: Option<PathBuf>,
        /// Modulus size in bits (default: [keys].key_bits)
        #[arg(long)]
        bits: Option<usize>,
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Encrypt a file or stdin
    Encrypt {
        /// Public (or private) key file (default: [keys].public_key, then [keys].private_key)
        #[arg(long, short = 'k')]
        key: Option<PathBuf>,
        /// Input file (default: stdin)
        input: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Decrypt a container
    ///
    /// When writing to a file, plaintext is staged next to the destination and
    /// only moved into place once the tag verifies. On stdout, plaintext is
    /// streamed before verification unless --buffer is given.
    Decrypt {
        /// Private key file (default: [keys].private_key)
        #[arg(long, short = 'k')]
        key: Option<PathBuf>,
        /// Input container (default: stdin)
        input: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Hold the plaintext in memory and emit it only after verification
        #[arg(long)]
        buffer: bool,
    },

    /// Print the SHA-256 fingerprint of a key's public half
    Fingerprint {
        /// Key file (default: [keys].public_key, then [keys].private_key)
        #[arg(long, short = 'k')]
        key: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = HysealConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli
        .log_format
        .clone()
        .or_else(|| LogFormat::from_str(&config.log.format, true).ok())
        .unwrap_or(LogFormat::Text);
    init_logging(level, &format);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "hyseal starting"
    );

    match cli.command {
        Commands::Keygen {
            private,
            public,
            bits,
            force,
        } => cmd_keygen(&config, private.as_deref(), public.as_deref(), bits, force),
        Commands::Encrypt { key, input, output } => {
            cmd_encrypt(&config, key.as_deref(), input.as_deref(), output.as_deref())
        }
        Commands::Decrypt {
            key,
            input,
            output,
            buffer,
        } => cmd_decrypt(
            &config,
            key.as_deref(),
            input.as_deref(),
            output.as_deref(),
            buffer,
        ),
        Commands::Fingerprint { key } => cmd_fingerprint(&config, key.as_deref()),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

/// Logs go to stderr; stdout may carry container or plaintext bytes.
fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resolve a key path: CLI flag > config entries in order > error
fn resolve_key(flag: Option<&Path>, fallbacks: &[Option<&PathBuf>], what: &str) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| fallbacks.iter().flatten().next().map(|p| (*p).clone()))
        .map(|p| expand_tilde(&p))
        .with_context(|| format!("no {what} given: pass --key or set it under [keys] in the config"))
}

fn settings_from(config: &HysealConfig) -> Result<Settings> {
    Settings::try_from(&config.crypto).context("invalid [crypto] settings")
}

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Open the input stream. A file input gets a byte progress bar when stderr
/// is a terminal.
fn open_input(input: Option<&Path>, prefix: &str) -> Result<(Box<dyn Read>, Option<ProgressBar>)> {
    let Some(path) = input else {
        return Ok((Box::new(io::stdin().lock()), None));
    };
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    if !io::stderr().is_terminal() {
        return Ok((Box::new(reader), None));
    }
    let len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let pb = make_progress_bar(len, prefix);
    pb.set_message(path.display().to_string());
    Ok((Box::new(pb.wrap_read(reader)), Some(pb)))
}

fn finish_progress(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

// ── `hyseal keygen` ───────────────────────────────────────────────────────────

fn cmd_keygen(
    config: &HysealConfig,
    private: Option<&Path>,
    public: Option<&Path>,
    bits: Option<usize>,
    force: bool,
) -> Result<()> {
    let private_path = private
        .map(Path::to_path_buf)
        .or_else(|| config.keys.private_key.clone())
        .map(|p| expand_tilde(&p))
        .unwrap_or_else(|| PathBuf::from("private.pem"));
    let public_path = public
        .map(Path::to_path_buf)
        .or_else(|| config.keys.public_key.clone())
        .map(|p| expand_tilde(&p))
        .unwrap_or_else(|| PathBuf::from("public.pem"));
    let bits = bits.unwrap_or(config.keys.key_bits);

    if !force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }

    let spinner = make_spinner("keygen");
    spinner.set_message(format!("generating {bits}-bit RSA key pair"));
    let key = generate_key_pair(bits);
    spinner.finish_and_clear();
    let key = key.context("generating RSA key pair")?;

    save_key_pair(&key, &private_path, &public_path).context("saving key pair")?;
    let fp = fingerprint(&key.to_public_key()).context("computing fingerprint")?;

    println!("private key: {}", private_path.display());
    println!("public key:  {}", public_path.display());
    println!("fingerprint: {fp}");
    Ok(())
}

// ── `hyseal encrypt` ──────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &HysealConfig,
    key: Option<&Path>,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let key_path = resolve_key(
        key,
        &[config.keys.public_key.as_ref(), config.keys.private_key.as_ref()],
        "encryption key",
    )?;
    let encryptor = Encryptor::new(key_path.as_path(), settings_from(config)?)
        .with_context(|| format!("loading key {}", key_path.display()))?
        .with_chunk_size(config.crypto.chunk_size);

    let (reader, pb) = open_input(input, "encrypt")?;
    let result = match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            encryptor.encrypt_stream(reader, BufWriter::new(file))
        }
        None => encryptor.encrypt_stream(reader, io::stdout().lock()),
    };
    finish_progress(pb);

    let stats = result.context("encryption failed")?;
    log_stats("encrypted", &stats);
    Ok(())
}

// ── `hyseal decrypt` ──────────────────────────────────────────────────────────

fn cmd_decrypt(
    config: &HysealConfig,
    key: Option<&Path>,
    input: Option<&Path>,
    output: Option<&Path>,
    buffer: bool,
) -> Result<()> {
    let key_path = resolve_key(key, &[config.keys.private_key.as_ref()], "private key")?;
    let decryptor = Decryptor::new(key_path.as_path(), settings_from(config)?)
        .with_context(|| format!("loading key {}", key_path.display()))?
        .with_chunk_size(config.crypto.chunk_size);

    let (mut reader, pb) = open_input(input, "decrypt")?;

    let result = match output {
        Some(path) => decrypt_to_file(&decryptor, reader, path),
        None if buffer => decrypt_buffered(&decryptor, &mut reader),
        None => decryptor
            .decrypt_stream(reader, io::stdout().lock())
            .map_err(|e| match e {
                CryptoError::MacCheckFailed => anyhow::Error::new(e).context(
                    "unverified plaintext was already written to stdout and must be discarded",
                ),
                e => e.into(),
            }),
    };
    finish_progress(pb);

    let stats = result.context("decryption failed")?;
    log_stats("decrypted", &stats);
    Ok(())
}

/// Decrypt into a temporary file beside `dest`, renamed over it only after
/// the tag verifies. On failure the temporary file is removed.
fn decrypt_to_file(decryptor: &Decryptor, reader: impl Read, dest: &Path) -> Result<StreamStats> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating staging file in {}", dir.display()))?;

    let stats = decryptor.decrypt_stream(reader, BufWriter::new(staged.as_file_mut()))?;

    staged
        .persist(dest)
        .with_context(|| format!("moving plaintext into {}", dest.display()))?;
    Ok(stats)
}

/// Hold the whole container in memory; stdout sees only verified plaintext.
fn decrypt_buffered(decryptor: &Decryptor, reader: &mut dyn Read) -> Result<StreamStats> {
    let mut container = Vec::new();
    reader
        .read_to_end(&mut container)
        .context("reading container")?;

    let plaintext = decryptor.decrypt(&container)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&plaintext)?;
    stdout.flush()?;

    Ok(StreamStats {
        bytes: plaintext.len() as u64,
        chunks: 1,
    })
}

fn log_stats(action: &str, stats: &StreamStats) {
    info!(bytes = stats.bytes, chunks = stats.chunks, "{action}");
}

// ── `hyseal fingerprint` ──────────────────────────────────────────────────────

fn cmd_fingerprint(config: &HysealConfig, key: Option<&Path>) -> Result<()> {
    let key_path = resolve_key(
        key,
        &[config.keys.public_key.as_ref(), config.keys.private_key.as_ref()],
        "key",
    )?;
    let key = RsaKey::from_file(&key_path)
        .with_context(|| format!("loading key {}", key_path.display()))?;
    let fp = fingerprint(&key.public_key()).context("computing fingerprint")?;
    println!("{fp}  {}", key_path.display());
    Ok(())
}

// ── `hyseal config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &HysealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
