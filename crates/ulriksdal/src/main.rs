#![forbid(unsafe_code)]

//! Ulriksdal CLI: sign and verify enveloped XML signatures.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ulriksdal_core::{algorithm, Error};
use ulriksdal_dsig::{DsigContext, SignatureOptions, SignatureSelector, VerifyResult};
use ulriksdal_keys::KeysManager;

#[derive(Parser)]
#[command(
    name = "ulriksdal",
    about = "Ulriksdal: Pure Rust XML Signature with position-correct enveloped signatures",
    version
)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append an enveloped signature to the element with the given ID
    Sign {
        /// Input XML file
        file: PathBuf,

        /// ID of the element to sign
        #[arg(long)]
        id: String,

        /// Load private key (PEM or DER, auto-detected)
        #[arg(short = 'k', long)]
        key: Option<PathBuf>,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,

        /// Name the key and emit it as KeyInfo/KeyName
        #[arg(long = "key-name")]
        key_name: Option<String>,

        #[arg(long = "signature-method", default_value = algorithm::RSA_SHA256)]
        signature_method: String,

        #[arg(long = "digest-method", default_value = algorithm::SHA256)]
        digest_method: String,

        #[arg(long, default_value = algorithm::EXC_C14N)]
        c14n: String,

        /// Namespace prefix for the signature elements (e.g. ds)
        #[arg(long)]
        prefix: Option<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a signed XML document
    Verify {
        /// Input XML file
        file: PathBuf,

        /// Load public or private key (PEM or DER, auto-detected)
        #[arg(short = 'k', long)]
        key: Vec<PathBuf>,

        /// Load key with a name (NAME:FILE)
        #[arg(short = 'K', long = "key-name")]
        key_name: Vec<String>,

        /// Load raw HMAC key (binary file)
        #[arg(long = "hmac-key")]
        hmac_key: Option<PathBuf>,

        /// Verify the signature that is a child of the element with this ID
        #[arg(long = "signature-of", conflicts_with = "occurrence")]
        signature_of: Option<String>,

        /// Verify the N-th Signature element of the document (1-based)
        #[arg(long)]
        occurrence: Option<usize>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },

    /// Print the digest input and digest of an element
    Digest {
        /// Input XML file
        file: PathBuf,

        /// ID of the element to digest
        #[arg(long)]
        id: String,

        /// Exclude the N-th signature below the element (1-based)
        #[arg(long)]
        occurrence: Option<usize>,

        #[arg(long, default_value = algorithm::EXC_C14N)]
        c14n: String,

        #[arg(long = "digest-method", default_value = algorithm::SHA256)]
        digest_method: String,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },

    /// List supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Sign {
            file,
            id,
            key,
            hmac_key,
            key_name,
            signature_method,
            digest_method,
            c14n,
            prefix,
            id_attr,
            output,
        } => {
            let mut options = SignatureOptions::new()
                .with_signature_method(signature_method)
                .with_digest_method(digest_method)
                .with_c14n_method(c14n);
            if let Some(prefix) = prefix {
                options = options.with_prefix(prefix);
            }
            if let Some(name) = &key_name {
                options = options.with_key_name(name.clone());
            }
            cmd_sign(&file, &id, key, hmac_key, key_name, &options, &id_attr, output)
        }

        Commands::Verify {
            file,
            key,
            key_name,
            hmac_key,
            signature_of,
            occurrence,
            id_attr,
        } => {
            let selector = match (signature_of, occurrence) {
                (Some(id), _) => SignatureSelector::ChildOf(id),
                (None, Some(n)) => SignatureSelector::Occurrence(n),
                (None, None) => SignatureSelector::First,
            };
            cmd_verify(&file, key, key_name, hmac_key, &selector, &id_attr)
        }

        Commands::Digest {
            file,
            id,
            occurrence,
            c14n,
            digest_method,
            id_attr,
        } => cmd_digest(&file, &id, occurrence, &c14n, &digest_method, &id_attr),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::too_many_arguments)]
fn cmd_sign(
    file: &Path,
    id: &str,
    key: Option<PathBuf>,
    hmac_key: Option<PathBuf>,
    key_name: Option<String>,
    options: &SignatureOptions,
    id_attr: &[String],
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut loaded = Vec::new();
    if let Some(path) = &key {
        loaded.push(ulriksdal_keys::loader::load_key_file(path)?);
    }
    if let Some(path) = &hmac_key {
        loaded.push(ulriksdal_keys::loader::load_hmac_key(&std::fs::read(path)?));
    }
    let mut mgr = KeysManager::new();
    for mut k in loaded {
        k.name = key_name.clone();
        mgr.add_key(k);
    }

    let ctx = context(mgr, id_attr);
    let text = read_file(file)?;
    let mut doc = ulriksdal_xml::parse(&text)?;
    ulriksdal_dsig::sign(&ctx, &mut doc, id, options)?;
    write_output(output, doc.to_xml().as_bytes())
}

fn cmd_verify(
    file: &Path,
    key: Vec<PathBuf>,
    key_name: Vec<String>,
    hmac_key: Option<PathBuf>,
    selector: &SignatureSelector,
    id_attr: &[String],
) -> Result<(), Error> {
    let mut mgr = KeysManager::new();
    for path in &key {
        mgr.add_key(ulriksdal_keys::loader::load_key_file(path)?);
    }
    for entry in &key_name {
        let (name, path) = entry.split_once(':').ok_or_else(|| {
            Error::Other(format!("invalid key-name format: {entry} (expected NAME:FILE)"))
        })?;
        mgr.add_key(ulriksdal_keys::loader::load_key_file(Path::new(path))?.with_name(name));
    }
    if let Some(path) = hmac_key {
        mgr.add_key(ulriksdal_keys::loader::load_hmac_key(&std::fs::read(path)?));
    }

    let ctx = context(mgr, id_attr);
    match ulriksdal_dsig::verify_xml(&ctx, &read_file(file)?, selector)? {
        VerifyResult::Valid => {
            println!("OK");
            Ok(())
        }
        VerifyResult::Invalid { reason } => {
            println!("INVALID: {reason}");
            process::exit(1);
        }
    }
}

fn cmd_digest(
    file: &Path,
    id: &str,
    occurrence: Option<usize>,
    c14n: &str,
    digest_method: &str,
    id_attr: &[String],
) -> Result<(), Error> {
    let ctx = context(KeysManager::new(), id_attr);
    let text = read_file(file)?;
    let doc = ulriksdal_xml::parse(&text)?;
    let rd = ulriksdal_dsig::element_digest(&ctx, &doc, id, occurrence, c14n, digest_method)?;

    eprintln!("PreDigest data ({} bytes):", rd.pre_digest.len());
    println!("{}", String::from_utf8_lossy(&rd.pre_digest));
    eprintln!("--- END PreDigest ---");
    println!("{}", rd.digest_base64());
    Ok(())
}

fn cmd_info() -> Result<(), Error> {
    println!("Ulriksdal: Pure Rust XML Signature");
    print_section("Canonicalization", algorithm::ALL_C14N);
    print_section("Digest algorithms", ulriksdal_crypto::digest::SUPPORTED);
    print_section("Signature algorithms", ulriksdal_crypto::sign::SUPPORTED);
    print_section(
        "Transforms",
        &[algorithm::ENVELOPED_SIGNATURE, algorithm::BASE64],
    );
    println!();
    println!("Key formats:");
    println!("  PEM, DER (RSA, EC P-256/P-384; PKCS#8, PKCS#1, SEC1, SPKI), raw binary (HMAC)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn print_section(title: &str, uris: &[&str]) {
    println!();
    println!("{title}:");
    for uri in uris {
        println!("  {uri}");
    }
}

fn context(mgr: KeysManager, id_attr: &[String]) -> DsigContext {
    let mut ctx = DsigContext::new(mgr);
    ctx.debug = tracing::enabled!(tracing::Level::TRACE);
    for attr in id_attr {
        ctx.add_id_attr(attr);
    }
    ctx
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data)
                .map_err(|e| Error::Other(format!("{}: {e}", p.display())))
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
