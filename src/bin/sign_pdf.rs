//! Sign a PDF with an RSA key and X.509 certificate.
//!
//! Usage:
//!   cargo run --release --features signatures --bin sign_pdf -- \
//!       input.pdf output.pdf --cert cert.der --key key.der
//!
//! Options:
//!   --cert <file>       DER certificate (required)
//!   --key <file>        DER private key, PKCS#8 or PKCS#1 (required)
//!   --options <file>    JSON signing options
//!   --reason <text>     Reason for signing
//!   --location <text>   Signing location
//!   --overwrite         Replace an existing signature field
//!
//! Set RUST_LOG=debug to see layout decisions.

use pdf_seal::signatures::{PdfSigner, Pkcs7Signer, SignOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

struct SignConfig {
    input: PathBuf,
    output: PathBuf,
    cert: PathBuf,
    key: PathBuf,
    options_file: Option<PathBuf>,
    reason: Option<String>,
    location: Option<String>,
    overwrite: bool,
}

impl SignConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut positional = Vec::new();
        let mut cert = None;
        let mut key = None;
        let mut options_file = None;
        let mut reason = None;
        let mut location = None;
        let mut overwrite = false;

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || {
                i += 1;
                args.get(i).cloned().ok_or_else(|| format!("{} needs a value", flag))
            };
            match flag {
                "--cert" => cert = Some(PathBuf::from(value()?)),
                "--key" => key = Some(PathBuf::from(value()?)),
                "--options" => options_file = Some(PathBuf::from(value()?)),
                "--reason" => reason = Some(value()?),
                "--location" => location = Some(value()?),
                "--overwrite" => overwrite = true,
                "--help" | "-h" => return Err(String::new()),
                other if other.starts_with("--") => return Err(format!("unknown option {}", other)),
                other => positional.push(PathBuf::from(other)),
            }
            i += 1;
        }

        let [input, output] = <[PathBuf; 2]>::try_from(positional)
            .map_err(|p| format!("expected <input> <output>, got {} paths", p.len()))?;
        Ok(Self {
            input,
            output,
            cert: cert.ok_or("--cert is required")?,
            key: key.ok_or("--key is required")?,
            options_file,
            reason,
            location,
            overwrite,
        })
    }

    fn sign_options(&self) -> Result<SignOptions, String> {
        let mut options = match &self.options_file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
                SignOptions::from_json(&json).map_err(|e| format!("{}: {}", path.display(), e))?
            },
            None => SignOptions::default(),
        };
        if let Some(reason) = &self.reason {
            options = options.with_reason(reason.clone());
        }
        if let Some(location) = &self.location {
            options = options.with_location(location.clone());
        }
        if self.overwrite {
            options = options.overwrite_existing_field(true);
        }
        Ok(options)
    }
}

fn usage() {
    eprintln!(
        "Usage: sign_pdf <input> <output> --cert <der> --key <der> \
         [--options <json>] [--reason <text>] [--location <text>] [--overwrite]"
    );
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match SignConfig::from_args() {
        Ok(config) => config,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("Error: {}", msg);
            }
            usage();
            return ExitCode::from(2);
        },
    };

    let options = match config.sign_options() {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("Error: invalid options {}", msg);
            return ExitCode::from(2);
        },
    };

    let signer = match Pkcs7Signer::from_files(&config.cert, &config.key) {
        Ok(signer) => signer,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let start = Instant::now();
    match PdfSigner::new(options).sign_file(&config.input, &config.output, &signer) {
        Ok(()) => {
            println!(
                "Signed {} -> {} in {:.1}ms",
                config.input.display(),
                config.output.display(),
                start.elapsed().as_secs_f64() * 1000.0
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error ({:?}): {}", e.kind(), e);
            ExitCode::FAILURE
        },
    }
}
