use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lockzip::cli::{Cli, Command};
use lockzip::engine::session::{DecryptRequest, EncryptRequest};
use lockzip::{Engine, ProgressSink, SessionOutcome};
use secrecy::SecretString;
use std::sync::Arc;

/// Forwards engine progress ticks into an indicatif bar.
struct BarSink(ProgressBar);

impl ProgressSink for BarSink {
    fn update(&self, percent: u8) {
        self.0.set_position(u64::from(percent));
    }
}

fn progress_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(label.to_string());
    bar
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let engine = Arc::new(Engine::new());

    // Ctrl+C requests cooperative cancellation; the session cleans up its
    // partial output before resolving.
    {
        let engine = Arc::clone(&engine);
        ctrlc::set_handler(move || engine.cancel()).context("install Ctrl+C handler")?;
    }

    match cli.command {
        Command::Encrypt {
            inputs,
            output,
            method,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => {
                    let generated = engine.generate_password();
                    println!("Generated password: {}", generated);
                    generated
                }
            };
            let bar = progress_bar("Encrypting");
            let handle = engine.start_encrypt(
                EncryptRequest {
                    inputs: engine.inspect_paths(&inputs),
                    password: SecretString::new(password),
                    method,
                    output_path: output.clone(),
                },
                Arc::new(BarSink(bar.clone())),
            )?;
            match handle.wait()? {
                SessionOutcome::Completed => {
                    bar.finish();
                    println!("Encrypted to {}", output.display());
                }
                SessionOutcome::Cancelled => {
                    bar.abandon();
                    println!("Cancelled; no archive was written");
                }
            }
        }
        Command::Decrypt {
            archive,
            output_dir,
            password,
        } => {
            let bar = progress_bar("Decrypting");
            let handle = engine.start_decrypt(
                DecryptRequest {
                    archive_path: archive,
                    password: SecretString::new(password),
                    output_dir: output_dir.clone(),
                },
                Arc::new(BarSink(bar.clone())),
            )?;
            match handle.wait()? {
                SessionOutcome::Completed => {
                    bar.finish();
                    println!("Decrypted into {}", output_dir.display());
                }
                SessionOutcome::Cancelled => {
                    bar.abandon();
                    println!("Cancelled; no files were written");
                }
            }
        }
        Command::Inspect { paths } => {
            for entry in engine.inspect_paths(&paths) {
                let kind = if entry.is_dir { "dir " } else { "file" };
                println!("{} {}", kind, entry.path.display());
            }
        }
        Command::Genpass => println!("{}", engine.generate_password()),
    }

    Ok(())
}
