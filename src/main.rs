//! Shuttlebus CLI — operator tooling for the push notification core.
//!
//! Mirrors the deployment workflow: generate a VAPID keypair once, install
//! it in the environment, verify the setup, and fire a test notification
//! at a real subscription.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shuttlebus::{Config, NotificationPayload, PushSubscription, VapidKeys, VapidSigner, WebPushClient};

#[derive(Parser)]
#[command(name = "shuttlebus", version, about = "Campus shuttle push notification tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh VAPID keypair and print the env lines to install it.
    GenerateKeys,
    /// Check that push delivery is configured and the key material loads.
    CheckSetup,
    /// Send a test notification to a single push subscription.
    SendTest {
        /// Push relay endpoint URL from the subscription.
        #[arg(long)]
        endpoint: String,
        /// Subscription `p256dh` public key (base64url).
        #[arg(long)]
        p256dh: String,
        /// Subscription `auth` secret (base64url).
        #[arg(long)]
        auth: String,
        /// Notification title.
        #[arg(long, default_value = "Shuttlebus test")]
        title: String,
        /// Notification body.
        #[arg(long, default_value = "Push delivery is working")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::GenerateKeys => generate_keys(),
        Command::CheckSetup => {
            check_setup();
            Ok(())
        }
        Command::SendTest {
            endpoint,
            p256dh,
            auth,
            title,
            body,
        } => send_test(endpoint, p256dh, auth, &title, &body).await,
    }
}

fn generate_keys() -> Result<()> {
    let keys = VapidKeys::generate()?;

    println!("{}", "=".repeat(78));
    println!("VAPID keypair generated");
    println!("{}", "=".repeat(78));
    println!();
    println!("Add to the backend environment:");
    println!();
    println!("VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
    println!("VAPID_PRIVATE_KEY_PEM='{}'", keys.private_key_pem().trim_end());
    println!();
    println!("Add to the frontend environment:");
    println!();
    println!("VITE_VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
    Ok(())
}

fn check_setup() {
    let config = Config::from_env();

    println!("{}", "=".repeat(78));
    println!("Push delivery setup");
    println!("{}", "=".repeat(78));

    match &config.vapid_public_key {
        Some(key) => println!("VAPID_PUBLIC_KEY: set ({} chars)", key.len()),
        None => println!("VAPID_PUBLIC_KEY: NOT SET (run `shuttlebus generate-keys`)"),
    }

    match &config.vapid_private_key_pem {
        Some(pem) if pem.contains("BEGIN") => {
            println!("VAPID_PRIVATE_KEY_PEM: set ({} chars, PEM)", pem.len());
        }
        Some(pem) => println!(
            "VAPID_PRIVATE_KEY_PEM: set ({} chars) but does not look like PEM",
            pem.len()
        ),
        None => println!("VAPID_PRIVATE_KEY_PEM: NOT SET"),
    }

    println!("VAPID_SUBJECT: {}", config.vapid_subject);

    let signer = VapidSigner::from_config(&config);
    if signer.is_available() {
        println!();
        println!("Push delivery: ENABLED");
    } else {
        println!();
        println!("Push delivery: DISABLED (key material missing or unparseable)");
    }
    println!("{}", "=".repeat(78));
}

async fn send_test(
    endpoint: String,
    p256dh: String,
    auth: String,
    title: &str,
    body: &str,
) -> Result<()> {
    let config = Config::from_env();
    let signer = VapidSigner::from_config(&config);
    anyhow::ensure!(
        signer.is_available(),
        "VAPID private key not configured; run `shuttlebus generate-keys` and install the env lines"
    );

    let client = WebPushClient::new(signer, config.push_ttl);
    let subscription = PushSubscription::new(endpoint, p256dh, auth);
    let payload = NotificationPayload::new(title, body, None);

    client.send_one(&subscription, &payload).await?;
    println!("Test notification accepted by the push relay.");
    Ok(())
}
