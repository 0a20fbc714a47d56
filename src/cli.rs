use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "capsule-seal",
    version,
    about = "Seal capsule content at rest and issue signed media links"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt text into an envelope using the configured key
    Encrypt(EncryptArgs),
    /// Decrypt an envelope (current or legacy format)
    Decrypt(DecryptArgs),
    /// Show the structure of an envelope without decrypting it
    Inspect(InspectArgs),
    /// Issue or verify media access tokens
    #[command(subcommand)]
    Token(TokenCommand),
    /// Generate a random secret suitable for CAPSULE_ENCRYPT_KEY or MEDIA_TOKEN_SECRET
    Keygen(KeygenArgs),
    /// Show the effective configuration (fingerprints only, never secrets)
    Config,
}

#[derive(Parser)]
pub struct EncryptArgs {
    /// Text to encrypt (reads stdin if omitted)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Treat the input as JSON and seal its serialized form
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DecryptArgs {
    /// Envelope string: iv.tag.ciphertext or iv:tag:ciphertext
    #[arg(value_name = "ENVELOPE")]
    pub envelope: String,

    /// Parse the plaintext as JSON and pretty-print it
    #[arg(long)]
    pub json: bool,

    /// Prompt for the key instead of reading configuration
    #[arg(long)]
    pub prompt_key: bool,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Envelope string to inspect
    #[arg(value_name = "ENVELOPE")]
    pub envelope: String,
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Issue a signed media link for a capsule
    Issue(TokenIssueArgs),
    /// Check a token against a capsule id and media kind
    Verify(TokenVerifyArgs),
}

#[derive(Parser)]
pub struct TokenIssueArgs {
    /// Capsule id the link grants access to
    #[arg(value_name = "ID")]
    pub id: String,

    /// Media kind: photo, video or audio
    #[arg(value_name = "KIND")]
    pub kind: String,

    /// Time-to-live in seconds (defaults to the configured TTL)
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Render the media URL as a QR code in the terminal
    #[arg(long)]
    pub qr: bool,

    /// Copy the media URL to the clipboard
    #[arg(long)]
    pub copy: bool,
}

#[derive(Parser)]
pub struct TokenVerifyArgs {
    #[arg(value_name = "TOKEN")]
    pub token: String,

    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "KIND")]
    pub kind: String,
}

#[derive(Parser)]
pub struct KeygenArgs {
    /// Number of random bytes (hex-encoded on output)
    #[arg(long, default_value = "32")]
    pub bytes: usize,
}
