/// Inspect command: show how an envelope parses, without any key.
use base64::Engine;
use comfy_table::{Cell, Color, Table};
use owo_colors::{OwoColorize, Stream::Stdout};

use capsule_seal::envelope::{self, IV_LEN, TAG_LEN};

use crate::cli::InspectArgs;

fn component_row(name: &str, encoded: &str, expected: Option<usize>) -> Vec<Cell> {
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded);
    let (bytes, status) = match (&decoded, expected) {
        (Err(_), _) => ("-".to_string(), Cell::new("invalid base64").fg(Color::Red)),
        (Ok(b), Some(n)) if b.len() != n => (
            b.len().to_string(),
            Cell::new(format!("expected {} bytes", n)).fg(Color::Red),
        ),
        (Ok(b), None) if b.is_empty() => ("0".to_string(), Cell::new("empty").fg(Color::Red)),
        (Ok(b), _) => (b.len().to_string(), Cell::new("ok").fg(Color::Green)),
    };
    vec![
        Cell::new(name),
        Cell::new(encoded.len()),
        Cell::new(bytes),
        status,
    ]
}

pub fn run_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let parts = match envelope::parse(&args.envelope) {
        Ok(p) => p,
        Err(e) => {
            println!(
                "{} {}",
                "Not an envelope:".if_supports_color(Stdout, |t| t.yellow()),
                e
            );
            return Ok(());
        }
    };

    let mut table = Table::new();
    table.set_header(vec!["Component", "Encoded len", "Bytes", "Status"]);
    table.add_row(component_row("IV", parts.iv, Some(IV_LEN)));
    table.add_row(component_row("Auth tag", parts.tag, Some(TAG_LEN)));
    table.add_row(component_row("Ciphertext", parts.ciphertext, None));

    println!("Format: {}", parts.format.as_str().if_supports_color(Stdout, |t| t.cyan()));
    println!("{table}");

    match parts.decode() {
        Ok(_) => println!("{}", "Structurally valid.".if_supports_color(Stdout, |t| t.green())),
        Err(e) => println!("{} {}", "Invalid:".if_supports_color(Stdout, |t| t.red()), e),
    }
    Ok(())
}
