//! Minimal stdin prompting for interactive commands.
//!
//! A closed stdin (piped/non-interactive invocation) is an error, never
//! a re-prompt, so commands exit non-zero instead of spinning.

use std::io::{self, BufRead, Write};

/// Ask for a required value; re-asks on empty input.
pub fn required(label: &str) -> anyhow::Result<String> {
    loop {
        let answer = ask(label)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        eprintln!("A value is required.");
    }
}

/// Ask for an optional value; empty input means None.
pub fn optional(label: &str) -> anyhow::Result<Option<String>> {
    let answer = ask(label)?;
    Ok((!answer.is_empty()).then_some(answer))
}

/// Ask a yes/no question. Only an explicit "y"/"yes" counts as yes.
pub fn confirm(label: &str) -> anyhow::Result<bool> {
    let answer = ask(&format!("{label} [y/N]"))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn ask(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    read_answer(&mut io::stdin().lock())
}

/// Read one trimmed line. Zero bytes read means the input is closed.
fn read_answer(reader: &mut impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        anyhow::bail!("input closed before a value was entered");
    }
    Ok(line.trim().to_string())
}
