//! `keel demangle`.

use anyhow::Result;

pub fn run(symbols: &[String]) -> Result<()> {
    for symbol in symbols {
        println!("{}", demangle_line(symbol));
    }
    Ok(())
}

/// The readable form of `symbol`, or `symbol` itself if it does not decode.
fn demangle_line(symbol: &str) -> String {
    match keel_mangle::demangle(symbol) {
        Some(demangled) => demangled.to_string(),
        None => symbol.to_string(),
    }
}
