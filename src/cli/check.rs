//! Check command - validate a chain file without running it

use crate::cli::style::{Stylize, check, cross};
use anstream::println;
use merge_chain::chain::MergeChain;
use merge_chain::error::{Error, Result};
use merge_chain::sheet::ChainSheet;
use std::path::Path;

/// Run the check command
pub fn run_check(sheet_path: &Path) -> Result<()> {
    let sheet = ChainSheet::load(sheet_path)?;
    let mut chain = MergeChain::new();
    let rejected = sheet.populate(&mut chain);

    println!(
        "{} {}",
        "Chain".emphasis(),
        sheet_path.display().to_string().accent()
    );
    for (position, recipe) in chain.recipes() {
        println!("  {} #{position} {recipe}", check());
    }
    for position in &rejected {
        println!(
            "  {} #{position} {}",
            cross(),
            "missing inputs, invalid position or unknown method".muted()
        );
    }

    if chain.is_empty() {
        return Err(Error::Sheet("no runnable recipes".to_string()));
    }
    println!();
    println!(
        "{} runnable, {} rejected",
        chain.len().accent(),
        rejected.len().accent()
    );
    Ok(())
}
