//! Display framework for CLI output formatting.
//!
//! Shared report layouts, tables, and the human/JSON output switch used by
//! every command.

pub mod format;
pub mod progress;
pub mod table;

use serde::Serialize;

pub use format::*;
pub use progress::*;
pub use table::*;

/// Trait for types that can be rendered as human-readable or JSON output.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Dispatch output based on JSON mode flag.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        let human = result.to_human();
        if !human.is_empty() {
            println!("{human}");
        }
    }
}
