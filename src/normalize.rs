use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::notebook::{Notebook, OutputKind};

/// Placeholder written in place of a memory address.
pub const MEMORY_ADDRESS_TOKEN: &str = "mem_addr";

// `.` stops at newlines, so the match ends at the last `>` of the line.
static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"at .+>").expect("address pattern is a valid regex"));

/// Mask memory-address-like substrings such as `<Foo object at 0x7f3a2c>`.
///
/// The text is split on `<`; in each fragment after the first, the span
/// between `at ` and the closing `>` is replaced by [`MEMORY_ADDRESS_TOKEN`].
/// Text before the first `<` is never touched.
pub fn strip_memory_address(text: &str) -> String {
    let mut parts = text.split('<');
    let mut out = String::with_capacity(text.len());
    out.push_str(parts.next().unwrap_or_default());

    for part in parts {
        out.push('<');
        match ADDRESS_PATTERN.find(part) {
            Some(m) => {
                out.push_str(&part[..m.start() + 3]);
                out.push_str(MEMORY_ADDRESS_TOKEN);
                out.push_str(&part[m.end() - 1..]);
            }
            None => out.push_str(part),
        }
    }
    out
}

fn strip_in_place(value: &mut Value) {
    if let Value::String(s) = value {
        *s = strip_memory_address(s);
    }
}

/// Mask memory addresses in the `text/plain` payload of execute results and
/// in the text of stream outputs of every code cell.
pub fn strip_memory_addresses(notebook: &mut Notebook) {
    notebook.code_outputs_mut(&OutputKind::ExecuteResult, |output| {
        if let Some(text) = output
            .get_mut("data")
            .and_then(|d| d.get_mut("text/plain"))
        {
            strip_in_place(text);
        }
    });

    notebook.code_outputs_mut(&OutputKind::Stream, |output| {
        if let Some(text) = output.get_mut("text") {
            strip_in_place(text);
        }
    });
}
