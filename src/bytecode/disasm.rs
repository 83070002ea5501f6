use crate::bytecode::{CompiledStream, Op};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Print disassembly of a compiled stream
pub fn print_bc(stream: &CompiledStream) {
    print!("{}", disassemble(stream));
}

/// Render a listing of `stream`: index, source line, and the op in surface
/// syntax. Jump targets get a banner naming the label(s) that land there.
pub fn disassemble(stream: &CompiledStream) -> String {
    let mut out = String::new();
    let targets = collect_jump_targets(stream.ops());

    // writing into a String cannot fail
    let _ = writeln!(out, "=== MICROSCRIPT STREAM ===");
    let _ = writeln!(out, " {} instructions", stream.len());
    let _ = writeln!(out, "════════════════════════════════════════");

    for (ip, op) in stream.ops().iter().enumerate() {
        if let Some(labels) = targets.get(&ip) {
            let _ = writeln!(out, "      ┌─ {}:", labels.join(", "));
        }

        let marker = if targets.contains_key(&ip) { "►" } else { " " };
        let line = stream.line_of(ip).unwrap_or_default();
        let _ = writeln!(out, "{:04} {} L{:<4} {}", ip, marker, line, op);
    }

    // Labels declared after the last instruction point one past the end.
    if let Some(labels) = targets.get(&stream.len()) {
        let _ = writeln!(out, "      └─ {}: (end)", labels.join(", "));
    }

    out
}

/// Map of instruction index to the distinct labels that jump there.
fn collect_jump_targets(ops: &[Op]) -> BTreeMap<usize, Vec<&str>> {
    let mut targets: BTreeMap<usize, Vec<&str>> = BTreeMap::new();

    for op in ops {
        let Some(target) = op.jump_target() else {
            continue;
        };
        let Some(position) = target.position else {
            continue;
        };
        let labels = targets.entry(position).or_default();
        if !labels.contains(&target.label.as_str()) {
            labels.push(&target.label);
        }
    }

    targets
}
