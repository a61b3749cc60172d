//! Small debug helpers (teacher: `util.rs`).

use std::fmt::Write as _;

/// Formats `slice` as a classic hex+ASCII dump, one 16-byte row per line.
/// Used to log the offending bytes behind an `Event::MalformedMessage`
/// (spec.md §7) at `log::debug!` level without pulling in a dedicated
/// hexdump crate.
pub fn hexdump(slice: &[u8]) -> String {
    const WIDTH: usize = 16;
    let mut out = String::new();

    for (row_index, row) in slice.chunks(WIDTH).enumerate() {
        let mut row_hex = String::new();
        for byte in row {
            let _ = write!(row_hex, "{:02x} ", byte);
        }

        let row_str: String = row
            .iter()
            .map(|b| if b.is_ascii_graphic() { *b as char } else { '.' })
            .collect();

        let _ = writeln!(out, "{:08x}: {:<48}{}", row_index * WIDTH, row_hex, row_str);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexdump_renders_printable_bytes() {
        let dump = hexdump(b"hello");
        assert!(dump.contains("hello"));
        assert!(dump.contains("68 65 6c 6c 6f"));
    }
}
