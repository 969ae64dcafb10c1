//! Link and code-discovery counters

use std::fmt::Write as _;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

const MIB: f64 = (1u64 << 20) as f64;

/// Counters reported by a linked object, summed across objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Code bytes over all formats
    pub total_code_bytes: u64,

    /// Code bytes in version 2 objects
    pub v2_code_bytes: u64,
    /// Link table bytes in version 2 objects
    pub v2_link_bytes: u64,
    /// Pointer links in version 2 objects
    pub v2_pointers: u64,
    /// Seek entries between version 2 pointer links
    pub v2_pointer_seeks: u64,
    /// Symbols referenced by version 2 objects
    pub v2_symbols: u64,
    /// Symbol links in version 2 objects
    pub v2_symbol_links: u64,

    /// Code bytes in version 3 objects
    pub v3_code_bytes: u64,
    /// Link table bytes in version 3 objects
    pub v3_link_bytes: u64,
    /// Pointer links in version 3 objects
    pub v3_pointers: u64,
    /// Pointers split across two instructions
    pub v3_split_pointers: u64,
    /// Pointers stored as a whole word
    pub v3_word_pointers: u64,
    /// Seek entries between version 3 pointer links
    pub v3_pointer_seeks: u64,
    /// Symbols referenced by version 3 objects
    pub v3_symbols: u64,
    /// Symbol links patched as a symbol table offset
    pub v3_symbol_links_offset: u64,
    /// Symbol links patched as a full word
    pub v3_symbol_links_word: u64,

    /// Bytes classified as code
    pub code_bytes: u64,
    /// Bytes classified as data
    pub data_bytes: u64,
    /// Functions found
    pub function_count: u64,
    /// Instructions decoded
    pub decoded_ops: u64,
    /// Instructions using `fp` as a base register
    pub fp_reg_uses: u64,
    /// `fp` uses resolved to a label
    pub fp_reg_uses_resolved: u64,
}

impl LinkStats {
    /// Instruction words in discovered code
    pub const fn expected_ops(&self) -> u64 {
        self.code_bytes / 4
    }

    /// True when fewer instructions decoded than the code holds
    pub const fn is_decode_incomplete(&self) -> bool {
        self.expected_ops() > self.decoded_ops
    }

    /// Percentage of code words that decoded
    pub fn decode_percent(&self) -> f64 {
        percent(self.decoded_ops, self.expected_ops())
    }

    /// Percentage of frame-pointer uses that were resolved
    pub fn fp_resolved_percent(&self) -> f64 {
        percent(self.fp_reg_uses_resolved, self.fp_reg_uses)
    }

    /// Summary of the link counters, one item per line
    pub fn render_link(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "code {} bytes", self.total_code_bytes);
        let _ = writeln!(out, "v2 code {} bytes", self.v2_code_bytes);
        let _ = writeln!(out, "v2 link data {} bytes", self.v2_link_bytes);
        let _ = writeln!(out, "v2 pointers {}", self.v2_pointers);
        let _ = writeln!(out, "v2 pointer seeks {}", self.v2_pointer_seeks);
        let _ = writeln!(out, "v2 symbols {}", self.v2_symbols);
        let _ = writeln!(out, "v2 symbol links {}", self.v2_symbol_links);
        let _ = writeln!(out, "v3 code {} bytes", self.v3_code_bytes);
        let _ = writeln!(out, "v3 link data {} bytes", self.v3_link_bytes);
        let _ = writeln!(out, "v3 pointers {}", self.v3_pointers);
        let _ = writeln!(out, "  split {}", self.v3_split_pointers);
        let _ = writeln!(out, "  word  {}", self.v3_word_pointers);
        let _ = writeln!(out, "v3 pointer seeks {}", self.v3_pointer_seeks);
        let _ = writeln!(out, "v3 symbols {}", self.v3_symbols);
        let _ = writeln!(out, "v3 offset symbol links {}", self.v3_symbol_links_offset);
        let _ = writeln!(out, "v3 word symbol links {}", self.v3_symbol_links_word);
        out
    }

    /// Summary of the code discovery counters, one item per line
    pub fn render_code(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "code {:.3} MB", self.code_bytes as f64 / MIB);
        let _ = writeln!(out, "data {:.3} MB", self.data_bytes as f64 / MIB);
        let _ = writeln!(out, "functions: {}", self.function_count);
        let _ = writeln!(
            out,
            "fp uses resolved: {} / {} ({:.3} %)",
            self.fp_reg_uses_resolved,
            self.fp_reg_uses,
            self.fp_resolved_percent()
        );
        let _ = writeln!(
            out,
            "decoded {} / {} ({:.3} %)",
            self.decoded_ops,
            self.expected_ops(),
            self.decode_percent()
        );
        out
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 100.0;
    }
    100.0 * part as f64 / whole as f64
}

impl AddAssign for LinkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.total_code_bytes += rhs.total_code_bytes;
        self.v2_code_bytes += rhs.v2_code_bytes;
        self.v2_link_bytes += rhs.v2_link_bytes;
        self.v2_pointers += rhs.v2_pointers;
        self.v2_pointer_seeks += rhs.v2_pointer_seeks;
        self.v2_symbols += rhs.v2_symbols;
        self.v2_symbol_links += rhs.v2_symbol_links;
        self.v3_code_bytes += rhs.v3_code_bytes;
        self.v3_link_bytes += rhs.v3_link_bytes;
        self.v3_pointers += rhs.v3_pointers;
        self.v3_split_pointers += rhs.v3_split_pointers;
        self.v3_word_pointers += rhs.v3_word_pointers;
        self.v3_pointer_seeks += rhs.v3_pointer_seeks;
        self.v3_symbols += rhs.v3_symbols;
        self.v3_symbol_links_offset += rhs.v3_symbol_links_offset;
        self.v3_symbol_links_word += rhs.v3_symbol_links_word;
        self.code_bytes += rhs.code_bytes;
        self.data_bytes += rhs.data_bytes;
        self.function_count += rhs.function_count;
        self.decoded_ops += rhs.decoded_ops;
        self.fp_reg_uses += rhs.fp_reg_uses;
        self.fp_reg_uses_resolved += rhs.fp_reg_uses_resolved;
    }
}

impl Add for LinkStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for LinkStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
