//! Length-limited canonical Huffman codes.
//!
//! The encoder derives one DC and one AC table per image from symbol
//! frequencies: package-merge bounds the code lengths, canonical
//! assignment turns the lengths into codewords, and the all-ones
//! codeword is displaced one level deeper so no code can alias the
//! 0xFF marker prefix inside the scan.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::bitstream::Bitstream;
use crate::error::EncodeError;

/// JPEG baseline limit for Huffman code lengths.
pub const MAX_CODE_LENGTH: usize = 16;

/// One codeword; bits are right-aligned in `value`, MSB-first at
/// width `length`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

impl HuffmanCode {
    fn is_all_ones(self) -> bool {
        self.length > 0 && u32::from(self.value) == (1u32 << self.length) - 1
    }
}

// ---------------------------------------------------------------------------
// Huffman tree (arena-backed)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Node {
    weight: u64,
    symbol: Option<u8>,
    left: Option<u32>,
    right: Option<u32>,
}

/// Classic bottom-up Huffman tree over a `Vec` arena with `u32` node
/// ids. Only the per-symbol depths survive; code assignment is always
/// canonical.
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<u32>,
}

impl HuffmanTree {
    pub fn from_frequencies(freqs: &[u32; 256]) -> Self {
        let mut nodes = Vec::new();
        let mut heap: BinaryHeap<Reverse<(u64, u32)>> = BinaryHeap::new();
        for (symbol, &freq) in freqs.iter().enumerate() {
            if freq > 0 {
                let id = nodes.len() as u32;
                nodes.push(Node {
                    weight: freq as u64,
                    symbol: Some(symbol as u8),
                    left: None,
                    right: None,
                });
                heap.push(Reverse((freq as u64, id)));
            }
        }

        while heap.len() > 1 {
            let Reverse((wa, a)) = heap.pop().unwrap();
            let Reverse((wb, b)) = heap.pop().unwrap();
            let id = nodes.len() as u32;
            nodes.push(Node {
                weight: wa + wb,
                symbol: None,
                left: Some(a),
                right: Some(b),
            });
            heap.push(Reverse((wa + wb, id)));
        }

        let root = heap.pop().map(|Reverse((_, id))| id);
        Self { nodes, root }
    }

    /// Longest root-to-leaf path; 0 for a single-leaf tree.
    pub fn height(&self) -> usize {
        self.depths().into_iter().map(|(_, d)| d).max().unwrap_or(0)
    }

    /// `(symbol, depth)` for every leaf.
    pub fn depths(&self) -> Vec<(u8, usize)> {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.nodes[id as usize];
            if let Some(symbol) = node.symbol {
                out.push((symbol, depth));
            }
            if let Some(left) = node.left {
                stack.push((left, depth + 1));
            }
            if let Some(right) = node.right {
                stack.push((right, depth + 1));
            }
        }
        out
    }

    pub fn total_weight(&self) -> u64 {
        self.root
            .map(|id| self.nodes[id as usize].weight)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Package-merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Package {
    weight: u64,
    symbols: Vec<u8>,
}

impl Package {
    fn merged(a: &Package, b: &Package) -> Package {
        let mut symbols = Vec::with_capacity(a.symbols.len() + b.symbols.len());
        symbols.extend_from_slice(&a.symbols);
        symbols.extend_from_slice(&b.symbols);
        symbols.sort_unstable();
        Package {
            weight: a.weight + b.weight,
            symbols,
        }
    }
}

fn sort_packages(packages: &mut [Package]) {
    packages.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.symbols.cmp(&b.symbols)));
}

/// Computes length-limited code lengths by package-merge.
///
/// Returns symbol lists grouped by code length (`result[len]`, index
/// 0 unused, each list in ascending symbol order). Fails when more
/// than `2^limit` symbols are present.
pub fn package_merge(
    symbols: &[(u8, u64)],
    limit: usize,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let n = symbols.len();
    if n == 0 {
        return Ok(vec![Vec::new(); limit + 1]);
    }
    if limit < 64 && n as u64 > 1u64 << limit {
        return Err(EncodeError::CodeLengthExceeded { symbols: n });
    }
    if n == 1 {
        let mut buckets = vec![Vec::new(); limit + 1];
        buckets[1].push(symbols[0].0);
        return Ok(buckets);
    }

    let mut singles: Vec<Package> = symbols
        .iter()
        .map(|&(symbol, weight)| Package {
            weight,
            symbols: vec![symbol],
        })
        .collect();
    sort_packages(&mut singles);

    // level for depth `limit`, then repeatedly package the two
    // lightest and merge the singles back in for the next level up
    let mut level = singles.clone();
    for _ in 1..limit {
        let mut next: Vec<Package> = level
            .chunks_exact(2)
            .map(|pair| Package::merged(&pair[0], &pair[1]))
            .collect();
        next.extend(singles.iter().cloned());
        sort_packages(&mut next);
        level = next;
    }

    // each occurrence of a symbol in the 2(n-1) lightest packages
    // adds one to its code length
    let mut lengths = [0usize; 256];
    for package in level.iter().take(2 * (n - 1)) {
        for &symbol in &package.symbols {
            lengths[symbol as usize] += 1;
        }
    }

    let mut buckets = vec![Vec::new(); limit + 1];
    for &(symbol, _) in symbols {
        let len = lengths[symbol as usize];
        debug_assert!((1..=limit).contains(&len));
        buckets[len].push(symbol);
    }
    for bucket in &mut buckets {
        bucket.sort_unstable();
    }
    Ok(buckets)
}

// ---------------------------------------------------------------------------
// Canonical code assignment
// ---------------------------------------------------------------------------

fn assign_codes(buckets: &[Vec<u8>]) -> [HuffmanCode; 256] {
    let mut codes = [HuffmanCode::default(); 256];
    let mut code = 0u32;
    for (length, bucket) in buckets.iter().enumerate().skip(1) {
        for &symbol in bucket {
            codes[symbol as usize] = HuffmanCode {
                value: code as u16,
                length: length as u8,
            };
            code += 1;
        }
        code <<= 1;
    }
    codes
}

/// Moves the deepest bucket's last symbol one level deeper when its
/// canonical code would be all ones.
fn displace_all_ones(buckets: &mut Vec<Vec<u8>>) {
    let codes = assign_codes(buckets);
    let Some(deepest) = (0..buckets.len()).rev().find(|&l| !buckets[l].is_empty()) else {
        return;
    };
    let &last = buckets[deepest].last().unwrap();
    if codes[last as usize].is_all_ones() {
        buckets[deepest].pop();
        if deepest + 1 >= buckets.len() {
            buckets.push(Vec::new());
        }
        buckets[deepest + 1].push(last);
    }
}

/// An encoding table: canonical codes per symbol plus the data the
/// DHT segment serializes.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    codes: [HuffmanCode; 256],
    counts: [u8; MAX_CODE_LENGTH],
    symbols: Vec<u8>,
}

impl HuffmanTable {
    /// Builds the table from symbol frequencies via package-merge.
    /// Lengths are limited to 15 so the all-ones displacement lands
    /// at 16 at worst.
    pub fn from_frequencies(freqs: &[u32; 256]) -> Result<Self, EncodeError> {
        let symbols: Vec<(u8, u64)> = freqs
            .iter()
            .enumerate()
            .filter(|(_, &f)| f > 0)
            .map(|(s, &f)| (s as u8, f as u64))
            .collect();
        let mut buckets = package_merge(&symbols, MAX_CODE_LENGTH - 1)?;
        Self::from_length_buckets(&mut buckets)
    }

    /// Builds the table from a plain Huffman tree instead of
    /// package-merge. Fails when the tree is deeper than the
    /// baseline limit allows.
    pub fn from_tree(freqs: &[u32; 256]) -> Result<Self, EncodeError> {
        let tree = HuffmanTree::from_frequencies(freqs);
        let depths = tree.depths();
        let max_depth = depths.iter().map(|&(_, d)| d).max().unwrap_or(0);
        let mut buckets = vec![Vec::new(); max_depth.max(1) + 1];
        for (symbol, depth) in depths {
            buckets[depth.max(1)].push(symbol);
        }
        for bucket in &mut buckets {
            bucket.sort_unstable();
        }
        Self::from_length_buckets(&mut buckets)
    }

    fn from_length_buckets(buckets: &mut Vec<Vec<u8>>) -> Result<Self, EncodeError> {
        displace_all_ones(buckets);

        let total: usize = buckets.iter().map(Vec::len).sum();
        let deepest = (0..buckets.len())
            .rev()
            .find(|&l| !buckets[l].is_empty())
            .unwrap_or(0);
        if deepest > MAX_CODE_LENGTH || total > 256 {
            return Err(EncodeError::CodeLengthExceeded { symbols: total });
        }

        let codes = assign_codes(buckets);
        let mut counts = [0u8; MAX_CODE_LENGTH];
        let mut symbols = Vec::with_capacity(total);
        for (length, bucket) in buckets.iter().enumerate().skip(1) {
            if bucket.is_empty() {
                continue;
            }
            counts[length - 1] = bucket.len() as u8;
            symbols.extend_from_slice(bucket);
        }
        debug!(
            "huffman table: {} symbols, deepest code {} bits",
            total, deepest
        );
        Ok(Self {
            codes,
            counts,
            symbols,
        })
    }

    pub fn code(&self, symbol: u8) -> HuffmanCode {
        let code = self.codes[symbol as usize];
        debug_assert!(code.length > 0, "symbol {symbol:#04x} has no code");
        code
    }

    pub fn has_code(&self, symbol: u8) -> bool {
        self.codes[symbol as usize].length > 0
    }

    /// Count of symbols per code length 1..=16, as serialized in DHT.
    pub fn dht_counts(&self) -> &[u8; MAX_CODE_LENGTH] {
        &self.counts
    }

    /// Symbols in ascending (code length, symbol) order.
    pub fn dht_symbols(&self) -> &[u8] {
        &self.symbols
    }
}

/// Encodes a symbol sequence with the table's codewords.
pub fn encode(text: &[u8], table: &HuffmanTable) -> Bitstream {
    let mut bs = Bitstream::new();
    for &symbol in text {
        let code = table.code(symbol);
        bs.push_bits(code.value as u64, code.length as u32);
    }
    bs
}

/// Decodes a bitstream produced by [`encode`]. Prefix-freeness makes
/// the greedy bit-by-bit match unambiguous.
pub fn decode(bs: &Bitstream, table: &HuffmanTable) -> Vec<u8> {
    let mut reverse: HashMap<(u16, u8), u8> = HashMap::new();
    for symbol in 0..=255u8 {
        if table.has_code(symbol) {
            let code = table.code(symbol);
            reverse.insert((code.value, code.length), symbol);
        }
    }

    let mut out = Vec::new();
    let mut value = 0u16;
    let mut length = 0u8;
    for pos in 0..bs.len() {
        value = (value << 1) | bs.get(pos) as u16;
        length += 1;
        if let Some(&symbol) = reverse.get(&(value, length)) {
            out.push(symbol);
            value = 0;
            length = 0;
        }
    }
    out
}
