//! ArmGPT: a language-model assistant for serial terminals.
//!
//! A host process sits on a serial line (typically a Raspberry Pi wired to
//! a vintage or embedded terminal), reads one line at a time, and answers
//! each line with a single line of text.
//!
//! Each message is classified first. Small talk goes straight to generation;
//! anything substantive is embedded and matched against a JSONL vector
//! index, and the best chunks are folded into the system prompt.
//! Generation walks an ordered list of tiers (a hosted chat-completions API,
//! then local models) and falls back to a fixed reply when none answers.
//!
//! # Modules
//!
//! - [`serial`]: framing, decoding, and the busy/idle transport
//! - [`classify`]: rule-based small-talk detection
//! - [`index`]: JSONL vector index, cosine top-K, context formatting, index building
//! - [`embedding`]: query embedding via Ollama
//! - [`generation`]: prompt assembly and the tiered fallback controller
//! - [`bridge`]: the per-message pipeline and the serve loop
//! - [`config`]: TOML configuration with environment overrides

pub mod bridge;
pub mod classify;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod serial;
