//! Idolex: Ido–Esperanto lexicon extraction pipeline
//!
//! This crate rebuilds an Ido monolingual lexicon and an Ido↔Esperanto
//! bilingual dictionary from public Wikimedia dumps:
//!
//! 1. **Parsing** -- Stream the Ido/Esperanto/English/French Wiktionary and
//!    Ido Wikipedia dumps (bz2 XML, gzipped SQL) into a uniform entry schema
//!    with per-sense translations and provenance
//! 2. **Pivot pairing** -- Derive IO↔EO pairs from English pages where both
//!    languages translate the same headword, and from French pages where
//!    both appear inside the same meaning's translation table
//! 3. **Merging** -- Deterministically consolidate all sources by
//!    `(language, lemma, pos)` with multi-source provenance, confidence
//!    aggregation, and conflict reporting
//! 4. **Morphology** -- Assign a paradigm to every lemma from a closed
//!    suffix-rule table
//! 5. **Output** -- Expand merged entries into bilingual surface entries,
//!    plus the monolingual dictionary and audit reports
//!
//! # Architecture
//!
//! The pipeline is a DAG of stages with persisted status:
//!
//! - **Streaming parsing** -- Dumps are never loaded whole; readers are
//!   pull-based iterators with per-page memory
//! - **Stage resumability** -- Completed stages with fresh outputs are
//!   skipped; failures persist state and abort; reruns resume
//! - **Deterministic output** -- Input order breaks ties, outputs are
//!   sorted, identical inputs give byte-identical artifacts
//! - **Atomic writes** -- Artifacts and state go through temp-file rename
//!
//! # Key Modules
//!
//! - [`dump`] -- Streaming XML parser with BZ2 decompression
//! - [`langlinks`] -- Streaming SQL parser for interlanguage links
//! - [`wiktionary`] -- Per-page entry extraction (inline/template dialects)
//! - [`via`] -- Pivot-language pairing
//! - [`wikipedia`] -- Category-classified Wikipedia vocabulary
//! - [`clean`] -- Markup cleaner and lemma validator
//! - [`merge`] -- Multi-source merger with conflict tracking
//! - [`morph`] -- Suffix-rule morphology inference
//! - [`filter`] -- Schema filter and frequency gate
//! - [`bidix`] -- Bilingual surface-entry expansion
//! - [`pipeline`] -- Stage DAG with state file and resumability
//! - [`report`] -- Statistics, coverage, and conflict reports

pub mod align;
pub mod artifact;
pub mod bidix;
pub mod cache;
pub mod clean;
pub mod config;
pub mod dump;
pub mod error;
pub mod filter;
pub mod frequency;
pub mod index;
pub mod langlinks;
pub mod merge;
pub mod models;
pub mod morph;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod stats;
pub mod via;
pub mod wikipedia;
pub mod wikitext;
pub mod wiktionary;
