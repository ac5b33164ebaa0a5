use crate::artifact;
use crate::bidix;
use crate::config::PipelineConfig;
use crate::dump::DumpReader;
use crate::error::ExtractorError;
use crate::filter::{self, FilterStats};
use crate::frequency::{self, FrequencyList};
use crate::merge::{self, MergeStats};
use crate::models::{ConflictRecord, Entry, Lang, ProvenanceTag};
use crate::report;
use crate::state::{PipelineState, StageState, StageStatus};
use crate::stats::ParseStats;
use crate::via;
use crate::wikipedia;
use crate::wikitext::SourceLang;
use crate::wiktionary::WiktionaryParser;
use crate::{align, morph};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// All file locations, derived from one data directory:
/// `raw/` holds the downloaded dumps, `work/` the stage artifacts,
/// `out/` the dictionaries, `reports/` the audit output.
#[derive(Debug, Clone)]
pub struct Paths {
    pub io_wiktionary_dump: PathBuf,
    pub eo_wiktionary_dump: PathBuf,
    pub en_wiktionary_dump: PathBuf,
    pub fr_wiktionary_dump: PathBuf,
    pub io_wikipedia_dump: PathBuf,
    pub langlinks_dump: PathBuf,
    pub work_dir: PathBuf,
    pub out_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir: &Path) -> Self {
        let raw = data_dir.join("raw");
        Self {
            io_wiktionary_dump: raw.join("iowiktionary-latest-pages-articles.xml.bz2"),
            eo_wiktionary_dump: raw.join("eowiktionary-latest-pages-articles.xml.bz2"),
            en_wiktionary_dump: raw.join("enwiktionary-latest-pages-articles.xml.bz2"),
            fr_wiktionary_dump: raw.join("frwiktionary-latest-pages-articles.xml.bz2"),
            io_wikipedia_dump: raw.join("iowiki-latest-pages-articles.xml.bz2"),
            langlinks_dump: raw.join("iowiki-latest-langlinks.sql.gz"),
            work_dir: data_dir.join("work"),
            out_dir: data_dir.join("out"),
            reports_dir: data_dir.join("reports"),
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.work_dir.join("pipeline_state.json")
    }

    pub fn io_wikt_json(&self) -> PathBuf {
        self.work_dir.join("io_wikt.json")
    }

    pub fn eo_wikt_json(&self) -> PathBuf {
        self.work_dir.join("eo_wikt.json")
    }

    pub fn en_via_json(&self) -> PathBuf {
        self.work_dir.join("en_via.json")
    }

    pub fn fr_meaning_json(&self) -> PathBuf {
        self.work_dir.join("fr_meaning.json")
    }

    pub fn wikipedia_json(&self) -> PathBuf {
        self.work_dir.join("wikipedia.json")
    }

    pub fn wikidata_json(&self) -> PathBuf {
        self.work_dir.join("wikidata.json")
    }

    pub fn frequency_json(&self) -> PathBuf {
        self.work_dir.join("frequency.json")
    }

    pub fn aligned_json(&self) -> PathBuf {
        self.work_dir.join("aligned.json")
    }

    pub fn merged_json(&self) -> PathBuf {
        self.work_dir.join("merged.json")
    }

    pub fn merge_conflicts_json(&self) -> PathBuf {
        self.work_dir.join("conflicts.json")
    }

    pub fn merge_stats_json(&self) -> PathBuf {
        self.work_dir.join("merge_stats.json")
    }

    pub fn morphed_json(&self) -> PathBuf {
        self.work_dir.join("morphed.json")
    }

    pub fn final_json(&self) -> PathBuf {
        self.work_dir.join("final.json")
    }

    pub fn filter_stats_json(&self) -> PathBuf {
        self.work_dir.join("filter_stats.json")
    }

    pub fn filter_conflicts_json(&self) -> PathBuf {
        self.work_dir.join("filter_conflicts.json")
    }

    pub fn suspicious_json(&self) -> PathBuf {
        self.work_dir.join("suspicious.json")
    }

    pub fn parse_stats_json(&self, source: &str) -> PathBuf {
        self.work_dir.join(format!("{source}_stats.json"))
    }

    pub fn bidix_csv(&self) -> PathBuf {
        self.out_dir.join("bidix.csv")
    }

    pub fn bidix_json(&self) -> PathBuf {
        self.out_dir.join("bidix.json")
    }

    pub fn monodix_json(&self) -> PathBuf {
        self.out_dir.join("monodix.json")
    }

    pub fn statistics_txt(&self) -> PathBuf {
        self.reports_dir.join("statistics.txt")
    }

    pub fn coverage_txt(&self) -> PathBuf {
        self.reports_dir.join("coverage.txt")
    }

    pub fn conflicts_txt(&self) -> PathBuf {
        self.reports_dir.join("conflicts.txt")
    }
}

/// The closed set of pipeline stages, in topological order. Adding a stage
/// is a new variant plus one arm in each dispatch match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    ParseIoWiktionary,
    ParseEoWiktionary,
    ParseEnWiktionary,
    ParseFrWiktionary,
    WikipediaVocab,
    Frequency,
    Align,
    Merge,
    Morphology,
    Filter,
    Bidix,
    Reports,
}

impl StageKind {
    pub const ALL: [StageKind; 12] = [
        StageKind::ParseIoWiktionary,
        StageKind::ParseEoWiktionary,
        StageKind::ParseEnWiktionary,
        StageKind::ParseFrWiktionary,
        StageKind::WikipediaVocab,
        StageKind::Frequency,
        StageKind::Align,
        StageKind::Merge,
        StageKind::Morphology,
        StageKind::Filter,
        StageKind::Bidix,
        StageKind::Reports,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::ParseIoWiktionary => "parse_io_wiktionary",
            StageKind::ParseEoWiktionary => "parse_eo_wiktionary",
            StageKind::ParseEnWiktionary => "parse_en_wiktionary",
            StageKind::ParseFrWiktionary => "parse_fr_wiktionary",
            StageKind::WikipediaVocab => "wikipedia_vocab",
            StageKind::Frequency => "frequency",
            StageKind::Align => "align",
            StageKind::Merge => "merge",
            StageKind::Morphology => "morphology",
            StageKind::Filter => "filter",
            StageKind::Bidix => "bidix",
            StageKind::Reports => "reports",
        }
    }

    pub fn from_name(name: &str) -> Option<StageKind> {
        StageKind::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Inputs that must exist for the stage to run; a missing one marks the
    /// stage skipped rather than failed.
    fn required_inputs(&self, paths: &Paths) -> Vec<PathBuf> {
        match self {
            StageKind::ParseIoWiktionary => vec![paths.io_wiktionary_dump.clone()],
            StageKind::ParseEoWiktionary => vec![paths.eo_wiktionary_dump.clone()],
            StageKind::ParseEnWiktionary => vec![paths.en_wiktionary_dump.clone()],
            StageKind::ParseFrWiktionary => vec![paths.fr_wiktionary_dump.clone()],
            StageKind::WikipediaVocab => {
                vec![paths.io_wikipedia_dump.clone(), paths.langlinks_dump.clone()]
            }
            StageKind::Frequency => vec![paths.io_wikipedia_dump.clone()],
            StageKind::Align => vec![],
            StageKind::Merge => vec![paths.aligned_json()],
            StageKind::Morphology => vec![paths.merged_json()],
            StageKind::Filter => vec![paths.morphed_json()],
            StageKind::Bidix => vec![paths.final_json()],
            StageKind::Reports => vec![paths.final_json()],
        }
    }

    /// Inputs consulted for freshness when present, but whose absence does
    /// not block the stage (optional sources, auxiliary stats).
    fn optional_inputs(&self, paths: &Paths) -> Vec<PathBuf> {
        match self {
            StageKind::Align => vec![paths.io_wikt_json(), paths.eo_wikt_json()],
            StageKind::Merge => vec![
                paths.en_via_json(),
                paths.fr_meaning_json(),
                paths.wikipedia_json(),
                paths.wikidata_json(),
            ],
            StageKind::Filter => vec![paths.frequency_json()],
            StageKind::Reports => vec![
                paths.merge_conflicts_json(),
                paths.filter_conflicts_json(),
                paths.frequency_json(),
                paths.merge_stats_json(),
                paths.filter_stats_json(),
                paths.suspicious_json(),
            ],
            _ => vec![],
        }
    }

    fn outputs(&self, paths: &Paths) -> Vec<PathBuf> {
        match self {
            StageKind::ParseIoWiktionary => vec![paths.io_wikt_json()],
            StageKind::ParseEoWiktionary => vec![paths.eo_wikt_json()],
            StageKind::ParseEnWiktionary => vec![paths.en_via_json()],
            StageKind::ParseFrWiktionary => vec![paths.fr_meaning_json()],
            StageKind::WikipediaVocab => vec![paths.wikipedia_json()],
            StageKind::Frequency => vec![paths.frequency_json()],
            StageKind::Align => vec![paths.aligned_json()],
            StageKind::Merge => vec![
                paths.merged_json(),
                paths.merge_conflicts_json(),
                paths.merge_stats_json(),
            ],
            StageKind::Morphology => vec![paths.morphed_json()],
            StageKind::Filter => vec![
                paths.final_json(),
                paths.filter_stats_json(),
                paths.filter_conflicts_json(),
                paths.suspicious_json(),
            ],
            StageKind::Bidix => vec![paths.bidix_csv(), paths.bidix_json(), paths.monodix_json()],
            StageKind::Reports => vec![
                paths.statistics_txt(),
                paths.coverage_txt(),
                paths.conflicts_txt(),
            ],
        }
    }

    /// A stage for a disabled source is skipped outright.
    fn disabled(&self, cfg: &PipelineConfig) -> bool {
        let tag = match self {
            StageKind::ParseIoWiktionary => Some(ProvenanceTag::IoWiktionary),
            StageKind::ParseEoWiktionary => Some(ProvenanceTag::EoWiktionary),
            StageKind::ParseEnWiktionary => Some(ProvenanceTag::EnWiktionaryVia),
            StageKind::ParseFrWiktionary => Some(ProvenanceTag::FrWiktionaryMeaning),
            StageKind::WikipediaVocab => Some(ProvenanceTag::IoWikipedia),
            _ => None,
        };
        tag.map(|t| !cfg.sources.enabled(t)).unwrap_or(false)
    }

    fn execute(&self, paths: &Paths, cfg: &PipelineConfig) -> Result<()> {
        match self {
            StageKind::ParseIoWiktionary => run_wiktionary_parse(
                &paths.io_wiktionary_dump,
                SourceLang::Io,
                Lang::Eo,
                &paths.io_wikt_json(),
                paths,
                cfg,
            ),
            StageKind::ParseEoWiktionary => run_wiktionary_parse(
                &paths.eo_wiktionary_dump,
                SourceLang::Eo,
                Lang::Io,
                &paths.eo_wikt_json(),
                paths,
                cfg,
            ),
            StageKind::ParseEnWiktionary => {
                let entries = via::parse_via_dump(&paths.en_wiktionary_dump, SourceLang::En, cfg)?;
                artifact::save_entries(&paths.en_via_json(), &entries)
            }
            StageKind::ParseFrWiktionary => {
                let entries = via::parse_via_dump(&paths.fr_wiktionary_dump, SourceLang::Fr, cfg)?;
                artifact::save_entries(&paths.fr_meaning_json(), &entries)
            }
            StageKind::WikipediaVocab => {
                let entries = wikipedia::build_vocab(
                    &paths.io_wikipedia_dump,
                    &paths.langlinks_dump,
                    &paths.work_dir,
                    cfg,
                )?;
                artifact::save_entries(&paths.wikipedia_json(), &entries)
            }
            StageKind::Frequency => {
                let freq = frequency::build_frequency(&paths.io_wikipedia_dump, cfg)?;
                fs::create_dir_all(&paths.work_dir)?;
                freq.save(&paths.frequency_json())
            }
            StageKind::Align => {
                let io = load_optional_entries(&paths.io_wikt_json())?;
                let eo = load_optional_entries(&paths.eo_wikt_json())?;
                let joined = align::align(io, eo);
                artifact::save_entries(&paths.aligned_json(), &joined)
            }
            StageKind::Merge => {
                let mut all = artifact::load_entries(&paths.aligned_json())?;
                let optional = [
                    (ProvenanceTag::EnWiktionaryVia, paths.en_via_json()),
                    (ProvenanceTag::FrWiktionaryMeaning, paths.fr_meaning_json()),
                    (ProvenanceTag::IoWikipedia, paths.wikipedia_json()),
                    (ProvenanceTag::Wikidata, paths.wikidata_json()),
                ];
                for (tag, path) in optional {
                    if !cfg.sources.enabled(tag) {
                        continue;
                    }
                    if path.exists() {
                        all.extend(artifact::load_entries(&path)?);
                    }
                }
                let outcome = merge::merge_entries(all, &cfg.sources);
                artifact::save_entries(&paths.merged_json(), &outcome.entries)?;
                artifact::save_conflicts(&paths.merge_conflicts_json(), &outcome.conflicts)?;
                artifact::save_json(&paths.merge_stats_json(), &outcome.stats)
            }
            StageKind::Morphology => {
                let entries = artifact::load_entries(&paths.merged_json())?;
                let morphed = morph::infer_all(entries);
                artifact::save_entries(&paths.morphed_json(), &morphed)
            }
            StageKind::Filter => {
                let entries = artifact::load_entries(&paths.morphed_json())?;
                let freq = load_optional_frequency(&paths.frequency_json())?;
                let outcome = filter::apply_filters(entries, &freq, cfg);
                artifact::save_entries(&paths.final_json(), &outcome.entries)?;
                artifact::save_json(&paths.filter_stats_json(), &outcome.stats)?;
                artifact::save_conflicts(&paths.filter_conflicts_json(), &outcome.conflicts)?;
                artifact::save_json(&paths.suspicious_json(), &outcome.suspicious)
            }
            StageKind::Bidix => {
                let entries = artifact::load_entries(&paths.final_json())?;
                let surface = bidix::build_surface_entries(&entries);
                fs::create_dir_all(&paths.out_dir)?;
                bidix::write_surface_csv(&paths.bidix_csv(), &surface)?;
                artifact::save_json(&paths.bidix_json(), &surface)?;
                artifact::save_entries(&paths.monodix_json(), &bidix::monolingual_entries(&entries))
            }
            StageKind::Reports => {
                let entries = artifact::load_entries(&paths.final_json())?;
                let mut conflicts: Vec<ConflictRecord> = Vec::new();
                for path in [paths.merge_conflicts_json(), paths.filter_conflicts_json()] {
                    if path.exists() {
                        conflicts.extend(artifact::load_conflicts(&path)?);
                    }
                }
                let freq = load_optional_frequency(&paths.frequency_json())?;
                let merge_stats: MergeStats = load_optional_json(&paths.merge_stats_json())?;
                let filter_stats: FilterStats = load_optional_json(&paths.filter_stats_json())?;
                let suspicious: Vec<String> = load_optional_json(&paths.suspicious_json())?;

                report::write_statistics(
                    &paths.statistics_txt(),
                    &entries,
                    &merge_stats,
                    &filter_stats,
                    &suspicious,
                )?;
                report::write_coverage(&paths.coverage_txt(), &entries, &freq, cfg.wiki_top_n)?;
                report::write_conflicts(&paths.conflicts_txt(), &conflicts)
            }
        }
    }
}

fn load_optional_entries(path: &Path) -> Result<Vec<Entry>> {
    if path.exists() {
        artifact::load_entries(path)
    } else {
        warn!(path = %path.display(), "artifact absent, continuing without it");
        Ok(Vec::new())
    }
}

fn load_optional_frequency(path: &Path) -> Result<FrequencyList> {
    if path.exists() {
        FrequencyList::load(path)
    } else {
        warn!(path = %path.display(), "frequency list absent, gate passes everything");
        Ok(FrequencyList::default())
    }
}

fn load_optional_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        artifact::load_json(path)
    } else {
        Ok(T::default())
    }
}

/// Shared driver for the direct (io/eo) Wiktionary parse stages.
fn run_wiktionary_parse(
    dump: &Path,
    source: SourceLang,
    target: Lang,
    out: &Path,
    paths: &Paths,
    cfg: &PipelineConfig,
) -> Result<()> {
    let tag = match source {
        SourceLang::Io => ProvenanceTag::IoWiktionary,
        _ => ProvenanceTag::EoWiktionary,
    };
    let parser =
        WiktionaryParser::new(source, target).with_confidence(cfg.sources.confidence(tag));
    let stats = ParseStats::new();
    let mut entries = Vec::new();

    for page in DumpReader::open(dump, false)? {
        stats.inc_pages();
        if stats.pages() % cfg.progress_every == 0 {
            info!(
                pages = stats.pages(),
                entries = stats.entries(),
                source = source.code(),
                "parse progress"
            );
        }
        let parsed = parser.parse_page(&page.title, &page.text);
        if parsed.is_empty() {
            stats.inc_skipped();
            continue;
        }
        for entry in parsed {
            let n: usize = entry.senses.iter().map(|s| s.translations.len()).sum();
            stats.add_translations(n as u64);
            stats.inc_entries();
            entries.push(entry);
        }
    }

    artifact::save_entries(out, &entries)?;
    artifact::save_json(&paths.parse_stats_json(source.code()), &stats.snapshot())?;
    info!(
        pages = stats.pages(),
        entries = entries.len(),
        source = source.code(),
        "parse complete"
    );
    Ok(())
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// What `run` decided to do with each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    Executed,
    CachedSkip,
    MissingInputSkip,
    DisabledSkip,
}

pub struct Pipeline {
    pub paths: Paths,
    pub cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(paths: Paths, cfg: PipelineConfig) -> Self {
        Self { paths, cfg }
    }

    /// All outputs exist and are at least as new as every available input.
    fn outputs_fresh(&self, stage: StageKind) -> bool {
        let outputs = stage.outputs(&self.paths);
        let mut newest_input: Option<SystemTime> = None;
        for input in stage
            .required_inputs(&self.paths)
            .into_iter()
            .chain(stage.optional_inputs(&self.paths))
        {
            if let Some(t) = mtime(&input) {
                newest_input = Some(newest_input.map_or(t, |n| n.max(t)));
            }
        }
        let mut oldest_output: Option<SystemTime> = None;
        for output in &outputs {
            match mtime(output) {
                Some(t) => oldest_output = Some(oldest_output.map_or(t, |o| o.min(t))),
                None => return false,
            }
        }
        match (newest_input, oldest_output) {
            (Some(i), Some(o)) => o >= i,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Stages transitively depending on `root`'s outputs, `root` included.
    fn descendants(&self, root: StageKind) -> FxHashSet<&'static str> {
        let mut dirty: FxHashSet<PathBuf> = root.outputs(&self.paths).into_iter().collect();
        let mut members: FxHashSet<&'static str> = FxHashSet::default();
        members.insert(root.name());

        // single forward pass suffices: ALL is topologically ordered
        for stage in StageKind::ALL {
            if members.contains(stage.name()) {
                continue;
            }
            let depends = stage
                .required_inputs(&self.paths)
                .into_iter()
                .chain(stage.optional_inputs(&self.paths))
                .any(|p| dirty.contains(&p));
            if depends {
                members.insert(stage.name());
                dirty.extend(stage.outputs(&self.paths));
            }
        }
        members
    }

    /// Execute the DAG in topological order with stage-level resumability.
    /// Returns the per-stage actions taken.
    pub fn run(&self) -> Result<Vec<(StageKind, StageAction)>> {
        fs::create_dir_all(&self.paths.work_dir).context("failed to create work directory")?;
        let state_path = self.paths.state_file();
        let mut state = PipelineState::load(&state_path)?;

        let forced: FxHashSet<&'static str> = match (&self.cfg.from_stage, self.cfg.force) {
            (_, true) => StageKind::ALL.iter().map(|s| s.name()).collect(),
            (Some(name), false) => {
                let stage = StageKind::from_name(name)
                    .ok_or_else(|| ExtractorError::UnknownStage(name.clone()))?;
                self.descendants(stage)
            }
            (None, false) => FxHashSet::default(),
        };

        let mut actions = Vec::new();
        for stage in StageKind::ALL {
            let name = stage.name();

            if stage.disabled(&self.cfg) {
                info!(stage = name, "source disabled, skipping");
                state.mark(name, StageState::with_status(StageStatus::Skipped));
                state.save(&state_path)?;
                actions.push((stage, StageAction::DisabledSkip));
                continue;
            }

            let missing: Vec<PathBuf> = stage
                .required_inputs(&self.paths)
                .into_iter()
                .filter(|p| !p.exists())
                .collect();
            if !missing.is_empty() {
                warn!(stage = name, missing = ?missing, "inputs missing, skipping");
                state.mark(name, StageState::with_status(StageStatus::Skipped));
                state.save(&state_path)?;
                actions.push((stage, StageAction::MissingInputSkip));
                continue;
            }

            let cached = !forced.contains(name)
                && state.status_of(name) == StageStatus::Completed
                && self.outputs_fresh(stage);
            if cached {
                info!(stage = name, "up to date, skipping");
                actions.push((stage, StageAction::CachedSkip));
                continue;
            }

            info!(stage = name, "running");
            state.mark_running(name);
            state.save(&state_path)?;

            match stage.execute(&self.paths, &self.cfg) {
                Ok(()) => {
                    state.mark_finished(name, StageStatus::Completed, None);
                    state.save(&state_path)?;
                    info!(stage = name, "completed");
                    actions.push((stage, StageAction::Executed));
                }
                Err(e) => {
                    state.mark_finished(name, StageStatus::Failed, Some(format!("{e:#}")));
                    state.save(&state_path)?;
                    return Err(e.context(format!("stage '{name}' failed")));
                }
            }
        }

        info!("pipeline complete");
        Ok(actions)
    }

    /// Current per-stage status table, in DAG order.
    pub fn status(&self) -> Result<Vec<(&'static str, StageState)>> {
        let state = PipelineState::load(&self.paths.state_file())?;
        Ok(StageKind::ALL
            .iter()
            .map(|s| {
                (
                    s.name(),
                    state
                        .stages
                        .get(s.name())
                        .cloned()
                        .unwrap_or_else(|| StageState::with_status(StageStatus::Pending)),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::write_bz2_xml;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn io_wiktionary_xml() -> &'static str {
        r#"<mediawiki>
            <page><title>abasar</title><ns>0</ns><id>1</id>
                <revision><text>== Ido ==
=== Verbo ===
* {{eo}}: '''1.''' madaldama; '''2.''' malaltigi</text></revision></page>
            <page><title>hundo</title><ns>0</ns><id>2</id>
                <revision><text>== Ido ==
=== Substantivo ===
* {{eo}}: hundo</text></revision></page>
        </mediawiki>"#
    }

    fn iowiki_xml() -> &'static str {
        r#"<mediawiki>
            <page><title>Acensilo</title><ns>0</ns><id>10</id>
                <revision><text>Acensilo esas mashino. acensilo acensilo acensilo</text></revision></page>
            <page><title>Abdulino</title><ns>0</ns><id>11</id>
                <revision><text>Urbo. [[Kategorio:Urbi di Rusia]]</text></revision></page>
        </mediawiki>"#
    }

    fn langlinks_sql() -> &'static str {
        "INSERT INTO `langlinks` VALUES (10,'eo','Lifto'),(11,'eo','Abdulino');\n"
    }

    fn setup(dir: &TempDir) -> Paths {
        let data = dir.path();
        let raw = data.join("raw");
        fs::create_dir_all(&raw).unwrap();

        let mut paths = Paths::new(data);

        let io_wikt = write_bz2_xml(io_wiktionary_xml());
        let iowiki = write_bz2_xml(iowiki_xml());
        fs::copy(io_wikt.path(), raw.join("iowiktionary-latest-pages-articles.xml.bz2")).unwrap();
        fs::copy(iowiki.path(), raw.join("iowiki-latest-pages-articles.xml.bz2")).unwrap();

        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(langlinks_sql().as_bytes()).unwrap();
        fs::write(raw.join("iowiki-latest-langlinks.sql.gz"), enc.finish().unwrap()).unwrap();

        paths.work_dir = data.join("work");
        paths
    }

    #[test]
    fn full_run_produces_artifacts() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let pipeline = Pipeline::new(paths.clone(), PipelineConfig::default());

        pipeline.run().unwrap();

        assert!(paths.io_wikt_json().exists());
        assert!(paths.aligned_json().exists());
        assert!(paths.merged_json().exists());
        assert!(paths.final_json().exists());
        assert!(paths.bidix_csv().exists());
        assert!(paths.monodix_json().exists());
        assert!(paths.statistics_txt().exists());

        let final_entries = artifact::load_entries(&paths.final_json()).unwrap();
        assert!(final_entries.iter().any(|e| e.lemma == "abasar"));
    }

    #[test]
    fn missing_dump_skips_stage_not_pipeline() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let pipeline = Pipeline::new(paths.clone(), PipelineConfig::default());

        let actions = pipeline.run().unwrap();
        let en = actions
            .iter()
            .find(|(s, _)| *s == StageKind::ParseEnWiktionary)
            .unwrap();
        assert_eq!(en.1, StageAction::MissingInputSkip);

        // the pipeline still reached the end
        assert!(paths.bidix_csv().exists());
        let status = pipeline.status().unwrap();
        let en_status = status.iter().find(|(n, _)| *n == "parse_en_wiktionary").unwrap();
        assert_eq!(en_status.1.status, StageStatus::Skipped);
    }

    #[test]
    fn second_run_executes_zero_stages() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let pipeline = Pipeline::new(paths, PipelineConfig::default());

        pipeline.run().unwrap();
        let actions = pipeline.run().unwrap();
        assert!(actions
            .iter()
            .all(|(_, a)| *a != StageAction::Executed));
    }

    #[test]
    fn force_reruns_everything() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let mut cfg = PipelineConfig::default();
        let pipeline = Pipeline::new(paths.clone(), cfg.clone());
        pipeline.run().unwrap();

        cfg.force = true;
        let forced = Pipeline::new(paths, cfg);
        let actions = forced.run().unwrap();
        let executed = actions
            .iter()
            .filter(|(_, a)| *a == StageAction::Executed)
            .count();
        // every stage with satisfied inputs ran again
        assert!(executed >= 7, "only {executed} stages executed");
    }

    #[test]
    fn from_stage_reruns_descendants_only() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let mut cfg = PipelineConfig::default();
        let pipeline = Pipeline::new(paths.clone(), cfg.clone());
        pipeline.run().unwrap();

        cfg.from_stage = Some("merge".to_string());
        let resumed = Pipeline::new(paths, cfg);
        let actions = resumed.run().unwrap();

        let executed: Vec<&str> = actions
            .iter()
            .filter(|(_, a)| *a == StageAction::Executed)
            .map(|(s, _)| s.name())
            .collect();
        assert!(executed.contains(&"merge"));
        assert!(executed.contains(&"morphology"));
        assert!(executed.contains(&"bidix"));
        assert!(!executed.contains(&"parse_io_wiktionary"));
        assert!(!executed.contains(&"align"));
    }

    #[test]
    fn unknown_from_stage_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let mut cfg = PipelineConfig::default();
        cfg.from_stage = Some("normalise".to_string());

        let err = Pipeline::new(paths, cfg).run().unwrap_err();
        assert!(err.to_string().contains("normalise"));
    }

    #[test]
    fn disabled_source_stage_is_skipped() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        let mut cfg = PipelineConfig::default();
        cfg.sources.set_enabled(ProvenanceTag::IoWikipedia, false);

        let actions = Pipeline::new(paths, cfg).run().unwrap();
        let wp = actions
            .iter()
            .find(|(s, _)| *s == StageKind::WikipediaVocab)
            .unwrap();
        assert_eq!(wp.1, StageAction::DisabledSkip);
    }

    #[test]
    fn corrupt_state_file_refuses_to_run() {
        let dir = TempDir::new().unwrap();
        let paths = setup(&dir);
        fs::create_dir_all(&paths.work_dir).unwrap();
        fs::write(paths.state_file(), b"{ corrupt").unwrap();

        let err = Pipeline::new(paths, PipelineConfig::default())
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("remove or repair"));
    }
}
