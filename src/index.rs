use crate::dump::DumpReader;
use anyhow::Result;
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Page-id → title mapping over the Ido Wikipedia dump. The langlinks SQL
/// rows carry only page ids, so joining them back to headwords needs this
/// one extra pass (text is skipped, titles only).
pub struct TitleIndex {
    id_to_title: FxHashMap<u32, String>,
}

impl TitleIndex {
    pub fn build(dump_path: &Path) -> Result<Self> {
        let reader = DumpReader::open(dump_path, true)?;
        let pb = ProgressBar::new_spinner();
        let mut id_to_title = FxHashMap::default();

        for (n, page) in reader.enumerate() {
            id_to_title.insert(page.id, page.title);
            if n % 1000 == 0 {
                pb.tick();
            }
        }
        pb.finish_and_clear();

        Ok(Self { id_to_title })
    }

    pub fn title_of(&self, page_id: u32) -> Option<&str> {
        self.id_to_title.get(&page_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_title.is_empty()
    }

    /// Flatten into a sorted vec for cache serialization.
    pub fn to_serializable(&self) -> Vec<(u32, String)> {
        let mut pairs: Vec<_> = self
            .id_to_title
            .iter()
            .map(|(id, t)| (*id, t.clone()))
            .collect();
        pairs.sort_unstable_by_key(|(id, _)| *id);
        pairs
    }

    pub fn from_serializable(pairs: Vec<(u32, String)>) -> Self {
        Self {
            id_to_title: pairs.into_iter().collect(),
        }
    }
}
