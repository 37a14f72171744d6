use std::collections::BTreeMap;

use crate::continuation::find_predecessor;
use crate::model::{BBox, PageGeometry, RegionKey};
use crate::options::StitchOptions;

/// Root of every region seen so far, built one page at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ChainMap {
    roots: BTreeMap<RegionKey, RegionKey>,
}

impl ChainMap {
    pub(crate) fn root_of(&self, key: RegionKey) -> Option<RegionKey> {
        self.roots.get(&key).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.roots.len()
    }

    /// Members of each chain in `(page, index)` order, keyed by root.
    pub(crate) fn groups(&self) -> BTreeMap<RegionKey, Vec<RegionKey>> {
        let mut groups: BTreeMap<RegionKey, Vec<RegionKey>> = BTreeMap::new();
        for (key, root) in &self.roots {
            groups.entry(*root).or_default().push(*key);
        }
        groups
    }
}

#[derive(Debug, Clone)]
struct PreviousPage {
    page: u32,
    height: f64,
    tables: Vec<(RegionKey, BBox)>,
}

/// Single forward pass over pages. A page must be pushed after the page
/// before it, so a predecessor's root is always final when it is looked up.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChainBuilder {
    chains: ChainMap,
    previous: Option<PreviousPage>,
}

impl ChainBuilder {
    /// Resolves every table on `page` and returns, per table, the region it
    /// directly continues.
    pub(crate) fn push_page(
        &mut self,
        page: &PageGeometry,
        options: &StitchOptions,
    ) -> Vec<Option<RegionKey>> {
        let previous = self
            .previous
            .take()
            .filter(|previous| previous.page + 1 == page.page);

        let mut links = Vec::with_capacity(page.tables.len());
        for table in &page.tables {
            let predecessor = previous.as_ref().and_then(|previous| {
                find_predecessor(
                    &table.bbox,
                    previous.tables.iter().map(|(key, bbox)| (*key, bbox)),
                    previous.height,
                    options,
                )
            });

            let root = predecessor
                .and_then(|key| self.chains.root_of(key))
                .unwrap_or(table.key);
            if let Some(predecessor) = predecessor {
                tracing::debug!(
                    page = table.key.page,
                    index = table.key.index,
                    prev_page = predecessor.page,
                    prev_index = predecessor.index,
                    "table continues previous page"
                );
            }
            self.chains.roots.insert(table.key, root);
            links.push(predecessor);
        }

        self.previous = Some(PreviousPage {
            page: page.page,
            height: page.height,
            tables: page
                .tables
                .iter()
                .map(|table| (table.key, table.bbox))
                .collect(),
        });
        links
    }

    pub(crate) fn finish(self) -> ChainMap {
        self.chains
    }
}
