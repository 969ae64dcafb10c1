//! Content-addressed store of object files
//!
//! Every object occurrence from every archive goes through
//! [`ObjectFileDb::insert`]. Objects are identified by name and content:
//! a repeat of a stored variant only bumps its reference count, while new
//! content under a known name becomes the next version of that name.
//!
//! Traversal order is a property of insertion order alone. Names are
//! visited in the order they were first seen and the variants of a name in
//! version order, whatever hasher the name index uses.

use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::hash::BuildHasher;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::matcher::{ContentMatcher, FingerprintMatcher};
use crate::record::{ObjectEntry, ObjectRecord};
use crate::staged::StagedArchive;
use crate::stats::IngestStats;

/// File name of the archive listing written by [`ObjectFileDb::write_dgo_listing`]
pub const LISTING_FILE_NAME: &str = "dgo.txt";

/// What one committed archive contributed to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    /// Archive base name
    pub name: String,
    /// Objects in the archive
    pub objects: usize,
    /// Objects that were not already stored
    pub new_objects: usize,
    /// Archive size before decompression
    pub file_size: u64,
}

/// Deduplicated object files from a set of archives
///
/// `E` is the per-object enrichment slot filled in by later processing.
/// `S` is the hasher for the name index and never affects ordering.
pub struct ObjectFileDb<E = (), S = RandomState> {
    entries: Vec<ObjectEntry<E>>,
    by_name: HashMap<Arc<str>, Vec<usize>, S>,
    by_archive: BTreeMap<String, Vec<ObjectRecord>>,
    order: Vec<Arc<str>>,
    stats: IngestStats,
    matcher: Box<dyn ContentMatcher>,
}

impl<E: Default> ObjectFileDb<E, RandomState> {
    /// Empty store with the default hasher and [`FingerprintMatcher`]
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Build a store from archive files, in the order given
    pub fn from_archives<P>(paths: &[P]) -> StoreResult<Self>
    where
        P: AsRef<Path> + Sync,
    {
        let mut db = Self::new();
        db.ingest_files(paths)?;
        Ok(db)
    }
}

impl<E: Default> Default for ObjectFileDb<E, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Default, S: BuildHasher> ObjectFileDb<E, S> {
    /// Empty store using `hasher` for the name index
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::with_hasher(hasher),
            by_archive: BTreeMap::new(),
            order: Vec::new(),
            stats: IngestStats::default(),
            matcher: Box::new(FingerprintMatcher),
        }
    }

    /// Replace the content matcher
    ///
    /// Only meaningful before the first insertion.
    #[must_use]
    pub fn with_matcher(mut self, matcher: impl ContentMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Record one occurrence of an object in `archive`
    ///
    /// Returns the identity the occurrence resolved to, either an existing
    /// variant or a newly created one.
    pub fn insert(&mut self, name: &str, data: &[u8], archive: &str) -> ObjectRecord {
        self.stats.total_objects += 1;
        let hash = self.matcher.fingerprint(data);

        let existing = self.by_name.get(name).and_then(|handles| {
            handles.iter().copied().find(|&handle| {
                let stored = &self.entries[handle];
                self.matcher
                    .matches(stored.record(), stored.data(), hash, data)
            })
        });

        if let Some(handle) = existing {
            let entry = &mut self.entries[handle];
            entry.add_reference();
            let record = entry.record().clone();
            self.add_membership(archive, record.clone());
            return record;
        }

        let (name, version) = match self.by_name.get_key_value(name) {
            Some((key, variants)) => (Arc::clone(key), variants.len()),
            None => {
                let key: Arc<str> = Arc::from(name);
                self.order.push(Arc::clone(&key));
                (key, 0)
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let record = ObjectRecord {
            name: Arc::clone(&name),
            version: version as u32,
            hash,
        };

        let handle = self.entries.len();
        self.entries
            .push(ObjectEntry::new(record.clone(), data.to_vec()));
        self.by_name.entry(name).or_default().push(handle);
        self.add_membership(archive, record.clone());

        self.stats.unique_objects += 1;
        self.stats.unique_bytes += data.len() as u64;
        record
    }

    /// Insert every object of a decoded archive, in archive order
    pub fn commit(&mut self, staged: &StagedArchive) -> ArchiveSummary {
        let unique_before = self.stats.unique_objects;
        for (name, data) in staged.objects() {
            self.insert(name, data, staged.name());
        }

        self.stats.total_archives += 1;
        self.stats.total_archive_bytes += staged.file_size();

        #[allow(clippy::cast_possible_truncation)]
        let summary = ArchiveSummary {
            name: staged.name().to_string(),
            objects: staged.len(),
            new_objects: (self.stats.unique_objects - unique_before) as usize,
            file_size: staged.file_size(),
        };
        debug!(
            "Archive {}: {} objects, {} new",
            summary.name, summary.objects, summary.new_objects
        );
        summary
    }

    /// Decode an in-memory archive and add its objects
    ///
    /// `archive_name` must equal the name in the archive header. On error
    /// the store is left unchanged.
    pub fn add_archive(&mut self, archive_name: &str, file_data: &[u8]) -> StoreResult<ArchiveSummary> {
        let staged = StagedArchive::decode(archive_name, file_data.to_vec())?;
        Ok(self.commit(&staged))
    }

    /// Read, decode and add one archive file
    pub fn ingest_file(&mut self, path: &Path) -> StoreResult<ArchiveSummary> {
        let staged = StagedArchive::read(path)?;
        Ok(self.commit(&staged))
    }

    /// Add archive files in the order given, stopping at the first failure
    ///
    /// Archives before the failing one stay committed. With the `parallel`
    /// feature all archives are decoded first, concurrently, and nothing is
    /// committed unless every one decodes.
    pub fn ingest_files<P>(&mut self, paths: &[P]) -> StoreResult<()>
    where
        P: AsRef<Path> + Sync,
    {
        info!("Loading {} archives", paths.len());
        let start = Instant::now();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let staged = paths
                .par_iter()
                .map(|path| StagedArchive::read(path.as_ref()))
                .collect::<StoreResult<Vec<_>>>()?;
            for archive in &staged {
                self.commit(archive);
            }
        }

        #[cfg(not(feature = "parallel"))]
        for path in paths {
            let staged = StagedArchive::read(path.as_ref())?;
            self.commit(&staged);
        }

        let elapsed = start.elapsed();
        for line in self.stats.render(Some(elapsed)).lines() {
            info!("{line}");
        }
        Ok(())
    }
}

impl<E, S: BuildHasher> ObjectFileDb<E, S> {
    /// Variant `version` of `name`
    pub fn get(&self, name: &str, version: u32) -> Option<&ObjectEntry<E>> {
        let handle = *self.by_name.get(name)?.get(version as usize)?;
        self.entries.get(handle)
    }

    /// All variants of `name`, in version order
    pub fn variants(&self, name: &str) -> impl Iterator<Item = &ObjectEntry<E>> + '_ {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&handle| &self.entries[handle])
    }

    /// Stored objects in traversal order
    pub fn entries(&self) -> impl Iterator<Item = &ObjectEntry<E>> + '_ {
        self.order.iter().flat_map(move |name| {
            self.by_name
                .get(name)
                .into_iter()
                .flatten()
                .map(move |&handle| &self.entries[handle])
        })
    }

    /// Visit every stored object in traversal order
    pub fn for_each_obj<F>(&self, f: F)
    where
        F: FnMut(&ObjectEntry<E>),
    {
        self.entries().for_each(f);
    }

    /// Visit every stored object in traversal order, with mutable access
    /// to its enrichment
    pub fn for_each_obj_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut ObjectEntry<E>),
    {
        for name in &self.order {
            if let Some(handles) = self.by_name.get(name) {
                for &handle in handles {
                    f(&mut self.entries[handle]);
                }
            }
        }
    }

    /// Like [`Self::for_each_obj_mut`], stopping at the first error
    pub fn try_for_each_obj_mut<F, Err>(&mut self, mut f: F) -> Result<(), Err>
    where
        F: FnMut(&mut ObjectEntry<E>) -> Result<(), Err>,
    {
        for name in &self.order {
            if let Some(handles) = self.by_name.get(name) {
                for &handle in handles {
                    f(&mut self.entries[handle])?;
                }
            }
        }
        Ok(())
    }
}

impl<E, S> ObjectFileDb<E, S> {
    /// Number of distinct objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ingestion counters
    pub const fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Object names in the order they were first seen
    pub fn insertion_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(AsRef::as_ref)
    }

    /// Names of archives that contributed objects, sorted
    pub fn archive_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_archive.keys().map(String::as_str)
    }

    /// Object occurrences of one archive, in archive order
    pub fn archive_members(&self, archive: &str) -> Option<&[ObjectRecord]> {
        self.by_archive.get(archive).map(Vec::as_slice)
    }

    /// Render the archive listing
    ///
    /// Archives are sorted by name and list their members in archive order
    /// with the version each occurrence resolved to.
    pub fn generate_dgo_listing(&self) -> String {
        let mut result = String::from(";; DGO File Listing\n\n");
        for (archive, records) in &self.by_archive {
            let _ = writeln!(result, "(\"{archive}\"");
            for record in records {
                let _ = writeln!(result, "  {} :version {}", record.name, record.version);
            }
            result.push_str("  )\n\n");
        }
        result
    }

    /// Write the archive listing to `dir/dgo.txt`
    pub fn write_dgo_listing(&self, dir: &Path) -> StoreResult<()> {
        let path = dir.join(LISTING_FILE_NAME);
        std::fs::write(&path, self.generate_dgo_listing())
            .map_err(|source| StoreError::Io { path, source })
    }

    fn add_membership(&mut self, archive: &str, record: ObjectRecord) {
        if let Some(members) = self.by_archive.get_mut(archive) {
            members.push(record);
        } else {
            self.by_archive.insert(archive.to_string(), vec![record]);
        }
    }
}

impl<E, S> fmt::Debug for ObjectFileDb<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFileDb")
            .field("objects", &self.entries.len())
            .field("names", &self.order.len())
            .field("archives", &self.by_archive.len())
            .field("stats", &self.stats)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::matcher::ExactMatcher;
    use dgodb_formats::FormatError;
    use dgodb_formats::dgo::DgoBuilder;
    use pretty_assertions::assert_eq;
    use std::hash::{BuildHasherDefault, Hasher};

    /// Hasher that sends every key to the same bucket
    #[derive(Default)]
    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _bytes: &[u8]) {}
    }

    type ConstantState = BuildHasherDefault<ConstantHasher>;

    fn unique_names<E, S: BuildHasher>(db: &ObjectFileDb<E, S>) -> Vec<String> {
        db.entries().map(|e| e.record().unique_name()).collect()
    }

    #[test]
    fn test_dedup_across_archives() {
        let mut db: ObjectFileDb = ObjectFileDb::new();
        let first = db.insert("a", b"xyz", "GAME.CGO");
        let second = db.insert("a", b"xyz", "COMMON.CGO");

        assert_eq!(first, second);
        assert_eq!(first.version, 0);
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("a", 0).unwrap().reference_count(), 2);
        assert_eq!(db.stats().total_objects, 2);
        assert_eq!(db.stats().unique_objects, 1);
        assert_eq!(db.stats().unique_bytes, 3);
    }

    #[test]
    fn test_versions_per_name() {
        let mut db: ObjectFileDb = ObjectFileDb::new();
        db.insert("foo", b"one", "A.DGO");
        db.insert("foo", b"two", "B.DGO");
        db.insert("foo", b"one", "B.DGO");

        assert_eq!(unique_names(&db), vec!["foo-v0", "foo-v1"]);
        assert_eq!(db.get("foo", 1).unwrap().data(), b"two");
        assert!(db.get("foo", 2).is_none());
        assert!(db.get("bar", 0).is_none());
        assert_eq!(db.variants("foo").count(), 2);
        assert_eq!(db.variants("bar").count(), 0);
    }

    #[test]
    fn test_same_length_different_content() {
        let mut db: ObjectFileDb = ObjectFileDb::new();
        db.insert("a", b"aaaa", "X.DGO");
        let record = db.insert("a", b"bbbb", "X.DGO");
        assert_eq!(record.version, 1);
    }

    #[test]
    fn test_order_is_hasher_independent() {
        let inserts = [
            ("zeta", b"1".as_slice()),
            ("alpha", b"2".as_slice()),
            ("mid", b"3".as_slice()),
            ("alpha", b"4".as_slice()),
            ("zeta", b"1".as_slice()),
            ("beta", b"5".as_slice()),
        ];

        let mut default: ObjectFileDb = ObjectFileDb::new();
        let mut constant: ObjectFileDb<(), ConstantState> = ObjectFileDb::with_hasher(ConstantState::default());
        let mut reseeded: ObjectFileDb<(), RandomState> = ObjectFileDb::with_hasher(RandomState::new());
        for (name, data) in inserts {
            default.insert(name, data, "T.DGO");
            constant.insert(name, data, "T.DGO");
            reseeded.insert(name, data, "T.DGO");
        }

        let expected = vec!["zeta-v0", "alpha-v0", "alpha-v1", "mid-v0", "beta-v0"];
        assert_eq!(unique_names(&default), expected);
        assert_eq!(unique_names(&constant), expected);
        assert_eq!(unique_names(&reseeded), expected);
        assert_eq!(
            constant.insertion_order().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid", "beta"]
        );
    }

    #[test]
    fn test_listing_format() {
        let mut db: ObjectFileDb = ObjectFileDb::new();
        db.insert("b", b"1", "Z.DGO");
        db.insert("a", b"1", "A.DGO");
        db.insert("b", b"2", "A.DGO");

        assert_eq!(
            db.generate_dgo_listing(),
            ";; DGO File Listing\n\n(\"A.DGO\"\n  a :version 0\n  b :version 1\n  )\n\n(\"Z.DGO\"\n  b :version 0\n  )\n\n"
        );
        assert_eq!(db.archive_names().collect::<Vec<_>>(), vec!["A.DGO", "Z.DGO"]);
    }

    #[test]
    fn test_empty_listing() {
        let db: ObjectFileDb = ObjectFileDb::default();
        assert!(db.is_empty());
        assert_eq!(db.generate_dgo_listing(), ";; DGO File Listing\n\n");
    }

    #[test]
    fn test_add_archive_failure_leaves_store_unchanged() {
        let mut db: ObjectFileDb = ObjectFileDb::new();
        let good = DgoBuilder::new("GOOD.DGO")
            .object("a", vec![1; 8])
            .build()
            .unwrap();
        db.add_archive("GOOD.DGO", &good).unwrap();
        let before = *db.stats();

        // Valid first object, truncated second
        let mut bad = DgoBuilder::new("BAD.DGO")
            .object("b", vec![2; 16])
            .object("c", vec![3; 16])
            .build()
            .unwrap();
        bad.truncate(bad.len() - 4);

        let err = db.add_archive("BAD.DGO", &bad).expect_err("truncated");
        assert!(matches!(
            err.format_error(),
            Some(FormatError::TruncatedObject { .. })
        ));
        assert_eq!(*db.stats(), before);
        assert_eq!(db.len(), 1);
        assert!(db.archive_members("BAD.DGO").is_none());
    }

    #[test]
    fn test_exact_matcher() {
        let mut db: ObjectFileDb = ObjectFileDb::new().with_matcher(ExactMatcher);
        db.insert("a", b"same", "X.DGO");
        db.insert("a", b"same", "Y.DGO");
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("a", 0).unwrap().reference_count(), 2);
    }

    #[test]
    fn test_enrichment_traversal() {
        let mut db: ObjectFileDb<Vec<String>> = ObjectFileDb::new();
        db.insert("b", b"1", "X.DGO");
        db.insert("a", b"1", "X.DGO");
        db.insert("b", b"2", "X.DGO");

        let mut counter = 0;
        db.for_each_obj_mut(|entry| {
            let (record, _, notes) = entry.split_mut();
            notes.push(format!("{counter}:{record}"));
            counter += 1;
        });

        let mut seen = Vec::new();
        db.for_each_obj(|entry| seen.extend(entry.enrichment.iter().cloned()));
        assert_eq!(seen, vec!["0:b-v0", "1:b-v1", "2:a-v0"]);

        let result: Result<(), String> = db.try_for_each_obj_mut(|entry| {
            if entry.record().name.as_ref() == "a" {
                return Err("stop".to_string());
            }
            entry.enrichment.clear();
            Ok(())
        });
        assert_eq!(result, Err("stop".to_string()));
        assert!(db.get("b", 0).unwrap().enrichment.is_empty());
        assert!(db.get("b", 1).unwrap().enrichment.is_empty());
        assert_eq!(db.get("a", 0).unwrap().enrichment.len(), 1);
    }
}
