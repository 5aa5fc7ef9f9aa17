// Gallery Controller
//
// Owns the live, newest-first list of records and keeps the display and
// the persistence store in step with it. Display events arrive through a
// single entry point instead of callbacks held by individual cells.

use tracing::{debug, info, warn};

use crate::record::{ImageRecord, RecordFactory, RecordId};
use crate::store::{Backend, PersistenceStore, StoreError};

pub mod layout;

use layout::{fit_within, Size};

/// Where an acquired image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Camera,
    Library,
}

/// A decoded image handed over by the acquisition collaborator.
#[derive(Debug, Clone)]
pub struct AcquiredImage<I> {
    pub image: I,
    pub width: u32,
    pub height: u32,
    pub source: ImageSource,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("image encoding failed: {0}")]
pub struct EncodeError(pub String);

/// Re-encodes a decoded image at target dimensions.
///
/// Pure: no persistence side effects.
pub trait ImageEncoder<I> {
    fn encode(&self, image: &I, width: u32, height: u32, quality: u8)
        -> Result<Vec<u8>, EncodeError>;
}

/// User-visible problems the display should surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoadFailed { reason: String },
    SaveFailed { reason: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::LoadFailed { reason } => write!(f, "could not load saved images: {reason}"),
            Notice::SaveFailed { reason } => write!(f, "could not save images: {reason}"),
        }
    }
}

/// Display collaborator.
///
/// Receives incremental notifications; only `reload` implies a full redraw.
pub trait GalleryView {
    fn reload(&mut self, records: &[ImageRecord]);
    fn insert_at(&mut self, index: usize, record: &ImageRecord);
    fn replace_at(&mut self, index: usize, record: &ImageRecord);
    fn remove_at(&mut self, index: usize);
    fn present_actions(&mut self, record: &ImageRecord);
    fn show_notice(&mut self, notice: &Notice);
}

/// Events emitted by the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    LongPressed { record_id: RecordId },
    DeleteRequested { record_id: RecordId },
}

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("record `{0}` is not in the gallery")]
    NotFound(RecordId),

    /// The id source handed out an id the gallery already holds.
    #[error("record `{0}` is already in the gallery")]
    DuplicateId(RecordId),

    /// The in-memory change was kept; persisting it failed.
    #[error("change kept in memory but not saved: {0}")]
    Persist(#[source] StoreError),
}

/// Encoding parameters applied to every acquired image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GallerySettings {
    pub bounds: Size,
    /// JPEG quality, 1..=100.
    pub quality: u8,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            bounds: Size::new(390, 844),
            quality: 100,
        }
    }
}

pub struct Gallery<B: Backend, V: GalleryView> {
    store: PersistenceStore<B>,
    view: V,
    factory: RecordFactory,
    settings: GallerySettings,
    records: Vec<ImageRecord>,
    /// Set when the store may not match `records`. The next mutation then
    /// writes the full list instead of an incremental change.
    dirty: bool,
}

impl<B: Backend, V: GalleryView> Gallery<B, V> {
    /// Load saved records and render them.
    ///
    /// A load failure starts an empty gallery and shows a notice. The next
    /// successful save replaces whatever the store held.
    pub fn open(
        mut store: PersistenceStore<B>,
        mut view: V,
        factory: RecordFactory,
        settings: GallerySettings,
    ) -> Self {
        let (records, dirty) = match store.load_all() {
            Ok(records) => (records, false),
            Err(e) => {
                warn!(error = %e, "starting with an empty gallery");
                view.show_notice(&Notice::LoadFailed {
                    reason: e.to_string(),
                });
                (Vec::new(), true)
            }
        };

        view.reload(&records);

        Self {
            store,
            view,
            factory,
            settings,
            records,
            dirty,
        }
    }

    /// Newest first.
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, id: &RecordId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn store(&self) -> &PersistenceStore<B> {
        &self.store
    }

    /// Encode `acquired`, insert it at the head and persist it.
    ///
    /// On `GalleryError::Persist` the record is still in the gallery.
    pub fn add_image<I, E>(
        &mut self,
        encoder: &E,
        acquired: &AcquiredImage<I>,
    ) -> Result<RecordId, GalleryError>
    where
        E: ImageEncoder<I>,
    {
        let payload = self.encode(encoder, acquired)?;
        let record = self.factory.make(payload);
        let id = record.id().clone();
        if self.get(&id).is_some() {
            return Err(GalleryError::DuplicateId(id));
        }

        self.records.insert(0, record.clone());
        self.view.insert_at(0, &record);
        info!(%id, source = ?acquired.source, "image added");

        self.persist(|store| store.create(record))?;
        Ok(id)
    }

    /// Re-encode `acquired` as the new content of `id`, keeping its position.
    pub fn replace_image<I, E>(
        &mut self,
        id: &RecordId,
        encoder: &E,
        acquired: &AcquiredImage<I>,
    ) -> Result<(), GalleryError>
    where
        E: ImageEncoder<I>,
    {
        let index = self.index_of(id)?;
        let payload = self.encode(encoder, acquired)?;
        let record = self.factory.replace(id.clone(), payload);

        self.records[index] = record.clone();
        self.view.replace_at(index, &record);
        info!(%id, "image replaced");

        self.persist(|store| store.update(id, record))
    }

    /// Remove `id` from the gallery and the store.
    pub fn remove(&mut self, id: &RecordId) -> Result<ImageRecord, GalleryError> {
        let index = self.index_of(id)?;

        let removed = self.records.remove(index);
        self.view.remove_at(index);
        info!(%id, "image removed");

        self.persist(|store| store.delete(id).map(|_| ()))?;
        Ok(removed)
    }

    /// Single entry point for display events.
    pub fn handle_event(&mut self, event: GalleryEvent) -> Result<(), GalleryError> {
        match event {
            GalleryEvent::LongPressed { record_id } => {
                let index = self.index_of(&record_id)?;
                debug!(id = %record_id, "long press");
                self.view.present_actions(&self.records[index]);
                Ok(())
            }
            GalleryEvent::DeleteRequested { record_id } => self.remove(&record_id).map(|_| ()),
        }
    }

    fn index_of(&self, id: &RecordId) -> Result<usize, GalleryError> {
        self.records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| GalleryError::NotFound(id.clone()))
    }

    fn encode<I, E>(&self, encoder: &E, acquired: &AcquiredImage<I>) -> Result<Vec<u8>, GalleryError>
    where
        E: ImageEncoder<I>,
    {
        let original = Size::new(acquired.width, acquired.height);
        let target = fit_within(original, self.settings.bounds).ok_or(GalleryError::EmptyImage {
            width: acquired.width,
            height: acquired.height,
        })?;

        debug!(?original, ?target, "resizing image");
        Ok(encoder.encode(&acquired.image, target.width, target.height, self.settings.quality)?)
    }

    fn persist(
        &mut self,
        incremental: impl FnOnce(&mut PersistenceStore<B>) -> Result<(), StoreError>,
    ) -> Result<(), GalleryError> {
        let result = if self.dirty {
            self.store.save_all(&self.records)
        } else {
            incremental(&mut self.store)
        };

        match result {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "gallery change not persisted");
                self.dirty = true;
                self.view.show_notice(&Notice::SaveFailed {
                    reason: e.to_string(),
                });
                Err(GalleryError::Persist(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FixedClock, SequentialIds};
    use crate::store::MemoryBackend;
    use chrono::{TimeZone, Utc};

    #[derive(Debug, Default)]
    struct RecordingView {
        calls: Vec<String>,
        notices: Vec<Notice>,
    }

    impl GalleryView for RecordingView {
        fn reload(&mut self, records: &[ImageRecord]) {
            self.calls.push(format!("reload:{}", records.len()));
        }

        fn insert_at(&mut self, index: usize, record: &ImageRecord) {
            self.calls.push(format!("insert:{index}:{}", record.id()));
        }

        fn replace_at(&mut self, index: usize, record: &ImageRecord) {
            self.calls.push(format!("replace:{index}:{}", record.id()));
        }

        fn remove_at(&mut self, index: usize) {
            self.calls.push(format!("remove:{index}"));
        }

        fn present_actions(&mut self, record: &ImageRecord) {
            self.calls.push(format!("actions:{}", record.id()));
        }

        fn show_notice(&mut self, notice: &Notice) {
            self.notices.push(notice.clone());
        }
    }

    /// "Image" is a byte; output records the requested geometry.
    struct FakeEncoder;

    impl ImageEncoder<u8> for FakeEncoder {
        fn encode(
            &self,
            image: &u8,
            width: u32,
            height: u32,
            quality: u8,
        ) -> Result<Vec<u8>, EncodeError> {
            Ok(vec![*image, width as u8, height as u8, quality])
        }
    }

    struct BrokenEncoder;

    impl ImageEncoder<u8> for BrokenEncoder {
        fn encode(&self, _: &u8, _: u32, _: u32, _: u8) -> Result<Vec<u8>, EncodeError> {
            Err(EncodeError("no jpeg representation".into()))
        }
    }

    fn acquired(tag: u8) -> AcquiredImage<u8> {
        AcquiredImage {
            image: tag,
            width: 200,
            height: 100,
            source: ImageSource::Library,
        }
    }

    fn settings() -> GallerySettings {
        GallerySettings {
            bounds: Size::new(100, 100),
            quality: 90,
        }
    }

    fn gallery(backend: &MemoryBackend) -> Gallery<MemoryBackend, RecordingView> {
        let at = Utc.with_ymd_and_hms(2020, 1, 20, 15, 0, 0).unwrap();
        Gallery::open(
            PersistenceStore::with_backend(backend.clone()),
            RecordingView::default(),
            RecordFactory::new(SequentialIds::new("g"), FixedClock(at)),
            settings(),
        )
    }

    #[test]
    fn added_images_are_resized_inserted_at_head_and_saved() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);

        let first = g.add_image(&FakeEncoder, &acquired(1)).unwrap();
        let second = g.add_image(&FakeEncoder, &acquired(2)).unwrap();

        assert_eq!(g.records()[0].id(), &second);
        assert_eq!(g.records()[1].id(), &first);
        assert_eq!(g.records()[0].payload(), &[2, 100, 50, 90]);
        assert_eq!(
            g.view().calls,
            ["reload:0", "insert:0:g-1", "insert:0:g-2"]
        );

        let mut store = PersistenceStore::with_backend(backend);
        assert_eq!(store.load_all().unwrap(), g.records());
    }

    #[test]
    fn reopening_restores_saved_order() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        g.add_image(&FakeEncoder, &acquired(1)).unwrap();
        g.add_image(&FakeEncoder, &acquired(2)).unwrap();
        let saved = g.records().to_vec();

        let reopened = gallery(&backend);

        assert_eq!(reopened.records(), saved.as_slice());
        assert_eq!(reopened.view().calls, ["reload:2"]);
    }

    #[test]
    fn corrupt_store_starts_empty_with_notice() {
        let backend = MemoryBackend::new();
        backend.set_raw(b"garbage".to_vec());

        let mut g = gallery(&backend);

        assert!(g.records().is_empty());
        assert!(g.is_dirty());
        assert!(matches!(g.view().notices[..], [Notice::LoadFailed { .. }]));

        g.add_image(&FakeEncoder, &acquired(1)).unwrap();
        assert!(!g.is_dirty());
        let mut store = PersistenceStore::with_backend(backend);
        assert_eq!(store.load_all().unwrap(), g.records());
    }

    #[test]
    fn save_failure_keeps_memory_and_retries_full_state() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        g.add_image(&FakeEncoder, &acquired(1)).unwrap();

        backend.fail_writes(true);
        let err = g.add_image(&FakeEncoder, &acquired(2)).unwrap_err();
        assert!(matches!(err, GalleryError::Persist(StoreError::Io { .. })));
        assert_eq!(g.records().len(), 2);
        assert!(g.is_dirty());
        assert!(matches!(g.view().notices[..], [Notice::SaveFailed { .. }]));

        backend.fail_writes(false);
        g.add_image(&FakeEncoder, &acquired(3)).unwrap();

        let mut store = PersistenceStore::with_backend(backend);
        let persisted = store.load_all().unwrap();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted, g.records());
    }

    #[test]
    fn repeated_id_is_rejected_before_touching_memory() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        let first = g.add_image(&FakeEncoder, &acquired(1)).unwrap();

        // Fresh SequentialIds starts at g-1 again.
        let mut reopened = gallery(&backend);
        let err = reopened.add_image(&FakeEncoder, &acquired(2)).unwrap_err();

        assert!(matches!(err, GalleryError::DuplicateId(ref id) if id == &first));
        assert_eq!(reopened.records().len(), 1);
        assert_eq!(reopened.view().calls, ["reload:1"]);
        assert!(!reopened.is_dirty());
        assert_eq!(backend.writes(), 1);

        let second = reopened.add_image(&FakeEncoder, &acquired(3)).unwrap();
        assert_eq!(second.as_str(), "g-2");
        let mut store = PersistenceStore::with_backend(backend);
        assert_eq!(store.load_all().unwrap(), reopened.records());
    }

    #[test]
    fn encode_failure_changes_nothing() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);

        let err = g.add_image(&BrokenEncoder, &acquired(1)).unwrap_err();

        assert!(matches!(err, GalleryError::Encode(_)));
        assert!(g.records().is_empty());
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn empty_images_are_rejected() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        let mut image = acquired(1);
        image.height = 0;

        let err = g.add_image(&FakeEncoder, &image).unwrap_err();

        assert!(matches!(err, GalleryError::EmptyImage { width: 200, height: 0 }));
    }

    #[test]
    fn delete_event_removes_from_view_and_store() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        let first = g.add_image(&FakeEncoder, &acquired(1)).unwrap();
        let second = g.add_image(&FakeEncoder, &acquired(2)).unwrap();

        g.handle_event(GalleryEvent::DeleteRequested {
            record_id: first.clone(),
        })
        .unwrap();

        assert_eq!(g.records().len(), 1);
        assert_eq!(g.records()[0].id(), &second);
        assert_eq!(g.view().calls.last().unwrap(), "remove:1");
        let mut store = PersistenceStore::with_backend(backend);
        assert_eq!(store.load_all().unwrap(), g.records());
    }

    #[test]
    fn long_press_presents_actions_for_that_record() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        let id = g.add_image(&FakeEncoder, &acquired(1)).unwrap();

        g.handle_event(GalleryEvent::LongPressed {
            record_id: id.clone(),
        })
        .unwrap();

        assert_eq!(g.view().calls.last().unwrap(), &format!("actions:{id}"));
        assert_eq!(backend.writes(), 1);
    }

    #[test]
    fn events_for_unknown_records_are_not_found() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);

        let err = g
            .handle_event(GalleryEvent::DeleteRequested {
                record_id: RecordId::from("nope"),
            })
            .unwrap_err();

        assert!(matches!(err, GalleryError::NotFound(_)));
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn replace_keeps_position_and_id() {
        let backend = MemoryBackend::new();
        let mut g = gallery(&backend);
        let older = g.add_image(&FakeEncoder, &acquired(1)).unwrap();
        g.add_image(&FakeEncoder, &acquired(2)).unwrap();

        g.replace_image(&older, &FakeEncoder, &acquired(9)).unwrap();

        let replaced = g.get(&older).unwrap();
        assert_eq!(replaced.payload()[0], 9);
        assert_eq!(g.records()[1].id(), &older);
        assert_eq!(g.view().calls.last().unwrap(), &format!("replace:1:{older}"));
        let mut store = PersistenceStore::with_backend(backend);
        assert_eq!(store.load_all().unwrap(), g.records());
    }
}
