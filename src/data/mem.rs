//! In-memory backend
//!
//! Honors bounds, FILTER and SORT natively and leaves paging and
//! reprojection to the engine. Update and append cursors write straight
//! back to the shared store.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::errors::{DataError, DataResult};
use super::{VectorDataset, Workspace};
use crate::cursor::{ensure_open, sort_features, BoxCursor, Cursor, CursorError, CursorResult, MemCursor, Mode};
use crate::feature::{retype, Feature, Schema};
use crate::geom::{self, Rect};
use crate::query::{Query, FILTER, SORT};

type Store = Arc<RwLock<Vec<Feature>>>;

fn read_store(store: &RwLock<Vec<Feature>>) -> RwLockReadGuard<'_, Vec<Feature>> {
    match store.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_store(store: &RwLock<Vec<Feature>>) -> RwLockWriteGuard<'_, Vec<Feature>> {
    match store.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Brings a feature onto the dataset schema and gives it an id if it has none
fn conform(feature: Feature, schema: &Arc<Schema>) -> Feature {
    let mut feature = if Arc::ptr_eq(feature.schema(), schema) || **feature.schema() == **schema {
        feature.with_schema(schema.clone())
    } else {
        retype(&feature, schema.clone())
    };
    if feature.id().is_empty() {
        feature.set_id(Uuid::new_v4().to_string());
    }
    feature
}

/// A layer held in memory. Clones share the same store.
#[derive(Debug, Clone)]
pub struct MemDataset {
    schema: Arc<Schema>,
    store: Store,
}

impl MemDataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            store: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_features<I: IntoIterator<Item = Feature>>(self, features: I) -> Self {
        for feature in features {
            self.add(feature);
        }
        self
    }

    /// Appends a feature, conformed to the layer schema
    pub fn add(&self, feature: Feature) {
        let feature = conform(feature, &self.schema);
        write_store(&self.store).push(feature);
    }

    pub fn len(&self) -> usize {
        read_store(&self.store).len()
    }

    pub fn is_empty(&self) -> bool {
        read_store(&self.store).is_empty()
    }

    /// Copy of the stored features, in storage order
    pub fn snapshot(&self) -> Vec<Feature> {
        read_store(&self.store).clone()
    }

    /// Features within the query bounds that pass its filter. Consumes
    /// FILTER and SORT.
    fn select(&self, query: &mut Query) -> Vec<Feature> {
        let filter = query.take(&FILTER);
        let bounds = query.bounds();

        let mut selected: Vec<Feature> = read_store(&self.store)
            .iter()
            .filter(|f| match bounds {
                Some(b) => f
                    .geometry()
                    .and_then(geom::envelope)
                    .is_some_and(|env| geom::envelopes_intersect(&env, &b)),
                None => true,
            })
            .filter(|f| filter.as_ref().map_or(true, |flt| flt.matches(*f)))
            .cloned()
            .collect();

        if let Some(specs) = query.take(&SORT) {
            sort_features(&mut selected, &specs);
        }
        selected
    }
}

impl VectorDataset for MemDataset {
    fn name(&self) -> &str {
        self.schema.name()
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn bounds(&self) -> DataResult<Option<Rect<f64>>> {
        let store = read_store(&self.store);
        let envelope = store
            .iter()
            .filter_map(|f| f.geometry().and_then(geom::envelope))
            .reduce(|a, b| {
                geom::rect(
                    a.min().x.min(b.min().x),
                    a.min().y.min(b.min().y),
                    a.max().x.max(b.max().x),
                    a.max().y.max(b.max().y),
                )
            });
        Ok(envelope)
    }

    fn cursor(&self, query: &mut Query) -> DataResult<BoxCursor<Feature>> {
        match query.mode() {
            Mode::Read => {
                let mut features = self.select(query);
                if !query.fields().is_empty() {
                    let narrow = Arc::new(self.schema.retype(query.fields()));
                    features = features.iter().map(|f| retype(f, narrow.clone())).collect();
                }
                Ok(Box::new(MemCursor::new(features)))
            }
            Mode::Update => {
                let pending = self.select(query);
                Ok(Box::new(WriteCursor::new(Mode::Update, self, pending)))
            }
            Mode::Append => Ok(Box::new(WriteCursor::new(Mode::Append, self, Vec::new()))),
        }
    }
}

/// Update and append cursor over a [`MemDataset`]
struct WriteCursor {
    mode: Mode,
    schema: Arc<Schema>,
    store: Store,
    pending: VecDeque<Feature>,
    closed: bool,
}

impl WriteCursor {
    fn new(mode: Mode, dataset: &MemDataset, pending: Vec<Feature>) -> Self {
        Self {
            mode,
            schema: dataset.schema.clone(),
            store: dataset.store.clone(),
            pending: pending.into(),
            closed: false,
        }
    }
}

impl Cursor for WriteCursor {
    type Item = Feature;

    fn mode(&self) -> Mode {
        self.mode
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        Ok(!self.pending.is_empty())
    }

    fn next(&mut self) -> CursorResult<Option<Feature>> {
        ensure_open(self.closed)?;
        Ok(self.pending.pop_front())
    }

    fn write(&mut self, item: Feature) -> CursorResult<()> {
        ensure_open(self.closed)?;
        let item = conform(item, &self.schema);
        let mut store = write_store(&self.store);
        match self.mode {
            Mode::Append => {
                store.push(item);
                Ok(())
            }
            Mode::Update => match store.iter_mut().find(|f| f.id() == item.id()) {
                Some(slot) => {
                    *slot = item;
                    Ok(())
                }
                None => Err(CursorError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no feature with id {}", item.id()),
                ))),
            },
            Mode::Read => Err(CursorError::unsupported("write", self.mode)),
        }
    }

    fn remove(&mut self, item: &Feature) -> CursorResult<()> {
        ensure_open(self.closed)?;
        if !self.mode.allows_remove() {
            return Err(CursorError::unsupported("remove", self.mode));
        }
        write_store(&self.store).retain(|f| f.id() != item.id());
        Ok(())
    }

    fn close(&mut self) -> CursorResult<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}

/// Layers held in memory, in creation order
#[derive(Debug, Default)]
pub struct MemWorkspace {
    layers: RwLock<Vec<(String, Arc<MemDataset>)>>,
}

impl MemWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_layers(&self) -> RwLockWriteGuard<'_, Vec<(String, Arc<MemDataset>)>> {
        match self.layers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stores `dataset` under `name`, replacing a layer of the same name
    pub fn put(&self, name: impl Into<String>, dataset: MemDataset) -> Arc<MemDataset> {
        let name = name.into();
        let dataset = Arc::new(dataset);
        let mut layers = self.write_layers();
        match layers.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = dataset.clone(),
            None => layers.push((name, dataset.clone())),
        }
        dataset
    }

    /// The concrete dataset behind a layer
    pub fn dataset(&self, name: &str) -> Option<Arc<MemDataset>> {
        let layers = match self.layers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        layers.iter().find(|(n, _)| n == name).map(|(_, d)| d.clone())
    }
}

impl Workspace for MemWorkspace {
    fn layers(&self) -> Vec<String> {
        match self.layers.read() {
            Ok(guard) => guard.iter().map(|(n, _)| n.clone()).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|(n, _)| n.clone()).collect(),
        }
    }

    fn get(&self, layer: &str) -> DataResult<Arc<dyn VectorDataset>> {
        match self.dataset(layer) {
            Some(dataset) => Ok(dataset),
            None => Err(DataError::LayerNotFound(layer.to_string())),
        }
    }

    fn create(&self, schema: Schema) -> DataResult<Arc<dyn VectorDataset>> {
        let name = schema.name().to_string();
        let mut layers = self.write_layers();
        if layers.iter().any(|(n, _)| *n == name) {
            return Err(DataError::LayerExists(name));
        }
        let dataset = Arc::new(MemDataset::new(schema));
        layers.push((name, dataset.clone()));
        Ok(dataset)
    }

    fn dispose(&self) {
        self.write_layers().clear();
    }
}
