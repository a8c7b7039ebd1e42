//! Background mesh loading.
//!
//! A single worker thread resolves and parses meshes. Requests go out over one channel and
//! finished buffers come back over another, which the render thread drains once per iteration.
//! Buffers are immutable once built and shared through [`Arc`], so the render thread never locks
//! anything while drawing.

use std::{
    sync::{Arc, mpsc},
    thread,
};

use fxhash::{FxHashMap, FxHashSet};

use super::{MeshBuffer, MeshSource, parse_obj};
use crate::error::MeshLoadError;

/// Resolves `name` through `source` and parses it. This is the synchronous core of the loader.
pub fn load_mesh(source: &dyn MeshSource, name: &str) -> Result<MeshBuffer, MeshLoadError> {
    let text = source.resolve(name)?;
    parse_obj(&text)
}

enum LoadTask {
    Load { name: String },
}

/// A finished load delivered back to the render thread.
#[derive(Debug)]
pub struct LoadedMesh {
    pub name: String,
    pub result: Result<Arc<MeshBuffer>, MeshLoadError>,
}

/// Outcome of [`MeshLoader::request`].
#[derive(Debug, Clone)]
pub enum MeshRequest {
    /// The mesh was loaded before; here it is.
    Ready(Arc<MeshBuffer>),
    /// The mesh is being loaded; it will show up in [`MeshLoader::poll`].
    Pending,
}

/// Owns the mesh worker and the per-session cache of finished buffers.
pub struct MeshLoader {
    source: Arc<dyn MeshSource>,
    cache: FxHashMap<String, Arc<MeshBuffer>>,
    in_flight: FxHashSet<String>,
    tasks: Option<mpsc::Sender<LoadTask>>,
    results: mpsc::Receiver<LoadedMesh>,
    dispatched: usize,
}

impl MeshLoader {
    /// Starts the worker thread.
    pub fn spawn(source: Arc<dyn MeshSource>) -> Self {
        let (task_sender, task_receiver) = mpsc::channel::<LoadTask>();
        let (result_sender, result_receiver) = mpsc::channel::<LoadedMesh>();

        let worker_source = Arc::clone(&source);
        let spawned = thread::Builder::new()
            .name("mesh-loader".to_string())
            .spawn(move || {
                while let Ok(task) = task_receiver.recv() {
                    match task {
                        LoadTask::Load { name } => {
                            let result = load_mesh(worker_source.as_ref(), &name).map(Arc::new);
                            // The receiver is gone once the pipeline is torn down; the late
                            // result is simply dropped.
                            if result_sender.send(LoadedMesh { name, result }).is_err() {
                                break;
                            }
                        }
                    }
                }
            });

        let tasks = match spawned {
            Ok(_) => Some(task_sender),
            Err(e) => {
                log::error!("Could not start mesh worker: {e}");
                None
            }
        };

        Self {
            source,
            cache: FxHashMap::default(),
            in_flight: FxHashSet::default(),
            tasks,
            results: result_receiver,
            dispatched: 0,
        }
    }

    /// Requests `name`. Cached meshes are returned immediately without touching the worker;
    /// a mesh already in flight is not dispatched a second time.
    pub fn request(&mut self, name: &str) -> Result<MeshRequest, MeshLoadError> {
        if let Some(buffer) = self.cache.get(name) {
            log::debug!("Mesh \"{name}\" served from cache");
            return Ok(MeshRequest::Ready(Arc::clone(buffer)));
        }
        if self.in_flight.contains(name) {
            return Ok(MeshRequest::Pending);
        }

        let tasks = self.tasks.as_ref().ok_or(MeshLoadError::WorkerUnavailable)?;
        tasks
            .send(LoadTask::Load {
                name: name.to_string(),
            })
            .map_err(|_| MeshLoadError::WorkerUnavailable)?;

        self.in_flight.insert(name.to_string());
        self.dispatched += 1;
        log::info!("Loading mesh \"{name}\"");
        Ok(MeshRequest::Pending)
    }

    /// Loads `name` on the calling thread, going through the cache.
    pub fn load_blocking(&mut self, name: &str) -> Result<Arc<MeshBuffer>, MeshLoadError> {
        if let Some(buffer) = self.cache.get(name) {
            return Ok(Arc::clone(buffer));
        }
        let buffer = Arc::new(load_mesh(self.source.as_ref(), name)?);
        self.cache.insert(name.to_string(), Arc::clone(&buffer));
        Ok(buffer)
    }

    /// Drains every load that finished since the last call. Successful buffers are cached.
    pub fn poll(&mut self) -> Vec<LoadedMesh> {
        let mut finished = Vec::new();
        while let Ok(loaded) = self.results.try_recv() {
            self.in_flight.remove(&loaded.name);
            match &loaded.result {
                Ok(buffer) => {
                    self.cache.insert(loaded.name.clone(), Arc::clone(buffer));
                }
                Err(e) => log::warn!("Mesh \"{}\" failed to load: {e}", loaded.name),
            }
            finished.push(loaded);
        }
        finished
    }

    pub fn cached(&self, name: &str) -> Option<Arc<MeshBuffer>> {
        self.cache.get(name).cloned()
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.in_flight.contains(name)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// How many loads were handed to the worker in this session.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    };

    use super::*;
    use crate::mesh::BuiltinMeshes;

    struct CountingSource {
        resolved: Arc<AtomicUsize>,
    }

    impl MeshSource for CountingSource {
        fn resolve(&self, name: &str) -> Result<String, MeshLoadError> {
            self.resolved.fetch_add(1, Ordering::SeqCst);
            BuiltinMeshes.resolve(name)
        }

        fn contains(&self, name: &str) -> bool {
            BuiltinMeshes.contains(name)
        }
    }

    fn wait_for(loader: &mut MeshLoader) -> Vec<LoadedMesh> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let finished = loader.poll();
            if !finished.is_empty() {
                return finished;
            }
            assert!(Instant::now() < deadline, "mesh worker timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_second_request_uses_cache() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let mut loader = MeshLoader::spawn(Arc::new(CountingSource {
            resolved: Arc::clone(&resolved),
        }));

        assert!(matches!(loader.request("Cube"), Ok(MeshRequest::Pending)));
        let finished = wait_for(&mut loader);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name, "Cube");
        let first = finished[0].result.clone().unwrap();

        match loader.request("Cube") {
            Ok(MeshRequest::Ready(buffer)) => assert!(Arc::ptr_eq(&buffer, &first)),
            other => panic!("expected cached buffer, got {other:?}"),
        }
        assert_eq!(loader.dispatch_count(), 1);
        assert_eq!(resolved.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_in_flight_request_is_not_dispatched_twice() {
        let mut loader = MeshLoader::spawn(Arc::new(BuiltinMeshes));
        assert!(matches!(loader.request("Sphere"), Ok(MeshRequest::Pending)));
        assert!(matches!(loader.request("Sphere"), Ok(MeshRequest::Pending)));
        assert_eq!(loader.dispatch_count(), 1);
        assert!(loader.is_loading("Sphere"));

        wait_for(&mut loader);
        assert!(!loader.is_loading("Sphere"));
        assert!(loader.cached("Sphere").is_some());
    }

    #[test]
    fn test_failed_load_is_reported_and_not_cached() {
        let mut loader = MeshLoader::spawn(Arc::new(BuiltinMeshes));
        loader.request("Teapot").unwrap();
        let finished = wait_for(&mut loader);
        assert!(matches!(
            finished[0].result,
            Err(MeshLoadError::UnknownMesh(_))
        ));
        assert!(loader.cached("Teapot").is_none());
    }

    #[test]
    fn test_dropping_loader_with_load_in_flight() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let source: Arc<dyn MeshSource> = Arc::new(CountingSource {
            resolved: Arc::clone(&resolved),
        });
        let mut loader = MeshLoader::spawn(Arc::clone(&source));
        assert!(matches!(loader.request("Torus"), Ok(MeshRequest::Pending)));
        drop(loader);

        // The worker exits once the loader is gone, releasing its handle on the source.
        let deadline = Instant::now() + Duration::from_secs(10);
        while Arc::strong_count(&source) > 1 {
            assert!(Instant::now() < deadline, "mesh worker did not exit");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(resolved.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_names_differing_in_case_are_separate_requests() {
        let mut loader = MeshLoader::spawn(Arc::new(BuiltinMeshes));
        loader.request("cube").unwrap();
        let finished = wait_for(&mut loader);
        assert!(matches!(
            finished[0].result,
            Err(MeshLoadError::UnknownMesh(_))
        ));
        assert!(loader.cached("cube").is_none());

        loader.request("Cube").unwrap();
        assert!(wait_for(&mut loader)[0].result.is_ok());
        assert!(loader.cached("cube").is_none());
        assert!(loader.cached("Cube").is_some());
    }

    #[test]
    fn test_blocking_load_fills_cache() {
        let mut loader = MeshLoader::spawn(Arc::new(BuiltinMeshes));
        let plane = loader.load_blocking("Plane").unwrap();
        assert_eq!(plane.triangle_count(), 2);
        assert!(matches!(loader.request("Plane"), Ok(MeshRequest::Ready(_))));
        assert_eq!(loader.dispatch_count(), 0);
    }
}
