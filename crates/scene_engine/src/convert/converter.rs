//! Linking, merging and freeing libraries

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::Level;

use super::{AssetSource, LibLoadError, LibLoadStatus, LibraryGroup, LoadOptions};
use crate::config::SceneConfig;
use crate::foundation::handles::{AssetId, ConverterId, MeshId, ObjectId};
use crate::foundation::task_pool::TaskPool;
use crate::render::Mesh;
use crate::scene::{Action, GameObject, ListKind, Scene};

/// Share of an asynchronous load spent converting; the merge accounts for the rest
const CONVERSION_SHARE: f32 = 0.9;

/// Scenes converted on the loader pool, waiting for the main thread
struct PendingMerge {
    status: Arc<LibLoadStatus>,
    converted: Vec<Scene>,
}

fn lock_queue(queue: &Mutex<Vec<PendingMerge>>) -> MutexGuard<'_, Vec<PendingMerge>> {
    queue.lock().unwrap_or_else(|poisoned| {
        log::warn!("Merge queue was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

fn convert_scene(
    source: &dyn AssetSource,
    path: &str,
    name: &str,
    config: &SceneConfig,
    options: LoadOptions,
    converter: ConverterId,
) -> Option<Scene> {
    let Some(mut scene) = source.convert_scene(path, name, config, options) else {
        log::warn!("Scene '{}' of library '{}' could not be converted", name, path);
        return None;
    };
    scene.set_converter(Some(converter));
    Some(scene)
}

fn detail_level(options: LoadOptions) -> Level {
    if options.contains(LoadOptions::VERBOSE) {
        Level::Info
    } else {
        Level::Debug
    }
}

/// Everything a library put into the scenes, so freeing can take it out
#[derive(Debug, Default)]
struct LibraryContent {
    assets: BTreeSet<AssetId>,
    meshes: BTreeMap<String, MeshId>,
    actions: BTreeSet<String>,
    scripts: Vec<String>,
}

impl LibraryContent {
    fn record_scene(&mut self, scene: &Scene) {
        let objects = scene.objects();
        self.assets
            .extend(objects.ids().filter_map(|id| objects.get(id).and_then(GameObject::asset)));
        self.assets
            .extend(scene.assets().materials().filter_map(|material| material.asset));
        for mesh in scene.registry().meshes() {
            self.record_mesh(mesh);
        }
        for action in scene.registry().actions() {
            self.record_action(action);
        }
    }

    fn record_mesh(&mut self, mesh: &Mesh) {
        self.meshes.insert(mesh.name.clone(), mesh.id);
        self.assets.extend(mesh.asset);
    }

    fn record_action(&mut self, action: &Action) {
        self.actions.insert(action.name.clone());
        self.assets.extend(action.asset);
    }
}

struct Library {
    status: Arc<LibLoadStatus>,
    content: LibraryContent,
}

/// Links libraries from an [`AssetSource`] into live scenes.
///
/// Every scene the converter builds carries its [`ConverterId`], and only
/// scenes sharing it can be merged. Meshes are never shared between scenes:
/// each converted scene owns what it converted.
pub struct SceneConverter {
    id: ConverterId,
    source: Arc<dyn AssetSource>,
    scene_config: SceneConfig,
    loader: TaskPool,
    libraries: BTreeMap<String, Library>,
    merge_queue: Arc<Mutex<Vec<PendingMerge>>>,
}

impl SceneConverter {
    /// Create a converter with `loader_workers` background threads
    pub fn new(source: Arc<dyn AssetSource>, scene_config: SceneConfig, loader_workers: usize) -> Self {
        Self {
            id: ConverterId::next(),
            source,
            scene_config,
            loader: TaskPool::new("loader", loader_workers),
            libraries: BTreeMap::new(),
            merge_queue: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Conversion context shared by every scene this converter builds
    pub fn id(&self) -> ConverterId {
        self.id
    }

    /// Settings given to every converted scene
    pub fn scene_config(&self) -> &SceneConfig {
        &self.scene_config
    }

    /// Create an empty scene that library content can be merged into
    pub fn create_scene(&self, name: impl Into<String>) -> Scene {
        let mut scene = Scene::new(name, self.scene_config.clone());
        scene.set_converter(Some(self.id));
        scene
    }

    /// Convert one scene of a library without linking it
    pub fn convert_scene(&self, path: &str, name: &str, options: LoadOptions) -> Option<Scene> {
        convert_scene(self.source.as_ref(), path, name, &self.scene_config, options, self.id)
    }

    /// Link `group` data of the library at `path` into `target`.
    ///
    /// Meshes and actions are registered in `target` right away. Scenes are
    /// converted and merged immediately, or with [`LoadOptions::ASYNC`]
    /// converted on the loader pool and merged by a later
    /// [`merge_async_loads`](Self::merge_async_loads); the returned status
    /// finishes once that merge has happened.
    pub fn link_library(
        &mut self,
        path: &str,
        group: &str,
        target: &mut Scene,
        options: LoadOptions,
    ) -> Result<Arc<LibLoadStatus>, LibLoadError> {
        let group: LibraryGroup = group.parse()?;
        if self.libraries.contains_key(path) {
            return Err(LibLoadError::AlreadyOpen(path.to_string()));
        }
        if !self.source.can_open(path) {
            return Err(LibLoadError::CouldNotOpen(path.to_string()));
        }

        let status = Arc::new(LibLoadStatus::new(path, target.id()));
        let level = detail_level(options);
        let mut content = LibraryContent::default();
        let deferred = group == LibraryGroup::Scene && options.contains(LoadOptions::ASYNC);

        match group {
            LibraryGroup::Mesh => {
                for mesh in self.source.meshes(path) {
                    log::log!(level, "MeshName: {}", mesh.name);
                    content.record_mesh(&mesh);
                    target.add_mesh(mesh);
                }
            }
            LibraryGroup::Action => self.register_actions(path, target, &mut content, level),
            LibraryGroup::Scene => {
                let names = self.source.scene_names(path);
                for name in &names {
                    log::log!(level, "SceneName: {}", name);
                }
                if deferred {
                    self.convert_async(path, names, options, Arc::clone(&status));
                } else {
                    for name in &names {
                        let Some(scene) = self.convert_scene(path, name, options) else {
                            continue;
                        };
                        content.record_scene(&scene);
                        if let Err(err) = target.merge_scene(scene) {
                            log::error!("Library '{}': {}", path, err);
                        }
                    }
                }
                if options.contains(LoadOptions::LOAD_SCRIPTS) {
                    content.scripts = self.source.scripts(path);
                    log::log!(level, "Library '{}' provides {} script modules", path, content.scripts.len());
                }
                if options.contains(LoadOptions::LOAD_ACTIONS) {
                    self.register_actions(path, target, &mut content, level);
                }
            }
        }

        if !deferred {
            status.finish();
        }
        log::info!(
            "Linked {} data of library '{}' into scene '{}'{}",
            group,
            path,
            target.name(),
            if deferred { " (converting in background)" } else { "" }
        );

        self.libraries.insert(
            path.to_string(),
            Library {
                status: Arc::clone(&status),
                content,
            },
        );
        Ok(status)
    }

    fn register_actions(&self, path: &str, target: &mut Scene, content: &mut LibraryContent, level: Level) {
        for action in self.source.actions(path) {
            log::log!(level, "ActionName: {}", action.name);
            content.record_action(&action);
            target.add_action(action);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn convert_async(&self, path: &str, names: Vec<String>, options: LoadOptions, status: Arc<LibLoadStatus>) {
        let source = Arc::clone(&self.source);
        let queue = Arc::clone(&self.merge_queue);
        let config = self.scene_config.clone();
        let converter = self.id;
        let path = path.to_string();

        self.loader.execute(move || {
            let share = CONVERSION_SHARE / names.len().max(1) as f32;
            let mut converted = Vec::with_capacity(names.len());
            for name in &names {
                if let Some(scene) = convert_scene(source.as_ref(), &path, name, &config, options, converter) {
                    converted.push(scene);
                }
                status.add_progress(share);
            }
            log::debug!("Converted {} scenes of library '{}'", converted.len(), path);
            lock_queue(&queue).push(PendingMerge { status, converted });
        });
    }

    /// Merge every finished background conversion into its target scene.
    ///
    /// Called once per frame on the main thread. Returns the number of
    /// scenes merged.
    pub fn merge_async_loads(&mut self, scenes: &mut [Scene]) -> usize {
        let mut queue = lock_queue(&self.merge_queue);
        let mut merged = 0;

        for PendingMerge { status, converted } in queue.drain(..) {
            match scenes.iter_mut().find(|scene| scene.id() == status.target()) {
                Some(target) => {
                    for scene in converted {
                        if let Some(library) = self.libraries.get_mut(status.path()) {
                            library.content.record_scene(&scene);
                        }
                        match target.merge_scene(scene) {
                            Ok(()) => merged += 1,
                            Err(err) => log::error!("Library '{}': {}", status.path(), err),
                        }
                    }
                }
                None => log::warn!(
                    "Target scene of library '{}' is gone, dropping {} converted scenes",
                    status.path(),
                    converted.len()
                ),
            }
            status.finish();
            log::info!(
                "Library '{}' loaded in {:.3}s",
                status.path(),
                status.time_taken().as_secs_f64()
            );
        }
        merged
    }

    /// Wait for every background conversion, then merge them all
    pub fn finalize_async_loads(&mut self, scenes: &mut [Scene]) -> usize {
        self.loader.work_and_wait();
        self.merge_async_loads(scenes)
    }

    /// Converted scenes waiting to be merged
    pub fn pending_merges(&self) -> usize {
        lock_queue(&self.merge_queue).len()
    }

    /// Unlink the library at `path`, removing its objects, meshes, materials
    /// and actions from every scene in `scenes`.
    ///
    /// Refused while an asynchronous load of the library is unfinished.
    pub fn free_library(&mut self, path: &str, scenes: &mut [Scene]) -> Result<(), LibLoadError> {
        let Some(library) = self.libraries.get(path) else {
            return Err(LibLoadError::NotLoaded(path.to_string()));
        };
        if !library.status.is_finished() {
            let err = LibLoadError::StillLoading(path.to_string());
            log::warn!("{}", err);
            return Err(err);
        }
        let Some(library) = self.libraries.remove(path) else {
            return Err(LibLoadError::NotLoaded(path.to_string()));
        };

        let removed: usize = scenes
            .iter_mut()
            .map(|scene| remove_library_content(scene, &library.content))
            .sum();
        log::info!("Freed library '{}' ({} objects removed)", path, removed);
        Ok(())
    }

    /// Whether a library is linked under `path`
    pub fn is_loaded(&self, path: &str) -> bool {
        self.libraries.contains_key(path)
    }

    /// Paths of every linked library
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    /// Load status of the library at `path`
    pub fn status(&self, path: &str) -> Option<Arc<LibLoadStatus>> {
        self.libraries.get(path).map(|library| Arc::clone(&library.status))
    }

    /// Script modules made importable by linked libraries
    pub fn script_modules(&self) -> impl Iterator<Item = &str> {
        self.libraries
            .values()
            .flat_map(|library| library.content.scripts.iter().map(String::as_str))
    }
}

impl Drop for SceneConverter {
    fn drop(&mut self) {
        self.loader.work_and_wait();
        let dropped = self.pending_merges();
        if dropped > 0 {
            log::debug!("Dropping {} unmerged library loads", dropped);
        }
    }
}

/// Take a library's content out of one scene; returns the objects removed
fn remove_library_content(scene: &mut Scene, content: &LibraryContent) -> usize {
    let view: &Scene = scene;
    let doomed: Vec<ObjectId> = [ListKind::Active, ListKind::Inactive]
        .into_iter()
        .flat_map(|kind| view.list(kind).iter())
        .filter(|object| {
            view.object(*object)
                .and_then(GameObject::asset)
                .is_some_and(|asset| content.assets.contains(&asset))
        })
        .collect();

    // Children go with their parents, so some of these are gone already
    let removed = doomed.into_iter().filter(|object| scene.remove_object(*object)).count();

    let assets: Vec<AssetId> = content.assets.iter().copied().collect();
    let (materials, meshes) = scene.assets.remove_assets(&assets);
    let library_meshes: BTreeSet<MeshId> = content
        .meshes
        .values()
        .copied()
        .chain(meshes.iter().map(|mesh| mesh.id))
        .collect();

    let survivors: Vec<ObjectId> = scene.objects().ids().collect();
    for object in survivors {
        let Some(obj) = scene.object_mut(object) else {
            continue;
        };
        if let Some(actions) = obj.actions_mut() {
            for asset in &assets {
                actions.stop_asset(*asset);
            }
            for name in &content.actions {
                actions.stop(name);
            }
        }
        let uses_library = obj.meshes().iter().any(|mesh| {
            library_meshes.contains(&mesh.id) || mesh.materials.iter().any(|material| materials.contains(material))
        });
        if uses_library {
            scene.remove_meshes(object);
        }
    }

    for material in &materials {
        scene.buckets.remove_material(*material);
    }
    for (name, id) in &content.meshes {
        if scene.registry.find_mesh(name).is_some_and(|mesh| mesh.id == *id) {
            scene.registry.remove_mesh(name);
        }
    }
    for name in &content.actions {
        scene.registry.remove_action(name);
    }
    removed
}
