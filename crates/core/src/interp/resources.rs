//! Shared resource caches.
//!
//! A [`ResourceManager`] lives as long as the document and may be shared by
//! interpreters on several threads, so large objects such as fonts, colour
//! spaces, images and pattern tiles are built once. Cache keys are object
//! numbers; directly embedded resources are keyed by their printed form.

use crate::model::{Handle, LoadedFont, PDFColorSpace, PDFObject};
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identity of a resource for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Object(u32),
    Direct(String),
}

impl ResourceKey {
    /// Key of an unresolved resource value.
    pub fn of(obj: &PDFObject) -> Self {
        match obj {
            PDFObject::Ref(r) => ResourceKey::Object(r.objid),
            other => ResourceKey::Direct(other.to_string()),
        }
    }
}

struct Cache<K, V>(Mutex<FxHashMap<K, V>>);

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    fn new() -> Self {
        Self(Mutex::new(FxHashMap::default()))
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<K, V>> {
        // A panic while holding the lock leaves the map itself intact.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Returns the cached value or builds it outside the lock. When two
    /// threads race, the first stored value wins.
    fn get_or_try_insert<E>(&self, key: K, build: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let value = build()?;
        Ok(self.lock().entry(key).or_insert(value).clone())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

pub struct ResourceManager {
    fonts: Cache<ResourceKey, Arc<LoadedFont>>,
    colorspaces: Cache<ResourceKey, PDFColorSpace>,
    images: Cache<u32, Option<Handle>>,
    tiles: Cache<u32, Handle>,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("fonts", &self.fonts.len())
            .field("colorspaces", &self.colorspaces.len())
            .field("images", &self.images.len())
            .field("tiles", &self.tiles.len())
            .finish()
    }
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            fonts: Cache::new(),
            colorspaces: Cache::new(),
            images: Cache::new(),
            tiles: Cache::new(),
        }
    }

    pub fn font<E>(
        &self,
        key: ResourceKey,
        load: impl FnOnce() -> Result<Arc<LoadedFont>, E>,
    ) -> Result<Arc<LoadedFont>, E> {
        self.fonts.get_or_try_insert(key, load)
    }

    pub fn colorspace<E>(
        &self,
        key: ResourceKey,
        load: impl FnOnce() -> Result<PDFColorSpace, E>,
    ) -> Result<PDFColorSpace, E> {
        self.colorspaces.get_or_try_insert(key, load)
    }

    /// Image XObjects by object number. A cached `None` remembers that the
    /// image factory declined the image.
    pub fn image<E>(
        &self,
        objid: u32,
        load: impl FnOnce() -> Result<Option<Handle>, E>,
    ) -> Result<Option<Handle>, E> {
        self.images.get_or_try_insert(objid, load)
    }

    /// Finished tiling pattern cells by pattern object number.
    pub fn tile(&self, objid: u32) -> Option<Handle> {
        self.tiles.get(&objid)
    }

    pub fn store_tile(&self, objid: u32, tile: Handle) -> Handle {
        self.tiles.lock().entry(objid).or_insert(tile).clone()
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn clear(&self) {
        self.fonts.clear();
        self.colorspaces.clear();
        self.images.clear();
        self.tiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PDFObjRef;

    #[test]
    fn test_key_of_reference_and_direct_value() {
        assert_eq!(
            ResourceKey::of(&PDFObject::Ref(PDFObjRef::new(7, 0))),
            ResourceKey::Object(7)
        );
        assert_eq!(
            ResourceKey::of(&PDFObject::Name("DeviceRGB".into())),
            ResourceKey::Direct("/DeviceRGB".into())
        );
    }

    #[test]
    fn test_colorspace_built_once() {
        let manager = ResourceManager::new();
        let mut calls = 0;
        for _ in 0..3 {
            let cs = manager
                .colorspace::<()>(ResourceKey::Object(4), || {
                    calls += 1;
                    Ok(PDFColorSpace::new("ICCBased", 3))
                })
                .unwrap();
            assert_eq!(cs.ncomponents, 3);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let manager = ResourceManager::new();
        assert!(manager.image(3, || Err::<Option<Handle>, _>("bad")).is_err());
        assert_eq!(manager.image_count(), 0);
        let handle = manager.image::<()>(3, || Ok(None)).unwrap();
        assert!(handle.is_none());
        assert_eq!(manager.image_count(), 1);
    }
}
