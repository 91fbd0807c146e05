use tracing::debug;

use crate::state::view::NormalizedView;

/// Last normalized view plus its validity flag.
#[derive(Debug, Default)]
pub struct ViewCache {
    view: Option<NormalizedView>,
    valid: bool,
}

impl ViewCache {
    /// An empty, invalid cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cached view can be served.
    pub fn is_valid(&self) -> bool {
        self.valid && self.view.is_some()
    }

    /// The cached view, even when stale.
    pub fn last(&self) -> Option<&NormalizedView> {
        self.view.as_ref()
    }

    /// Mark the cached view stale.
    pub fn invalidate(&mut self) {
        if self.valid {
            debug!("normalized view invalidated");
        }
        self.valid = false;
    }

    /// Return the cached view, rebuilding it with `load` when stale or when `force_reload` is set.
    ///
    /// A failed rebuild leaves the cache empty.
    pub fn get_or_load<E>(
        &mut self,
        force_reload: bool,
        load: impl FnOnce() -> Result<NormalizedView, E>,
    ) -> Result<&NormalizedView, E> {
        let view = match self.view.take() {
            Some(view) if self.valid && !force_reload => view,
            _ => {
                self.valid = false;
                load()?
            }
        };
        self.valid = true;
        Ok(self.view.insert(view))
    }
}
