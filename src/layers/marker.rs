use crate::{
    core::{constants::PENDING_ADDRESS_HEADING, geo::LatLng, map::MapSurface},
    rendering::backend::{MapBackend, MarkerHandle},
    ui::popup::Popup,
    Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a placed marker.
///
/// Ids are never reused, so an id that is no longer in the store stays dead
/// for good; late work addressed to it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(u64);

impl MarkerId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-placed point annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    id: MarkerId,
    position: LatLng,
    title: String,
    popup: Popup,
    handle: MarkerHandle,
}

impl Marker {
    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    /// Hover title given at creation
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current popup content
    pub fn popup(&self) -> &Popup {
        &self.popup
    }

    pub fn handle(&self) -> MarkerHandle {
        self.handle
    }
}

/// Ordered collection of placed markers.
///
/// Every entry has exactly one rendered marker on the surface: adding renders
/// before the entry is stored, and removal detaches before the entry is
/// dropped. A backend failure leaves the store untouched.
#[derive(Debug, Default)]
pub struct MarkerStore {
    markers: Vec<Marker>,
    next_id: u64,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a marker at `position` and append it.
    ///
    /// Without a label (or with a blank one) the marker is titled `Marker N`
    /// and its popup shows a placeholder heading until
    /// [`apply_address`](Self::apply_address) runs.
    pub fn add<B: MapBackend>(
        &mut self,
        surface: &mut MapSurface<B>,
        position: LatLng,
        label: Option<String>,
    ) -> Result<MarkerId> {
        let label = usable_label(label);
        let id = MarkerId(self.next_id + 1);
        let title = label
            .clone()
            .unwrap_or_else(|| format!("Marker {}", self.markers.len() + 1));
        let heading = label.unwrap_or_else(|| PENDING_ADDRESS_HEADING.to_string());
        let popup = Popup::new(id, heading, position);

        let handle = surface.attach_marker(position, &title, &popup)?;
        self.next_id += 1;
        self.markers.push(Marker {
            id,
            position,
            title,
            popup,
            handle,
        });

        log::info!("marker {} added at: {}", id, position);
        Ok(id)
    }

    /// Rewrite a marker's popup heading with a resolved address.
    ///
    /// Returns `false` without touching anything when the marker is gone.
    pub fn apply_address<B: MapBackend>(
        &mut self,
        surface: &mut MapSurface<B>,
        id: MarkerId,
        display_name: &str,
    ) -> Result<bool> {
        let Some(marker) = self.markers.iter_mut().find(|m| m.id == id) else {
            log::debug!("dropping address for removed marker {}", id);
            return Ok(false);
        };

        let popup = Popup::new(id, display_name, marker.position);
        surface.update_popup(marker.handle, &popup)?;
        marker.popup = popup;
        Ok(true)
    }

    /// Remove the marker in slot `index`; later markers shift down by one.
    /// Out-of-range indices are a no-op.
    pub fn remove_at<B: MapBackend>(
        &mut self,
        surface: &mut MapSurface<B>,
        index: usize,
    ) -> Result<Option<MarkerId>> {
        let Some(marker) = self.markers.get(index) else {
            return Ok(None);
        };

        surface.detach_marker(marker.handle)?;
        let removed = self.markers.remove(index);
        log::info!("marker {} removed", removed.id);
        Ok(Some(removed.id))
    }

    /// Remove the marker with stable identity `id`
    pub fn remove<B: MapBackend>(
        &mut self,
        surface: &mut MapSurface<B>,
        id: MarkerId,
    ) -> Result<bool> {
        match self.index_of(id) {
            Some(index) => Ok(self.remove_at(surface, index)?.is_some()),
            None => Ok(false),
        }
    }

    /// Detach and delete every marker, returning how many were removed
    pub fn clear<B: MapBackend>(&mut self, surface: &mut MapSurface<B>) -> Result<usize> {
        let mut removed = 0;
        while let Some(marker) = self.markers.last() {
            surface.detach_marker(marker.handle)?;
            self.markers.pop();
            removed += 1;
        }
        log::info!("all markers cleared ({})", removed);
        Ok(removed)
    }

    pub fn count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    /// Current slot of `id`
    pub fn index_of(&self, id: MarkerId) -> Option<usize> {
        self.markers.iter().position(|m| m.id == id)
    }

    pub fn is_live(&self, id: MarkerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.markers.iter()
    }
}

/// A label counts only when it has visible text
pub(crate) fn usable_label(label: Option<String>) -> Option<String> {
    label.filter(|label| !label.trim().is_empty())
}
