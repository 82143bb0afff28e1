use crate::core::geo::LatLng;
use crate::layers::marker::MarkerId;

/// Name of the page-level function popups call to remove their marker.
pub const REMOVE_ACTION: &str = "removeMarkerById";

/// Info popup bound to a marker.
///
/// The remove action carries the marker's stable id, never its slot index,
/// so removing other markers cannot make it point at the wrong marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub marker: MarkerId,
    pub heading: String,
    pub position: LatLng,
}

impl Popup {
    pub fn new(marker: MarkerId, heading: impl Into<String>, position: LatLng) -> Self {
        Self {
            marker,
            heading: heading.into(),
            position,
        }
    }

    /// Script invoked by the popup's "Remove Marker" button
    pub fn remove_action(&self) -> String {
        format!("{}({})", REMOVE_ACTION, self.marker)
    }

    /// Render the popup as an HTML fragment for browser backends
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                r#"<div class="pinmap-popup" style="font-family: 'Inter', sans-serif; min-width: 200px;">"#,
                r#"<h3 style="margin: 0 0 10px 0; color: #1e293b; font-size: 14px;">{heading}</h3>"#,
                r#"<p style="margin: 5px 0; color: #475569; font-size: 12px;">"#,
                r#"<strong>Latitude:</strong> {lat}<br><strong>Longitude:</strong> {lng}</p>"#,
                r#"<button onclick="{action}" style="margin-top: 10px; padding: 6px 12px; "#,
                r#"background: #ef4444; color: white; border: none; border-radius: 6px; "#,
                r#"cursor: pointer; font-weight: 600; font-size: 12px;">Remove Marker</button>"#,
                "</div>"
            ),
            heading = escape_html(&self.heading),
            lat = self.position.lat_text(),
            lng = self.position.lng_text(),
            action = self.remove_action(),
        )
    }
}

/// Escape text for inclusion in HTML element content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
